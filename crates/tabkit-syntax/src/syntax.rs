mod expr;
mod literal;

pub use expr::*;
pub use literal::*;
