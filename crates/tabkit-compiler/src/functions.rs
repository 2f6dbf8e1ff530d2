//! The function library available in row expressions.
//!
//! Registered functions are macros expanding into IR, possibly requiring
//! runtime snippets. Any other call passes through to the awk builtin of the
//! same name.

mod file;
mod function;
mod general;
mod math;
mod registry;
mod snippets;
mod string;
mod time;

pub use function::*;
pub use registry::*;
pub use snippets::*;

/// Register all the functions available in the registry.
fn register_functions(registry: &mut Registry) {
    file::register(registry);
    general::register(registry);
    math::register(registry);
    string::register(registry);
    time::register(registry);
}
