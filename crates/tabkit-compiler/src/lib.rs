//! The compiler from tabkit row expressions to awk programs.
//!
//! Expressions are parsed by `tabkit-syntax` and lowered into the row
//! expression IR (see [RowExpr]) within an [ExprContext], which binds names
//! to their defining expressions. Function calls are expanded by the
//! function library, either passing through to awk builtins or expanding
//! into IR that may require runtime snippets.
//!
//! Two code generators consume the bound contexts:
//!
//!  1. The row compiler ([compile_filter_map]) produces a filter and
//!     projection program, materializing each helper binding once, before
//!     or after the filter as needed.
//!
//!  2. The group compiler ([compile_group]) produces a program detecting key
//!     changes in a clustered stream and running aggregate templates,
//!     reusing the row compiler for the final projection.
//!
//! Both produce a [Compiled] program along with the derived [Schema] of the
//! output, with types inferred by [infer_type] and the sort order carried
//! through passthrough fields.
//!
//! [Schema]: tabkit_schema::Schema

#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

mod aggregation;
mod ast_to_ir;
mod block;
mod context;
mod error;
mod functions;
mod group_compiler;
mod ir;
mod namer;
mod nearest_matches;
mod row_compiler;
mod types;

pub use aggregation::*;
pub use block::*;
pub use context::*;
pub use error::*;
pub use functions::{get_function, registered_functions, BoundArguments, Function, Snippet, Snippets};
pub use group_compiler::*;
pub use ir::*;
pub use namer::*;
pub use nearest_matches::NearestMatches;
pub use row_compiler::*;
pub use types::*;
