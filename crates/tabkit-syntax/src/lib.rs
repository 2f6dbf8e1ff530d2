//! The `tabkit-syntax` crate provides the AST representation of row
//! expressions and the parser producing it.
//!
//! The surface is a small Python-like expression language: assignments,
//! arithmetic, boolean and comparison operators, conditionals, calls with
//! positional and keyword arguments, subscripts, tuples and membership tests
//! against literal lists.

#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr
)]

mod parser;
mod syntax;

pub use parser::*;
pub use syntax::*;
