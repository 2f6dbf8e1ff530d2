//! The commands of the `tabkit` executable.
//!
//! Each command reads the schema of its input, compiles the given
//! expressions and renders the resulting awk program or command line.

#![warn(
    rust_2018_idioms,
    nonstandard_style,
    future_incompatible,
    clippy::mod_module_files,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::undocumented_unsafe_blocks
)]

mod error;
mod group;
mod map;
mod options;
pub mod tracing_setup;

pub use error::Error;
pub use group::{AggregateStatements, GroupCommand};
pub use map::MapCommand;
pub use options::{InputOptions, OutputOptions};
