//! Typed schema model for tab-separated record streams.
//!
//! A [Schema] is the ordered list of typed [Field]s of a stream, the order the
//! rows are known to be sorted by, an optional row count and a free-form
//! metadata map. Schemas travel with the data as a single header line of the
//! form `# name:type ... #ORDER: ... #SIZE: ... #META: ...`; see
//! [parse_header] and the `Display` implementation of [Schema].

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
mod field;
mod header;
mod order;
mod schema;

pub use error::*;
pub use field::*;
pub use header::*;
pub use order::*;
pub use schema::*;
