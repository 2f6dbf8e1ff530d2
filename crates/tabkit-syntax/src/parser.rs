//! Parsing of row-expression source text.

mod error;
mod grammar;
mod lexer;
mod token;

#[cfg(test)]
mod tests;

pub use error::ParseError;

use crate::{Expr, Stmt};

/// Parse a source text into its statements.
///
/// Statements are separated by `;` or newlines. An empty source has no
/// statements.
pub fn parse_statements(source: &str) -> error_stack::Result<Vec<Stmt>, ParseError> {
    grammar::Parser::new(source)?.statements()
}

/// Parse a source text consisting of exactly one expression.
pub fn parse_expr(source: &str) -> error_stack::Result<Expr, ParseError> {
    grammar::Parser::new(source)?.single_expr()
}

/// Returns true if `name` is a valid identifier.
pub fn is_valid_ident(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
