//! Adapt the token lexer produced by Logos into a buffered token stream for
//! the recursive descent parser.

use error_stack::bail;
use logos::Logos;

use crate::parser::token::Token;
use crate::parser::ParseError;
use crate::Location;

pub(crate) type Spanned<'input> = (Token<'input>, Location);

/// Lexes the whole input, failing on the first unrecognized token.
pub(crate) fn tokenize(input: &str) -> error_stack::Result<Vec<Spanned<'_>>, ParseError> {
    let mut lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        let span = lexer.span();
        let location = Location::new(span.start, span.end);
        if token == Token::Error {
            bail!(ParseError::UnrecognizedToken {
                token: lexer.slice().to_owned(),
                location,
            });
        }
        tokens.push((token, location));
    }
    Ok(tokens)
}

/// A cursor over lexed tokens.
///
/// Newlines are statement separators only outside of brackets; inside
/// brackets they are skipped, as in Python.
pub(crate) struct TokenStream<'input> {
    tokens: Vec<Spanned<'input>>,
    position: usize,
    depth: usize,
    end: usize,
}

impl<'input> TokenStream<'input> {
    pub(crate) fn new(input: &'input str) -> error_stack::Result<Self, ParseError> {
        Ok(Self {
            tokens: tokenize(input)?,
            position: 0,
            depth: 0,
            end: input.len(),
        })
    }

    /// Index of the `n`th significant token at or after the cursor.
    fn index_of(&self, n: usize) -> usize {
        let mut index = self.position;
        let mut remaining = n;
        loop {
            while self.depth > 0 && matches!(self.tokens.get(index), Some((Token::Newline, _))) {
                index += 1;
            }
            if remaining == 0 {
                return index;
            }
            remaining -= 1;
            index += 1;
        }
    }

    pub(crate) fn peek(&self) -> Option<&Token<'input>> {
        self.peek_nth(0)
    }

    /// Peeks `n` tokens past the next one.
    pub(crate) fn peek_nth(&self, n: usize) -> Option<&Token<'input>> {
        self.tokens.get(self.index_of(n)).map(|(token, _)| token)
    }

    /// The location of the next token, or an empty location at the end of
    /// the input.
    pub(crate) fn location(&self) -> Location {
        self.tokens
            .get(self.index_of(0))
            .map(|(_, location)| *location)
            .unwrap_or_else(|| Location::new(self.end, self.end))
    }

    pub(crate) fn next(&mut self) -> Option<Spanned<'input>> {
        let index = self.index_of(0);
        let (token, location) = self.tokens.get(index).cloned()?;
        self.position = index + 1;
        match token {
            Token::SymLParen | Token::SymLBrack => self.depth += 1,
            Token::SymRParen | Token::SymRBrack => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        Some((token, location))
    }

    /// Consumes the next token if it is `expected`.
    pub(crate) fn eat(&mut self, expected: &Token<'_>) -> Option<Location> {
        if self.peek() == Some(expected) {
            self.next().map(|(_, location)| location)
        } else {
            None
        }
    }

    /// Consumes the next token, failing unless it is `expected`.
    pub(crate) fn expect(
        &mut self,
        expected: &Token<'_>,
        description: &'static str,
    ) -> error_stack::Result<Location, ParseError> {
        match self.eat(expected) {
            Some(location) => Ok(location),
            None => Err(self.unexpected(description)),
        }
    }

    /// Reports the next token (or the end of input) as unexpected.
    pub(crate) fn unexpected(&self, expected: &'static str) -> error_stack::Report<ParseError> {
        let location = self.location();
        match self.peek() {
            Some(token) => error_stack::report!(ParseError::UnexpectedToken {
                found: token.to_string(),
                expected,
                location,
            }),
            None => error_stack::report!(ParseError::UnexpectedEof { expected }),
        }
    }
}
