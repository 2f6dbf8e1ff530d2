use std::fmt::Display;

use logos::{Lexer, Logos};

use crate::LiteralValue;

/// Lex a string literal. Slices off the surrounding quotes, as the current
/// regex includes those.
fn lex_string_literal<'input>(lex: &mut Lexer<'input, Token<'input>>) -> Option<LiteralValue> {
    let slice = lex.slice();
    let slice = &slice[1..slice.len() - 1];

    let mut result = String::with_capacity(slice.len());
    let mut iter = slice.chars();
    while let Some(next) = iter.next() {
        if next == '\\' {
            match iter.next() {
                Some('\'') => result.push('\''),
                Some('\"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some(_) => return None,
                None => return None,
            }
        } else {
            result.push(next);
        }
    }

    Some(LiteralValue::String(result))
}

#[derive(Debug, Clone, PartialEq, Eq, Logos)]
pub enum Token<'input> {
    #[token("and")]
    KwAnd,
    #[token("or")]
    KwOr,
    #[token("not")]
    KwNot,
    #[token("in")]
    KwIn,
    #[token("if")]
    KwIf,
    #[token("else")]
    KwElse,

    // Lex literals.
    #[regex(r"[0-9]+([.][0-9]+)?([eE][+-]?[0-9]+)?", |lex| { LiteralValue::Number(lex.slice().to_owned()) })]
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| { lex_string_literal(lex) } )]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| { lex_string_literal(lex) } )]
    #[token("True", |_| LiteralValue::True)]
    #[token("False", |_| LiteralValue::False)]
    Literal(LiteralValue),

    #[regex("[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Ident(&'input str),

    #[token("+")]
    SymPlus,
    #[token("-")]
    SymMinus,
    #[token("*")]
    SymStar,
    #[token("**")]
    SymDoubleStar,
    #[token("/")]
    SymSlash,
    #[token("//")]
    SymDoubleSlash,
    #[token("%")]
    SymPercent,
    #[token("&")]
    SymAmpersand,
    #[token("|")]
    SymPipe,
    #[token("~")]
    SymTilde,
    #[token("<<")]
    SymShiftLeft,
    #[token(">>")]
    SymShiftRight,

    #[token("=")]
    SymEquals,
    #[token("==")]
    SymDoubleEquals,
    #[token("!=")]
    SymNeq,
    #[token("<")]
    SymLt,
    #[token(">")]
    SymGt,
    #[token("<=")]
    SymLte,
    #[token(">=")]
    SymGte,

    #[token(",")]
    SymComma,
    #[token(";")]
    SymSemicolon,
    #[token("(")]
    SymLParen,
    #[token(")")]
    SymRParen,
    #[token("[")]
    SymLBrack,
    #[token("]")]
    SymRBrack,

    #[token("\n")]
    Newline,

    #[error]
    // Skip whitespace
    #[regex("[ \t\r\x0C]+", logos::skip)]
    // Skip comments
    #[regex("#[^\n]*", logos::skip)]
    Error,

    Unrecognized(&'input str),
}

impl<'a> Display for Token<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::KwAnd => write!(f, "and"),
            Token::KwOr => write!(f, "or"),
            Token::KwNot => write!(f, "not"),
            Token::KwIn => write!(f, "in"),
            Token::KwIf => write!(f, "if"),
            Token::KwElse => write!(f, "else"),
            Token::Literal(literal) => write!(f, "{literal}"),
            Token::Ident(ident) => write!(f, "{ident}"),
            Token::SymPlus => write!(f, "+"),
            Token::SymMinus => write!(f, "-"),
            Token::SymStar => write!(f, "*"),
            Token::SymDoubleStar => write!(f, "**"),
            Token::SymSlash => write!(f, "/"),
            Token::SymDoubleSlash => write!(f, "//"),
            Token::SymPercent => write!(f, "%"),
            Token::SymAmpersand => write!(f, "&"),
            Token::SymPipe => write!(f, "|"),
            Token::SymTilde => write!(f, "~"),
            Token::SymShiftLeft => write!(f, "<<"),
            Token::SymShiftRight => write!(f, ">>"),
            Token::SymEquals => write!(f, "="),
            Token::SymDoubleEquals => write!(f, "=="),
            Token::SymNeq => write!(f, "!="),
            Token::SymLt => write!(f, "<"),
            Token::SymGt => write!(f, ">"),
            Token::SymLte => write!(f, "<="),
            Token::SymGte => write!(f, ">="),
            Token::SymComma => write!(f, ","),
            Token::SymSemicolon => write!(f, ";"),
            Token::SymLParen => write!(f, "("),
            Token::SymRParen => write!(f, ")"),
            Token::SymLBrack => write!(f, "["),
            Token::SymRBrack => write!(f, "]"),
            Token::Newline => write!(f, "newline"),
            Token::Unrecognized(s) => write!(f, "{s}"),
            Token::Error => write!(f, "ERROR"),
        }
    }
}
