//! Lexer and dual-mode Pratt parser

pub mod error;
pub mod lexer;
mod pratt;

pub use error::ParseError;
pub use lexer::{Channel, LexerOptions, Token, TokenKind, lex, unescape_string};
pub use pratt::{ParseResult, ParserOptions, parse, parse_with_options};
