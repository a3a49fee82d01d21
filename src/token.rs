use crate::{error::Error, source::Position};
use derive_new::new;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt::{self, Display};

/// Token types, `repr(u8)` so each variant's discriminant doubles as its
/// stable bytecode type code. Code 29 (the historical standalone `?`) and
/// codes 33+ are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TokenType {
    Eof = 0,
    Illegal = 1,
    Ident = 2,
    Number = 3,
    Str = 4,
    Bool = 5,
    Null = 6,
    Plus = 7,
    Minus = 8,
    Star = 9,
    Slash = 10,
    Less = 11,
    Greater = 12,
    LessEqual = 13,
    GreaterEqual = 14,
    EqualEqual = 15,
    BangEqual = 16,
    And = 17,
    Or = 18,
    Not = 19,
    OpenParen = 20,
    CloseParen = 21,
    OpenBracket = 22,
    CloseBracket = 23,
    OpenBrace = 24,
    CloseBrace = 25,
    Comma = 26,
    Colon = 27,
    Dot = 28,
    QuestionDot = 30,
    QuestionBracket = 31,
    Dollar = 32,
}

impl TokenType {
    /// Canonical text for fixed-form tokens. Tokens with a fixed literal
    /// are encoded as a bare type code; the rest carry their literal in a
    /// length-prefixed record.
    pub fn fixed_literal(self) -> Option<&'static str> {
        Some(match self {
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Less => "<",
            TokenType::Greater => ">",
            TokenType::LessEqual => "<=",
            TokenType::GreaterEqual => ">=",
            TokenType::EqualEqual => "==",
            TokenType::BangEqual => "!=",
            TokenType::And => "AND",
            TokenType::Or => "OR",
            TokenType::Not => "NOT",
            TokenType::OpenParen => "(",
            TokenType::CloseParen => ")",
            TokenType::OpenBracket => "[",
            TokenType::CloseBracket => "]",
            TokenType::OpenBrace => "{",
            TokenType::CloseBrace => "}",
            TokenType::Comma => ",",
            TokenType::Colon => ":",
            TokenType::Dot => ".",
            TokenType::QuestionDot => "?.",
            TokenType::QuestionBracket => "?[",
            TokenType::Dollar => "$",
            _ => return None,
        })
    }
}

impl Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fixed_literal() {
            Some(literal) => f.write_str(literal),
            None => write!(f, "{:?}", self),
        }
    }
}

/// A lexical token: its type, literal text, and source position.
#[derive(Debug, Clone, PartialEq, new)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub pos: Position,
}

impl Token {
    pub fn fixed(token_type: TokenType, pos: Position) -> Self {
        let literal = token_type
            .fixed_literal()
            .map(str::to_string)
            .unwrap_or_default();
        Token::new(token_type, literal, pos)
    }
}

/// Anything that yields a stream of tokens, terminated by `Eof`. The
/// scanner produces one from source text; the bytecode reader produces one
/// from an encoded stream. The parser consumes either.
pub trait TokenStream {
    fn next_token(&mut self) -> Result<Token, Error>;
}
