use crate::{
    error::Error,
    source::Position,
    token::{Token, TokenStream, TokenType},
};

/// Lexes LQL source into tokens. The scanning loop works on raw UTF-8
/// bytes; multi-byte sequences only ever appear inside string literals and
/// pass through untouched. Columns count bytes, 1-based.
pub struct Scanner<'a> {
    input: &'a [u8],
    position: usize,
    read_position: usize,
    ch: u8,
    line: i32,
    column: i32,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Self {
            input: source.as_bytes(),
            position: 0,
            read_position: 0,
            ch: 0,
            line: 1,
            column: 0,
        };
        scanner.read_char();
        scanner
    }

    fn read_char(&mut self) {
        self.ch = self.input.get(self.read_position).copied().unwrap_or(0);
        self.position = self.read_position;
        self.read_position += 1;
        if self.ch == b'\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    fn peek_char(&self) -> u8 {
        self.input.get(self.read_position).copied().unwrap_or(0)
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Skips whitespace and `#` line comments, in a loop so a comment may
    /// be followed by more whitespace and further comments.
    fn skip_whitespace(&mut self) {
        while matches!(self.ch, b' ' | b'\t' | b'\n' | b'\r') {
            self.read_char();
        }
        while self.ch == b'#' {
            while self.ch != b'\n' && self.ch != 0 {
                self.read_char();
            }
            self.read_char();
            while matches!(self.ch, b' ' | b'\t' | b'\n' | b'\r') {
                self.read_char();
            }
        }
    }

    /// Emits a fixed-literal token and consumes the current character.
    fn single(&mut self, token_type: TokenType, start: Position) -> Token {
        self.read_char();
        Token::fixed(token_type, start)
    }

    /// Emits a two-character fixed-literal token, consuming both.
    fn double(&mut self, token_type: TokenType, start: Position) -> Token {
        self.read_char();
        self.read_char();
        Token::fixed(token_type, start)
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;
        while is_letter(self.ch) || self.ch.is_ascii_digit() || self.ch == b'-' {
            self.read_char();
        }
        String::from_utf8_lossy(&self.input[start..self.position]).into_owned()
    }

    fn read_number(&mut self) -> Result<Token, Error> {
        let start = self.position;
        let start_pos = self.here();

        while self.ch.is_ascii_digit() {
            self.read_char();
        }
        if self.ch == b'.' {
            self.read_char();
            if !self.ch.is_ascii_digit() {
                return Err(Error::lexical(
                    "Invalid number literal: missing digits after decimal point",
                    start_pos,
                ));
            }
            while self.ch.is_ascii_digit() {
                self.read_char();
            }
        }
        if self.ch == b'e' || self.ch == b'E' {
            self.read_char();
            if self.ch == b'-' || self.ch == b'+' {
                self.read_char();
            }
            if !self.ch.is_ascii_digit() {
                return Err(Error::lexical(
                    "Invalid number literal: missing digits in exponent",
                    start_pos,
                ));
            }
            while self.ch.is_ascii_digit() {
                self.read_char();
            }
        }

        let literal = String::from_utf8_lossy(&self.input[start..self.position]).into_owned();
        Ok(Token::new(TokenType::Number, literal, start_pos))
    }

    fn read_string(&mut self, quote: u8) -> Result<Token, Error> {
        let start_pos = self.here();
        let mut bytes = Vec::new();

        self.read_char(); // opening quote
        while self.ch != 0 {
            match self.ch {
                b'\\' => {
                    self.read_char();
                    match self.ch {
                        0 => return Err(Error::lexical("Unclosed string literal", start_pos)),
                        b'u' => {
                            let mut code = 0u32;
                            for _ in 0..4 {
                                self.read_char();
                                let digit = (self.ch as char).to_digit(16).ok_or_else(|| {
                                    Error::lexical("Invalid unicode escape sequence", self.here())
                                })?;
                                code = code * 16 + digit;
                            }
                            let decoded = char::from_u32(code).ok_or_else(|| {
                                Error::lexical("Invalid unicode escape sequence", self.here())
                            })?;
                            let mut buf = [0u8; 4];
                            bytes.extend_from_slice(decoded.encode_utf8(&mut buf).as_bytes());
                        }
                        b'n' => bytes.push(b'\n'),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'\\' => bytes.push(b'\\'),
                        b'"' => bytes.push(b'"'),
                        b'\'' => bytes.push(b'\''),
                        other => {
                            return Err(Error::lexical(
                                format!("Invalid escape sequence: \\{}", other as char),
                                self.here(),
                            ));
                        }
                    }
                }
                ch if ch == quote => {
                    self.read_char();
                    let literal = String::from_utf8_lossy(&bytes).into_owned();
                    return Ok(Token::new(TokenType::Str, literal, start_pos));
                }
                other => bytes.push(other),
            }
            self.read_char();
        }
        Err(Error::lexical("Unclosed string literal", start_pos))
    }
}

fn is_letter(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn lookup_ident(ident: &str) -> TokenType {
    match ident {
        "true" | "false" => TokenType::Bool,
        "null" => TokenType::Null,
        "AND" => TokenType::And,
        "OR" => TokenType::Or,
        "NOT" => TokenType::Not,
        _ => TokenType::Ident,
    }
}

impl TokenStream for Scanner<'_> {
    fn next_token(&mut self) -> Result<Token, Error> {
        self.skip_whitespace();
        let start = self.here();

        match self.ch {
            b'+' => Ok(self.single(TokenType::Plus, start)),
            b'-' => Ok(self.single(TokenType::Minus, start)),
            b'*' => Ok(self.single(TokenType::Star, start)),
            b'/' => Ok(self.single(TokenType::Slash, start)),
            b'<' => {
                if self.peek_char() == b'=' {
                    Ok(self.double(TokenType::LessEqual, start))
                } else {
                    Ok(self.single(TokenType::Less, start))
                }
            }
            b'>' => {
                if self.peek_char() == b'=' {
                    Ok(self.double(TokenType::GreaterEqual, start))
                } else {
                    Ok(self.single(TokenType::Greater, start))
                }
            }
            b'=' => {
                if self.peek_char() == b'=' {
                    Ok(self.double(TokenType::EqualEqual, start))
                } else {
                    Err(Error::lexical("Unexpected character: =", start))
                }
            }
            b'!' => {
                if self.peek_char() == b'=' {
                    Ok(self.double(TokenType::BangEqual, start))
                } else {
                    Ok(self.single(TokenType::Not, start))
                }
            }
            b'&' => {
                if self.peek_char() == b'&' {
                    Ok(self.double(TokenType::And, start))
                } else {
                    Err(Error::lexical("Unexpected character: &", start))
                }
            }
            b'|' => {
                if self.peek_char() == b'|' {
                    Ok(self.double(TokenType::Or, start))
                } else {
                    Err(Error::lexical("Unexpected character: |", start))
                }
            }
            b'?' => match self.peek_char() {
                b'.' => Ok(self.double(TokenType::QuestionDot, start)),
                b'[' => Ok(self.double(TokenType::QuestionBracket, start)),
                _ => Err(Error::lexical("Unexpected character: ?", start)),
            },
            b'(' => Ok(self.single(TokenType::OpenParen, start)),
            b')' => Ok(self.single(TokenType::CloseParen, start)),
            b'[' => Ok(self.single(TokenType::OpenBracket, start)),
            b']' => Ok(self.single(TokenType::CloseBracket, start)),
            b'{' => Ok(self.single(TokenType::OpenBrace, start)),
            b'}' => Ok(self.single(TokenType::CloseBrace, start)),
            b',' => Ok(self.single(TokenType::Comma, start)),
            b':' => Ok(self.single(TokenType::Colon, start)),
            b'.' => Ok(self.single(TokenType::Dot, start)),
            b'$' => Ok(self.single(TokenType::Dollar, start)),
            b'"' | b'\'' => {
                let quote = self.ch;
                self.read_string(quote)
            }
            0 => Ok(Token::new(TokenType::Eof, String::new(), start)),
            ch if is_letter(ch) => {
                let literal = self.read_identifier();
                Ok(Token::new(lookup_ident(&literal), literal, start))
            }
            ch if ch.is_ascii_digit() => self.read_number(),
            ch => Err(Error::lexical(
                format!("Unexpected character: {}", ch as char),
                start,
            )),
        }
    }
}
