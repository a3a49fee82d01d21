use crate::{
    ast::*,
    error::Error,
    token::{Token, TokenStream, TokenType},
    value::Value,
};
use std::mem;

/// Recursive-descent parser with two tokens of lookahead (current and
/// peek). Works over any `TokenStream`, so freshly scanned source and
/// decoded bytecode parse identically.
pub struct Parser<Stream: TokenStream> {
    stream: Stream,
    cur: Token,
    peek: Token,
}

impl<Stream: TokenStream> Parser<Stream> {
    pub fn new(mut stream: Stream) -> Result<Self, Error> {
        let cur = stream.next_token()?;
        let peek = stream.next_token()?;
        Ok(Self { stream, cur, peek })
    }

    /// Parses a single expression and requires it to span the whole
    /// stream; trailing tokens are a syntax error.
    pub fn parse(mut self) -> Result<Expr, Error> {
        let expr = self.parse_expression()?;
        if !self.cur_is(TokenType::Eof) {
            return Err(Error::syntax(
                format!("Unexpected token {}", self.cur.literal),
                self.cur.pos,
            ));
        }
        Ok(expr)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn advance(&mut self) -> Result<(), Error> {
        let next = self.stream.next_token()?;
        self.cur = mem::replace(&mut self.peek, next);
        Ok(())
    }

    fn cur_is(&self, token_type: TokenType) -> bool {
        self.cur.token_type == token_type
    }

    fn peek_is(&self, token_type: TokenType) -> bool {
        self.peek.token_type == token_type
    }

    /// `AND`/`OR` also appear as identifier tokens when written in a
    /// non-keyword case (`and`, `or`); binary position treats those as the
    /// operator.
    fn cur_is_word_op(&self, word: &str) -> bool {
        self.cur_is(TokenType::Ident) && self.cur.literal.eq_ignore_ascii_case(word)
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.cur_is(TokenType::Or) || self.cur_is_word_op("or") {
            let pos = self.cur.pos;
            self.advance()?;
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryExpr {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            });
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.cur_is(TokenType::And) || self.cur_is_word_op("and") {
            let pos = self.cur.pos;
            self.advance()?;
            let right = self.parse_equality()?;
            left = Expr::Binary(BinaryExpr {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            });
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.cur.token_type {
                TokenType::EqualEqual => BinaryOp::Equal,
                TokenType::BangEqual => BinaryOp::NotEqual,
                _ => break,
            };
            let pos = self.cur.pos;
            self.advance()?;
            let right = self.parse_relational()?;
            left = Expr::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            });
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.cur.token_type {
                TokenType::Less => BinaryOp::Less,
                TokenType::Greater => BinaryOp::Greater,
                TokenType::LessEqual => BinaryOp::LessEqual,
                TokenType::GreaterEqual => BinaryOp::GreaterEqual,
                _ => break,
            };
            let pos = self.cur.pos;
            self.advance()?;
            let right = self.parse_additive()?;
            left = Expr::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            });
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.cur.token_type {
                TokenType::Plus => BinaryOp::Plus,
                TokenType::Minus => BinaryOp::Minus,
                _ => break,
            };
            let pos = self.cur.pos;
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            });
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.cur.token_type {
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Slash => BinaryOp::Divide,
                _ => break,
            };
            let pos = self.cur.pos;
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::Binary(BinaryExpr {
                op,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let op = match self.cur.token_type {
            TokenType::Not => UnaryOp::Not,
            TokenType::Minus => UnaryOp::Minus,
            _ => return self.parse_member_access(),
        };
        let pos = self.cur.pos;
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            pos,
        }))
    }

    fn parse_member_access(&mut self) -> Result<Expr, Error> {
        let expr = self.parse_primary()?;
        let mut parts = Vec::new();
        loop {
            match self.cur.token_type {
                TokenType::Dot | TokenType::QuestionDot => {
                    let optional = self.cur_is(TokenType::QuestionDot);
                    self.advance()?;
                    if !self.cur_is(TokenType::Ident) && !self.cur_is(TokenType::Str) {
                        return Err(Error::syntax(
                            format!("Expected identifier after dot at {}", self.cur.pos),
                            self.cur.pos,
                        ));
                    }
                    parts.push(MemberPart {
                        optional,
                        kind: MemberKind::Key(self.cur.literal.trim().to_string()),
                        pos: self.cur.pos,
                    });
                    self.advance()?;
                }
                TokenType::OpenBracket | TokenType::QuestionBracket => {
                    let optional = self.cur_is(TokenType::QuestionBracket);
                    let bracket_pos = self.cur.pos;
                    self.advance()?;
                    let index = self.parse_expression()?;
                    if !self.cur_is(TokenType::CloseBracket) {
                        return Err(Error::syntax(
                            format!("Expected closing bracket at {}", self.cur.pos),
                            self.cur.pos,
                        ));
                    }
                    self.advance()?;
                    parts.push(MemberPart {
                        optional,
                        kind: MemberKind::Index(Box::new(index)),
                        pos: bracket_pos,
                    });
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            Ok(expr)
        } else {
            Ok(Expr::MemberAccess(MemberAccessExpr {
                target: Box::new(expr),
                parts,
            }))
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match self.cur.token_type {
            TokenType::OpenParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                if !self.cur_is(TokenType::CloseParen) {
                    return Err(Error::syntax("Expected RPAREN", self.cur.pos));
                }
                self.advance()?;
                Ok(expr)
            }
            TokenType::Number => {
                let literal = LiteralExpr {
                    value: parse_number(&self.cur.literal),
                    pos: self.cur.pos,
                };
                self.advance()?;
                Ok(Expr::Literal(literal))
            }
            TokenType::Str => {
                let literal = LiteralExpr {
                    value: Value::Str(self.cur.literal.clone()),
                    pos: self.cur.pos,
                };
                self.advance()?;
                Ok(Expr::Literal(literal))
            }
            TokenType::Bool => {
                let literal = LiteralExpr {
                    value: Value::Bool(self.cur.literal == "true"),
                    pos: self.cur.pos,
                };
                self.advance()?;
                Ok(Expr::Literal(literal))
            }
            TokenType::Null => {
                let literal = LiteralExpr {
                    value: Value::Null,
                    pos: self.cur.pos,
                };
                self.advance()?;
                Ok(Expr::Literal(literal))
            }
            TokenType::Dollar => self.parse_context(),
            TokenType::OpenBrace => self.parse_object_literal(),
            TokenType::OpenBracket => self.parse_array_literal(),
            TokenType::Ident => {
                if self.peek_is(TokenType::OpenParen) || self.peek_is(TokenType::Dot) {
                    self.parse_function_call()
                } else {
                    Err(Error::syntax(
                        format!(
                            "Bare identifier '{}' is not allowed outside of context references or object keys",
                            self.cur.literal
                        ),
                        self.cur.pos,
                    ))
                }
            }
            _ => Err(Error::syntax(
                format!("Unexpected token {}", self.cur.literal),
                self.cur.pos,
            )),
        }
    }

    fn parse_context(&mut self) -> Result<Expr, Error> {
        let pos = self.cur.pos;
        self.advance()?;
        let head = match self.cur.token_type {
            TokenType::Ident => {
                let ident = IdentifierExpr {
                    name: self.cur.literal.clone(),
                    pos: self.cur.pos,
                };
                self.advance()?;
                ContextHead::Ident(ident)
            }
            TokenType::OpenBracket => {
                self.advance()?;
                let subscript = self.parse_expression()?;
                if !self.cur_is(TokenType::CloseBracket) {
                    return Err(Error::syntax(
                        "Expected RBRACKET in context expression",
                        self.cur.pos,
                    ));
                }
                self.advance()?;
                ContextHead::Subscript(Box::new(subscript))
            }
            _ => ContextHead::Root,
        };
        Ok(Expr::Context(ContextExpr { head, pos }))
    }

    fn parse_function_call(&mut self) -> Result<Expr, Error> {
        let pos = self.cur.pos;
        let mut namespace = vec![self.cur.literal.clone()];
        self.advance()?;
        while self.cur_is(TokenType::Dot) {
            self.advance()?;
            if !self.cur_is(TokenType::Ident) {
                return Err(Error::syntax(
                    "Expected identifier after dot in function call",
                    self.cur.pos,
                ));
            }
            namespace.push(self.cur.literal.clone());
            self.advance()?;
        }
        if !self.cur_is(TokenType::OpenParen) {
            return Err(Error::syntax("Expected '(' in function call", self.cur.pos));
        }
        let paren_pos = self.cur.pos;
        self.advance()?;

        let mut args = Vec::new();
        if !self.cur_is(TokenType::CloseParen) {
            args.push(self.parse_expression()?);
            while self.cur_is(TokenType::Comma) {
                self.advance()?;
                args.push(self.parse_expression()?);
            }
            if !self.cur_is(TokenType::CloseParen) {
                return Err(Error::syntax(
                    "Expected ')' after arguments in function call",
                    self.cur.pos,
                ));
            }
        }
        self.advance()?;
        Ok(Expr::Call(CallExpr {
            namespace,
            args,
            pos,
            paren_pos,
        }))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, Error> {
        let pos = self.cur.pos;
        self.advance()?;
        let mut elements = Vec::new();
        if self.cur_is(TokenType::CloseBracket) {
            self.advance()?;
            return Ok(Expr::Array(ArrayLiteralExpr { elements, pos }));
        }
        elements.push(self.parse_expression()?);
        while self.cur_is(TokenType::Comma) {
            self.advance()?;
            elements.push(self.parse_expression()?);
        }
        if !self.cur_is(TokenType::CloseBracket) {
            return Err(Error::syntax(
                "Expected ']' at end of array literal",
                self.cur.pos,
            ));
        }
        self.advance()?;
        Ok(Expr::Array(ArrayLiteralExpr { elements, pos }))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, Error> {
        let pos = self.cur.pos;
        self.advance()?;
        let mut fields: Vec<(String, Expr)> = Vec::new();

        if self.cur_is(TokenType::CloseBrace) {
            self.advance()?;
            return Ok(Expr::Object(ObjectLiteralExpr { fields, pos }));
        }

        loop {
            if !self.cur_is(TokenType::Ident) && !self.cur_is(TokenType::Str) {
                return Err(Error::syntax(
                    "Expected identifier or string as object key",
                    self.cur.pos,
                ));
            }
            let key = self.cur.literal.trim().to_string();
            if fields.iter().any(|(existing, _)| *existing == key) {
                return Err(Error::semantic(
                    format!("Duplicate key '{}' detected", key),
                    self.cur.pos,
                ));
            }
            if !self.peek_is(TokenType::Colon) {
                return Err(Error::syntax(
                    "Expected ':' after object key",
                    self.peek.pos,
                ));
            }
            self.advance()?;
            self.advance()?;
            let value = self.parse_expression()?;
            fields.push((key, value));

            if self.cur_is(TokenType::Comma) {
                if self.peek_is(TokenType::CloseBrace) {
                    return Err(Error::syntax(
                        "Trailing comma not allowed in object literal",
                        self.peek.pos,
                    ));
                }
                self.advance()?;
            } else if self.cur_is(TokenType::CloseBrace) {
                break;
            } else {
                return Err(Error::syntax(
                    "Expected ',' or '}' after object field",
                    self.cur.pos,
                ));
            }
        }

        self.advance()?;
        Ok(Expr::Object(ObjectLiteralExpr { fields, pos }))
    }
}

/// Numeric literals containing `.`, `e`, or `E` are floats; all others are
/// integers. Out-of-range literals degrade to the zero value, matching the
/// reference behavior.
fn parse_number(literal: &str) -> Value {
    if literal.contains(|ch| matches!(ch, '.' | 'e' | 'E')) {
        Value::Float(literal.parse().unwrap_or_default())
    } else {
        Value::Int(literal.parse().unwrap_or_default())
    }
}
