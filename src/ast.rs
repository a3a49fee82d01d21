use crate::{source::Position, value::Value};
use itertools::Itertools;
use std::fmt::{self, Display};

/// A parsed LQL expression. Nodes are immutable once constructed and are
/// freely shareable across threads; evaluation never mutates them.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(LiteralExpr),
    Identifier(IdentifierExpr),
    Context(ContextExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    MemberAccess(MemberAccessExpr),
    Call(CallExpr),
    Array(ArrayLiteralExpr),
    Object(ObjectLiteralExpr),
}

impl Expr {
    /// The position of the node's introducing token.
    pub fn pos(&self) -> Position {
        match self {
            Expr::Literal(expr) => expr.pos,
            Expr::Identifier(expr) => expr.pos,
            Expr::Context(expr) => expr.pos,
            Expr::Unary(expr) => expr.pos,
            Expr::Binary(expr) => expr.pos,
            Expr::MemberAccess(expr) => expr.target.pos(),
            Expr::Call(expr) => expr.pos,
            Expr::Array(expr) => expr.pos,
            Expr::Object(expr) => expr.pos,
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(expr) => Display::fmt(expr, f),
            Expr::Identifier(expr) => Display::fmt(expr, f),
            Expr::Context(expr) => Display::fmt(expr, f),
            Expr::Unary(expr) => Display::fmt(expr, f),
            Expr::Binary(expr) => Display::fmt(expr, f),
            Expr::MemberAccess(expr) => Display::fmt(expr, f),
            Expr::Call(expr) => Display::fmt(expr, f),
            Expr::Array(expr) => Display::fmt(expr, f),
            Expr::Object(expr) => Display::fmt(expr, f),
        }
    }
}

/// A primitive literal: null, bool, int, float, or string. Collection
/// literals have their own node types so element expressions stay lazy.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr {
    pub value: Value,
    pub pos: Position,
}

impl Display for LiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Str(s) => write!(f, "\"{}\"", s),
            value => Display::fmt(value, f),
        }
    }
}

/// A bare identifier. Only legal inside context references, function
/// namespaces, and object keys; the parser rejects standalone occurrences,
/// and evaluating one directly is an `UnknownIdentifierError`.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierExpr {
    pub name: String,
    pub pos: Position,
}

impl Display for IdentifierExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// What a `$` reference selects from the context document.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextHead {
    /// `$` — the whole context object.
    Root,
    /// `$ident` — a named top-level field.
    Ident(IdentifierExpr),
    /// `$[expr]` — a computed top-level key.
    Subscript(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextExpr {
    pub head: ContextHead,
    pub pos: Position,
}

impl Display for ContextExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.head {
            ContextHead::Root => f.write_str("$"),
            ContextHead::Ident(ident) => write!(f, "${}", ident),
            ContextHead::Subscript(expr) => write!(f, "$[{}]", expr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Minus => "-",
            UnaryOp::Not => "NOT",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub pos: Position,
}

impl Display for UnaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            UnaryOp::Minus => write!(f, "-{}", self.operand),
            UnaryOp::Not => write!(f, "NOT {}", self.operand),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessEqual => "<=",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    /// Position of the operator token.
    pub pos: Position,
}

impl Display for BinaryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// One step of a member-access chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPart {
    /// `?.` / `?[` parts yield null instead of raising on a null target or
    /// a missing key.
    pub optional: bool,
    pub kind: MemberKind,
    pub pos: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKind {
    /// `.key` or `?.key` (the key may also be written as a string).
    Key(String),
    /// `[expr]` or `?[expr]`.
    Index(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccessExpr {
    pub target: Box<Expr>,
    pub parts: Vec<MemberPart>,
}

impl Display for MemberAccessExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.target, f)?;
        for part in &self.parts {
            if part.optional {
                f.write_str("?")?;
            }
            match &part.kind {
                MemberKind::Key(key) => write!(f, ".{}", key)?,
                MemberKind::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

/// A namespaced library call such as `math.abs(x)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub namespace: Vec<String>,
    pub args: Vec<Expr>,
    /// Position of the first namespace identifier.
    pub pos: Position,
    /// Position of the opening parenthesis.
    pub paren_pos: Position,
}

impl Display for CallExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({})",
            self.namespace.iter().join("."),
            self.args.iter().map(Expr::to_string).join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteralExpr {
    pub elements: Vec<Expr>,
    pub pos: Position,
}

impl Display for ArrayLiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.elements.iter().map(Expr::to_string).join(", "))
    }
}

/// An object literal. Fields keep their source order; the parser has
/// already rejected duplicate keys.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectLiteralExpr {
    pub fields: Vec<(String, Expr)>,
    pub pos: Position,
}

impl Display for ObjectLiteralExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.fields
                .iter()
                .map(|(key, value)| format!("\"{}\": {}", key, value))
                .join(", ")
        )
    }
}
