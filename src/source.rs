use std::fmt::{self, Display};

/// A 1-based line/column pair pointing into the source text.
///
/// Tokens decoded from bytecode carry `(-1, -1)` since the binary format
/// does not preserve positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: i32,
    pub column: i32,
}

impl Position {
    pub const UNKNOWN: Position = Position {
        line: -1,
        column: -1,
    };

    pub fn new(line: i32, column: i32) -> Self {
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

impl From<(i32, i32)> for Position {
    fn from((line, column): (i32, i32)) -> Self {
        Self { line, column }
    }
}
