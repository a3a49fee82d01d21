use crate::source::Position;
use thiserror::Error as ThisError;

/// Classification keys for every failure the pipeline can produce.
/// Lexical, Syntax, and Semantic arise at compile time; the rest at
/// evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    #[strum(serialize = "LexicalError")]
    Lexical,
    #[strum(serialize = "SyntaxError")]
    Syntax,
    #[strum(serialize = "SemanticError")]
    Semantic,
    #[strum(serialize = "TypeError")]
    Type,
    #[strum(serialize = "DivideByZeroError")]
    DivideByZero,
    #[strum(serialize = "ReferenceError")]
    Reference,
    #[strum(serialize = "UnknownIdentifierError")]
    UnknownIdentifier,
    #[strum(serialize = "UnknownOperatorError")]
    UnknownOperator,
    #[strum(serialize = "FunctionCallError")]
    FunctionCall,
    #[strum(serialize = "ParameterError")]
    Parameter,
    #[strum(serialize = "ArrayOutOfBoundsError")]
    ArrayOutOfBounds,
}

/// A positioned evaluation or compile error.
///
/// Every error carries its kind, a message, and the most specific source
/// position available at construction. The rendered form is stable:
/// `<Kind>: <message> at line <L>, column <C>`.
#[derive(Debug, Clone, PartialEq, ThisError)]
#[error("{kind}: {message} at {position}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    position: Position,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            message: message.into(),
            position,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn lexical(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::Lexical, message, position)
    }

    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::Syntax, message, position)
    }

    pub fn semantic(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::Semantic, message, position)
    }

    pub fn type_error(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::Type, message, position)
    }

    pub fn divide_by_zero(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::DivideByZero, message, position)
    }

    pub fn reference(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::Reference, message, position)
    }

    pub fn unknown_identifier(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::UnknownIdentifier, message, position)
    }

    pub fn unknown_operator(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::UnknownOperator, message, position)
    }

    pub fn function_call(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::FunctionCall, message, position)
    }

    pub fn parameter(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::Parameter, message, position)
    }

    pub fn array_out_of_bounds(message: impl Into<String>, position: Position) -> Self {
        Self::new(ErrorKind::ArrayOutOfBounds, message, position)
    }

    /// Renders the offending source line followed by a pointer line of
    /// dashes ending in `^` under the error column. Tabs in the source line
    /// are mirrored into the pointer so the caret stays aligned. Returns an
    /// empty string when the position does not land inside `source`.
    pub fn annotate(&self, source: &str) -> String {
        let Position { line, column } = self.position;
        if line < 1 {
            return String::new();
        }
        let line_text = match source.split('\n').nth(line as usize - 1) {
            Some(text) => text,
            None => return String::new(),
        };
        let column = (column.max(0) as usize).min(line_text.len());
        let mut pointer = String::new();
        for byte in line_text.bytes().take(column.saturating_sub(1)) {
            pointer.push(if byte == b'\t' { '\t' } else { '-' });
        }
        pointer.push('^');
        format!("    {}\n    {}", line_text, pointer)
    }
}
