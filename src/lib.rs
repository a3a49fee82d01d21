//! LQL: a small expression language for evaluating predicates and queries
//! over JSON-shaped documents. Source compiles once into an immutable AST
//! and evaluates any number of times against distinct context documents,
//! yielding a typed [`Value`] or a positioned [`Error`].
//!
//! ```
//! use lql::{evaluate, parse, Environment, Map, Value};
//!
//! let expr = parse("$sensor.reading + 1").unwrap();
//! let env = Environment::new();
//! let mut sensor = Map::new();
//! sensor.insert("reading".to_string(), Value::Int(100));
//! let mut ctx = Map::new();
//! ctx.insert("sensor".to_string(), Value::Object(sensor));
//! assert_eq!(evaluate(&expr, &ctx, &env).unwrap(), Value::Int(101));
//! ```

pub mod ast;
pub mod bytecode;
mod env;
mod error;
mod interpreter;
mod parser;
mod scanner;
mod source;
mod token;
mod value;

pub use ast::Expr;
pub use bytecode::{export_tokens, export_tokens_signed, ByteCodeReader, CodecError};
pub use env::{
    Arg, ArrayLib, CondLib, Environment, Library, MathLib, RegexLib, StringLib, TimeLib, TypeLib,
};
pub use error::{Error, ErrorKind};
pub use interpreter::{evaluate, Interpreter};
pub use parser::Parser;
pub use scanner::Scanner;
pub use source::Position;
pub use token::{Token, TokenStream, TokenType};
pub use value::{Map, TimeValue, Value};

/// Compiles a source string into an AST.
pub fn parse(source: &str) -> Result<Expr, Error> {
    Parser::new(Scanner::new(source))?.parse()
}
