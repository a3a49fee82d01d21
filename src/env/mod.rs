mod array;
mod cond;
mod math;
mod regex;
mod string;
mod time;
mod type_lib;

pub use self::array::ArrayLib;
pub use self::cond::CondLib;
pub use self::math::MathLib;
pub use self::regex::RegexLib;
pub use self::string::StringLib;
pub use self::time::TimeLib;
pub use self::type_lib::TypeLib;

use crate::{
    error::Error,
    source::Position,
    value::{Map, TimeValue, Value},
};
use derive_new::new;
use std::collections::HashMap;

/// An evaluated argument, tagged with the position of the expression that
/// produced it so libraries can point errors at the offending argument.
#[derive(Debug, Clone, new)]
pub struct Arg {
    pub value: Value,
    pub pos: Position,
}

/// A namespaced function library. Implementations must be effect-free and
/// reentrant: one environment serves many concurrent evaluations.
pub trait Library: Send + Sync {
    fn call(
        &self,
        function: &str,
        args: &[Arg],
        call_pos: Position,
        paren_pos: Position,
    ) -> Result<Value, Error>;
}

/// Maps library namespaces to implementations. Built once, populated, then
/// shared read-only by every evaluation.
pub struct Environment {
    libraries: HashMap<String, Box<dyn Library>>,
}

impl Environment {
    /// An environment pre-populated with the seven standard libraries.
    pub fn new() -> Self {
        let mut env = Self {
            libraries: HashMap::new(),
        };
        env.register("time", TimeLib);
        env.register("math", MathLib);
        env.register("string", StringLib);
        env.register("regex", RegexLib);
        env.register("array", ArrayLib);
        env.register("cond", CondLib);
        env.register("type", TypeLib);
        env
    }

    pub fn register(&mut self, namespace: impl Into<String>, library: impl Library + 'static) {
        self.libraries.insert(namespace.into(), Box::new(library));
    }

    pub fn library(&self, name: &str) -> Option<&dyn Library> {
        self.libraries.get(name).map(Box::as_ref)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Position for arity errors: the opening parenthesis when no arguments
/// were passed, otherwise the last argument expression.
pub(crate) fn arity_pos(args: &[Arg], paren_pos: Position) -> Position {
    args.last().map(|arg| arg.pos).unwrap_or(paren_pos)
}

pub(crate) fn check_arity(
    args: &[Arg],
    min: usize,
    max: usize,
    message: &str,
    paren_pos: Position,
) -> Result<(), Error> {
    if args.len() < min || args.len() > max {
        return Err(Error::parameter(message, arity_pos(args, paren_pos)));
    }
    Ok(())
}

pub(crate) fn unknown_function(library: &str, function: &str, call_pos: Position) -> Error {
    Error::function_call(
        format!("unknown {} function '{}'", library, function),
        call_pos,
    )
}

pub(crate) fn str_arg<'a>(arg: &'a Arg, message: &str) -> Result<&'a str, Error> {
    arg.value
        .as_str()
        .ok_or_else(|| Error::type_error(message, arg.pos))
}

pub(crate) fn num_arg(arg: &Arg, message: &str) -> Result<f64, Error> {
    arg.value
        .as_f64()
        .ok_or_else(|| Error::type_error(message, arg.pos))
}

pub(crate) fn int_arg(arg: &Arg, message: &str) -> Result<i64, Error> {
    arg.value
        .as_i64()
        .ok_or_else(|| Error::type_error(message, arg.pos))
}

pub(crate) fn bool_arg(arg: &Arg, message: &str) -> Result<bool, Error> {
    arg.value
        .as_bool()
        .ok_or_else(|| Error::type_error(message, arg.pos))
}

pub(crate) fn array_arg<'a>(arg: &'a Arg, message: &str) -> Result<&'a [Value], Error> {
    arg.value
        .as_array()
        .ok_or_else(|| Error::type_error(message, arg.pos))
}

pub(crate) fn object_arg<'a>(arg: &'a Arg, message: &str) -> Result<&'a Map, Error> {
    arg.value
        .as_object()
        .ok_or_else(|| Error::type_error(message, arg.pos))
}

pub(crate) fn time_arg<'a>(arg: &'a Arg, message: &str) -> Result<&'a TimeValue, Error> {
    match &arg.value {
        Value::Time(time) => Ok(time),
        _ => Err(Error::type_error(message, arg.pos)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arity_errors_point_at_paren_or_last_argument() {
        let paren = Position::new(1, 9);
        assert_eq!(arity_pos(&[], paren), paren);
        let args = vec![
            Arg::new(Value::Int(1), Position::new(1, 10)),
            Arg::new(Value::Int(2), Position::new(1, 13)),
        ];
        assert_eq!(arity_pos(&args, paren), Position::new(1, 13));
    }

    #[test]
    fn unknown_functions_are_function_call_errors() {
        let env = Environment::new();
        let lib = env.library("math").unwrap();
        let err = lib
            .call("nope", &[], Position::new(1, 1), Position::new(1, 9))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "FunctionCallError: unknown math function 'nope' at line 1, column 1"
        );
    }

    #[test]
    fn custom_libraries_can_be_registered() {
        struct EchoLib;
        impl Library for EchoLib {
            fn call(
                &self,
                function: &str,
                _args: &[Arg],
                _call_pos: Position,
                _paren_pos: Position,
            ) -> Result<Value, Error> {
                Ok(Value::Str(function.to_string()))
            }
        }
        let mut env = Environment::new();
        env.register("echo", EchoLib);
        let result = env
            .library("echo")
            .unwrap()
            .call("hi", &[], Position::new(1, 1), Position::new(1, 4))
            .unwrap();
        assert_eq!(result, Value::Str("hi".to_string()));
    }
}
