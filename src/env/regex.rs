use super::{check_arity, int_arg, str_arg, unknown_function, Arg, Library};
use crate::{error::Error, source::Position, value::Value};
use regex::Regex;

/// Regular-expression matching and replacement. Patterns compile on every
/// call; replacement strings support `$N` backreferences.
pub struct RegexLib;

fn compile(pattern: &str, message: &str, pos: Position) -> Result<Regex, Error> {
    Regex::new(pattern).map_err(|_| Error::type_error(message, pos))
}

impl Library for RegexLib {
    fn call(
        &self,
        function: &str,
        args: &[Arg],
        call_pos: Position,
        paren_pos: Position,
    ) -> Result<Value, Error> {
        match function {
            "match" => {
                check_arity(args, 2, 2, "regex.match requires 2 arguments", paren_pos)?;
                let pattern = str_arg(&args[0], "regex.match: first argument must be a string")?;
                let s = str_arg(&args[1], "regex.match: second argument must be a string")?;
                let re = compile(pattern, "regex.match: invalid pattern", args[0].pos)?;
                Ok(Value::Bool(re.is_match(s)))
            }
            "find" => {
                check_arity(args, 2, 2, "regex.find requires 2 arguments", paren_pos)?;
                let pattern = str_arg(&args[0], "regex.find: first argument must be a string")?;
                let s = str_arg(&args[1], "regex.find: second argument must be a string")?;
                let re = compile(pattern, "regex.find: invalid pattern", args[0].pos)?;
                let found = re.find(s).map(|m| m.as_str()).unwrap_or("");
                Ok(Value::Str(found.to_string()))
            }
            "replace" => {
                check_arity(args, 3, 4, "regex.replace requires 3 or 4 arguments", paren_pos)?;
                let s = str_arg(&args[0], "regex.replace: first argument must be a string")?;
                let pattern = str_arg(&args[1], "regex.replace: second argument must be a string")?;
                let replacement =
                    str_arg(&args[2], "regex.replace: third argument must be a string")?;
                let re = compile(pattern, "regex.replace: invalid pattern", args[1].pos)?;
                let replaced = match args.get(3) {
                    None => re.replace_all(s, replacement).into_owned(),
                    Some(arg) => {
                        let limit =
                            int_arg(arg, "regex.replace: fourth argument must be numeric")?;
                        if limit <= 0 {
                            s.to_string()
                        } else {
                            re.replacen(s, limit as usize, replacement).into_owned()
                        }
                    }
                };
                Ok(Value::Str(replaced))
            }
            _ => Err(unknown_function("regex", function, call_pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(function: &str, args: Vec<Value>) -> Result<Value, Error> {
        let args: Vec<Arg> = args
            .into_iter()
            .enumerate()
            .map(|(i, value)| Arg::new(value, Position::new(1, 10 + i as i32)))
            .collect();
        RegexLib.call(function, &args, Position::new(1, 1), Position::new(1, 9))
    }

    #[test]
    fn match_returns_bool() {
        assert_eq!(
            call(
                "match",
                vec![
                    Value::Str("^[A-Z]{3}-\\d+$".into()),
                    Value::Str("ABC-123".into())
                ]
            )
            .unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn find_returns_first_match_or_empty() {
        assert_eq!(
            call(
                "find",
                vec![Value::Str("\\d+".into()), Value::Str("ab 12 cd 34".into())]
            )
            .unwrap(),
            Value::Str("12".into())
        );
        assert_eq!(
            call(
                "find",
                vec![Value::Str("\\d+".into()), Value::Str("none".into())]
            )
            .unwrap(),
            Value::Str("".into())
        );
    }

    #[test]
    fn replace_supports_backreferences_and_limits() {
        assert_eq!(
            call(
                "replace",
                vec![
                    Value::Str("john smith".into()),
                    Value::Str("(\\w+) (\\w+)".into()),
                    Value::Str("$2 $1".into())
                ]
            )
            .unwrap(),
            Value::Str("smith john".into())
        );
        assert_eq!(
            call(
                "replace",
                vec![
                    Value::Str("1 2 3".into()),
                    Value::Str("\\d".into()),
                    Value::Str("x".into()),
                    Value::Int(2)
                ]
            )
            .unwrap(),
            Value::Str("x x 3".into())
        );
    }

    #[test]
    fn bad_patterns_are_type_errors() {
        let err = call(
            "match",
            vec![Value::Str("(".into()), Value::Str("x".into())],
        )
        .unwrap_err();
        assert_eq!(err.message(), "regex.match: invalid pattern");
    }
}
