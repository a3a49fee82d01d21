use super::{array_arg, check_arity, unknown_function, Arg, Library};
use crate::{error::Error, source::Position, value::Value};

/// Type predicates and conversions, registered under the `type` namespace.
pub struct TypeLib;

impl Library for TypeLib {
    fn call(
        &self,
        function: &str,
        args: &[Arg],
        call_pos: Position,
        paren_pos: Position,
    ) -> Result<Value, Error> {
        match function {
            "string" => {
                check_arity(args, 1, 1, "type.string requires 1 argument", paren_pos)?;
                Ok(Value::Str(convert_string(&args[0].value)))
            }
            "int" => {
                check_arity(args, 1, 1, "type.int requires 1 argument", paren_pos)?;
                convert_int(&args[0].value, args[0].pos, "type.int", "argument").map(Value::Int)
            }
            "float" => {
                check_arity(args, 1, 1, "type.float requires 1 argument", paren_pos)?;
                convert_float(&args[0].value, args[0].pos, "type.float", "argument")
                    .map(Value::Float)
            }
            "isNumber" => {
                check_arity(args, 1, 1, "type.isNumber requires 1 argument", paren_pos)?;
                let result = match &args[0].value {
                    Value::Str(s) => s.trim().parse::<f64>().is_ok(),
                    other => other.as_f64().is_some(),
                };
                Ok(Value::Bool(result))
            }
            "isString" => {
                check_arity(args, 1, 1, "type.isString requires 1 argument", paren_pos)?;
                Ok(Value::Bool(args[0].value.as_str().is_some()))
            }
            "isBoolean" => {
                check_arity(args, 1, 1, "type.isBoolean requires 1 argument", paren_pos)?;
                Ok(Value::Bool(args[0].value.as_bool().is_some()))
            }
            "isArray" => {
                check_arity(args, 1, 1, "type.isArray requires 1 argument", paren_pos)?;
                Ok(Value::Bool(args[0].value.as_array().is_some()))
            }
            "isObject" => {
                check_arity(args, 1, 1, "type.isObject requires 1 argument", paren_pos)?;
                Ok(Value::Bool(args[0].value.as_object().is_some()))
            }
            "isNull" => {
                check_arity(args, 1, 1, "type.isNull requires 1 argument", paren_pos)?;
                Ok(Value::Bool(args[0].value.is_null()))
            }
            "intArray" => {
                check_arity(args, 1, 1, "type.intArray requires 1 argument", paren_pos)?;
                let arr = array_arg(&args[0], "type.intArray: argument must be an array")?;
                let mut out = Vec::with_capacity(arr.len());
                for elem in arr {
                    out.push(Value::Int(convert_int(
                        elem,
                        args[0].pos,
                        "type.intArray",
                        "element",
                    )?));
                }
                Ok(Value::Array(out))
            }
            "floatArray" => {
                check_arity(args, 1, 1, "type.floatArray requires 1 argument", paren_pos)?;
                let arr = array_arg(&args[0], "type.floatArray: argument must be an array")?;
                let mut out = Vec::with_capacity(arr.len());
                for elem in arr {
                    out.push(Value::Float(convert_float(
                        elem,
                        args[0].pos,
                        "type.floatArray",
                        "element",
                    )?));
                }
                Ok(Value::Array(out))
            }
            "stringArray" => {
                check_arity(args, 1, 1, "type.stringArray requires 1 argument", paren_pos)?;
                let arr = array_arg(&args[0], "type.stringArray: argument must be an array")?;
                Ok(Value::Array(
                    arr.iter().map(|elem| Value::Str(convert_string(elem))).collect(),
                ))
            }
            _ => Err(unknown_function("type", function, call_pos)),
        }
    }
}

fn convert_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.canonical(),
    }
}

/// Strips whitespace and one layer of symmetric quotes before numeric
/// parsing, so `" '42' "` converts cleanly.
fn unquote(s: &str) -> &str {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}

fn convert_int(value: &Value, pos: Position, func: &str, what: &str) -> Result<i64, Error> {
    match value {
        Value::Null => Ok(0),
        Value::Str(s) => {
            let stripped = unquote(s);
            if let Ok(n) = stripped.parse::<i64>() {
                return Ok(n);
            }
            if let Ok(f) = stripped.parse::<f64>() {
                return Ok(f as i64);
            }
            Err(Error::function_call(
                format!("{}: string '{}' cannot be converted to int", func, s),
                pos,
            ))
        }
        other => other.as_i64().ok_or_else(|| {
            Error::type_error(
                format!("{}: {} cannot be converted to int", func, what),
                pos,
            )
        }),
    }
}

fn convert_float(value: &Value, pos: Position, func: &str, what: &str) -> Result<f64, Error> {
    match value {
        Value::Null => Ok(0.0),
        Value::Str(s) => {
            let stripped = unquote(s);
            stripped.parse::<f64>().map_err(|_| {
                Error::function_call(
                    format!("{}: string '{}' cannot be converted to float", func, s),
                    pos,
                )
            })
        }
        other => other.as_f64().ok_or_else(|| {
            Error::type_error(
                format!("{}: {} cannot be converted to float", func, what),
                pos,
            )
        }),
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
        TypeLib.call(function, &args, Position::new(1, 1), Position::new(1, 9))
    }

    #[test]
    fn null_converts_to_zero_values() {
        assert_eq!(call("string", vec![Value::Null]).unwrap(), Value::Str("".into()));
        assert_eq!(call("int", vec![Value::Null]).unwrap(), Value::Int(0));
        assert_eq!(call("float", vec![Value::Null]).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn int_parses_trimmed_and_quoted_strings() {
        assert_eq!(
            call("int", vec![Value::Str("  '42'  ".into())]).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            call("int", vec![Value::Str("3.9".into())]).unwrap(),
            Value::Int(3)
        );
        let err = call("int", vec![Value::Str("nope".into())]).unwrap_err();
        assert_eq!(
            err.message(),
            "type.int: string 'nope' cannot be converted to int"
        );
    }

    #[test]
    fn float_rejects_booleans() {
        let err = call("float", vec![Value::Bool(true)]).unwrap_err();
        assert_eq!(err.message(), "type.float: argument cannot be converted to float");
    }

    #[test]
    fn predicates() {
        assert_eq!(call("isNumber", vec![Value::Int(1)]).unwrap(), Value::Bool(true));
        assert_eq!(
            call("isNumber", vec![Value::Str(" 2.5 ".into())]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("isNumber", vec![Value::Str("x".into())]).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(call("isNull", vec![Value::Null]).unwrap(), Value::Bool(true));
        assert_eq!(
            call("isArray", vec![Value::Array(vec![])]).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn element_wise_conversions() {
        let arr = Value::Array(vec![
            Value::Str("1".into()),
            Value::Float(2.5),
            Value::Null,
        ]);
        assert_eq!(
            call("intArray", vec![arr.clone()]).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(0)])
        );
        assert_eq!(
            call("floatArray", vec![arr.clone()]).unwrap(),
            Value::Array(vec![Value::Float(1.0), Value::Float(2.5), Value::Float(0.0)])
        );
        assert_eq!(
            call("stringArray", vec![arr]).unwrap(),
            Value::Array(vec![
                Value::Str("1".into()),
                Value::Str("2.5".into()),
                Value::Str("".into())
            ])
        );
    }
}
