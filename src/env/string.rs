use super::{array_arg, check_arity, int_arg, str_arg, unknown_function, Arg, Library};
use crate::{error::Error, source::Position, value::Value};

/// String manipulation. `substring` works in Unicode scalars; `indexOf`
/// and `replace` work on the raw byte/literal level like the rest of the
/// language's string handling.
pub struct StringLib;

impl Library for StringLib {
    fn call(
        &self,
        function: &str,
        args: &[Arg],
        call_pos: Position,
        paren_pos: Position,
    ) -> Result<Value, Error> {
        match function {
            "concat" => {
                check_arity(
                    args,
                    1,
                    usize::MAX,
                    "string.concat requires at least 1 argument",
                    paren_pos,
                )?;
                let mut out = String::new();
                for arg in args {
                    out.push_str(str_arg(arg, "string.concat: all arguments must be strings")?);
                }
                Ok(Value::Str(out))
            }
            "toLower" => {
                check_arity(args, 1, 1, "string.toLower requires 1 argument", paren_pos)?;
                let s = str_arg(&args[0], "string.toLower: argument must be string")?;
                Ok(Value::Str(s.to_lowercase()))
            }
            "toUpper" => {
                check_arity(args, 1, 1, "string.toUpper requires 1 argument", paren_pos)?;
                let s = str_arg(&args[0], "string.toUpper: argument must be string")?;
                Ok(Value::Str(s.to_uppercase()))
            }
            "trim" => {
                check_arity(args, 1, 1, "string.trim requires 1 argument", paren_pos)?;
                let s = str_arg(&args[0], "string.trim: argument must be string")?;
                Ok(Value::Str(s.trim().to_string()))
            }
            "startsWith" => {
                check_arity(args, 2, 2, "string.startsWith requires 2 arguments", paren_pos)?;
                let s = str_arg(&args[0], "string.startsWith: first argument must be string")?;
                let prefix = str_arg(&args[1], "string.startsWith: second argument must be string")?;
                Ok(Value::Bool(s.starts_with(prefix)))
            }
            "endsWith" => {
                check_arity(args, 2, 2, "string.endsWith requires 2 arguments", paren_pos)?;
                let s = str_arg(&args[0], "string.endsWith: first argument must be string")?;
                let suffix = str_arg(&args[1], "string.endsWith: second argument must be string")?;
                Ok(Value::Bool(s.ends_with(suffix)))
            }
            "contains" => {
                check_arity(args, 2, 2, "string.contains requires 2 arguments", paren_pos)?;
                let s = str_arg(&args[0], "string.contains: first argument must be string")?;
                let substr = str_arg(&args[1], "string.contains: second argument must be string")?;
                Ok(Value::Bool(s.contains(substr)))
            }
            "split" => {
                check_arity(args, 2, 2, "string.split requires 2 arguments", paren_pos)?;
                let s = str_arg(&args[0], "string.split: first argument must be string")?;
                let delim = str_arg(&args[1], "string.split: second argument must be string")?;
                // An empty delimiter splits into individual scalars.
                let parts: Vec<Value> = if delim.is_empty() {
                    s.chars().map(|ch| Value::Str(ch.to_string())).collect()
                } else {
                    s.split(delim).map(|part| Value::Str(part.to_string())).collect()
                };
                Ok(Value::Array(parts))
            }
            "join" => {
                check_arity(args, 2, 2, "string.join requires 2 arguments", paren_pos)?;
                let arr = array_arg(&args[0], "string.join: first argument must be an array")?;
                let sep = str_arg(&args[1], "string.join: second argument must be string")?;
                let mut parts = Vec::with_capacity(arr.len());
                for item in arr {
                    match item.as_str() {
                        Some(s) => parts.push(s),
                        None => {
                            return Err(Error::type_error(
                                "string.join: all array elements must be strings",
                                args[0].pos,
                            ));
                        }
                    }
                }
                Ok(Value::Str(parts.join(sep)))
            }
            "substring" => {
                check_arity(args, 3, 3, "string.substring requires 3 arguments", paren_pos)?;
                let s = str_arg(&args[0], "string.substring: first argument must be a string")?;
                let start = int_arg(&args[1], "string.substring: second argument must be an integer")?;
                let length = int_arg(&args[2], "string.substring: third argument must be an integer")?;
                let chars: Vec<char> = s.chars().collect();
                if start < 0 || start as usize >= chars.len() {
                    return Err(Error::function_call(
                        "string.substring: start index out of bounds",
                        args[1].pos,
                    ));
                }
                let start = start as usize;
                let end = start
                    .saturating_add(length.max(0) as usize)
                    .min(chars.len());
                Ok(Value::Str(chars[start..end].iter().collect()))
            }
            "replace" => {
                check_arity(args, 3, 4, "string.replace requires 3 or 4 arguments", paren_pos)?;
                let s = str_arg(&args[0], "string.replace: first argument must be a string")?;
                let old = str_arg(&args[1], "string.replace: second argument must be a string")?;
                let new = str_arg(&args[2], "string.replace: third argument must be a string")?;
                let limit = match args.get(3) {
                    Some(arg) => int_arg(arg, "string.replace: fourth argument must be numeric")?,
                    None => -1,
                };
                if limit < 0 {
                    Ok(Value::Str(s.replace(old, new)))
                } else {
                    Ok(Value::Str(s.replacen(old, new, limit as usize)))
                }
            }
            "indexOf" => {
                check_arity(args, 2, 3, "string.indexOf requires 2 or 3 arguments", paren_pos)?;
                let s = str_arg(&args[0], "string.indexOf: first argument must be a string")?;
                let substr = str_arg(&args[1], "string.indexOf: second argument must be a string")?;
                let from = match args.get(2) {
                    Some(arg) => int_arg(arg, "string.indexOf: third argument must be numeric")?,
                    None => 0,
                };
                if from < 0 || from as usize >= s.len() {
                    return Ok(Value::Int(-1));
                }
                let from = from as usize;
                match find_bytes(&s.as_bytes()[from..], substr.as_bytes()) {
                    Some(idx) => Ok(Value::Int((from + idx) as i64)),
                    None => Ok(Value::Int(-1)),
                }
            }
            _ => Err(unknown_function("string", function, call_pos)),
        }
    }
}

/// Byte-level substring search; indices are byte offsets.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
