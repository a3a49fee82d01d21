use super::{array_arg, bool_arg, check_arity, str_arg, unknown_function, Arg, Library};
use crate::{error::Error, source::Position, value::Value};

/// Array helpers. Element equality follows the language rule: numeric
/// tolerance, canonical form otherwise.
pub struct ArrayLib;

impl Library for ArrayLib {
    fn call(
        &self,
        function: &str,
        args: &[Arg],
        call_pos: Position,
        paren_pos: Position,
    ) -> Result<Value, Error> {
        match function {
            "contains" => {
                check_arity(args, 2, 2, "array.contains requires 2 arguments", paren_pos)?;
                let arr = array_arg(&args[0], "array.contains: first argument must be an array")?;
                let target = &args[1].value;
                Ok(Value::Bool(arr.iter().any(|item| item.loosely_equals(target))))
            }
            "find" => {
                check_arity(args, 3, 4, "array.find requires 3 or 4 arguments", paren_pos)?;
                let arr = array_arg(&args[0], "array.find: first argument must be an array")?;
                let subfield = str_arg(&args[1], "array.find: second argument must be string")?;
                let target = &args[2].value;
                for elem in arr {
                    let Some(fields) = elem.as_object() else {
                        continue;
                    };
                    if let Some(value) = fields.get(subfield) {
                        if value.loosely_equals(target) {
                            return Ok(elem.clone());
                        }
                    }
                }
                match args.get(3) {
                    Some(default) => Ok(default.value.clone()),
                    None => Err(Error::function_call(
                        "array.find: no match found",
                        args[0].pos,
                    )),
                }
            }
            "first" => {
                check_arity(args, 1, 2, "array.first requires 1 or 2 arguments", paren_pos)?;
                let arr = array_arg(&args[0], "array.first: argument must be an array")?;
                match arr.first() {
                    Some(first) => Ok(first.clone()),
                    None => match args.get(1) {
                        Some(default) => Ok(default.value.clone()),
                        None => Err(Error::function_call(
                            "array.first: array is empty",
                            args[0].pos,
                        )),
                    },
                }
            }
            "last" => {
                check_arity(args, 1, 2, "array.last requires 1 or 2 arguments", paren_pos)?;
                let arr = array_arg(&args[0], "array.last: argument must be an array")?;
                match arr.last() {
                    Some(last) => Ok(last.clone()),
                    None => match args.get(1) {
                        Some(default) => Ok(default.value.clone()),
                        None => Err(Error::function_call(
                            "array.last: array is empty",
                            args[0].pos,
                        )),
                    },
                }
            }
            "extract" => {
                check_arity(args, 2, 3, "array.extract requires 2 or 3 arguments", paren_pos)?;
                let arr = array_arg(&args[0], "array.extract: argument must be an array")?;
                let subfield = str_arg(&args[1], "array.extract: second argument must be string")?;
                let default = args.get(2).map(|arg| arg.value.clone()).unwrap_or(Value::Null);
                let extracted = arr
                    .iter()
                    .map(|elem| {
                        elem.as_object()
                            .and_then(|fields| fields.get(subfield))
                            .cloned()
                            .unwrap_or_else(|| default.clone())
                    })
                    .collect();
                Ok(Value::Array(extracted))
            }
            "sort" => {
                check_arity(args, 1, 2, "array.sort requires 1 or 2 arguments", paren_pos)?;
                let arr = array_arg(&args[0], "array.sort: first argument must be an array")?;
                let ascending = match args.get(1) {
                    Some(arg) => bool_arg(arg, "array.sort: second argument must be boolean")?,
                    None => true,
                };
                if arr.is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                let mut sorted = arr.to_vec();
                if arr.iter().all(|v| v.as_f64().is_some()) {
                    sorted.sort_by(|a, b| {
                        let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                        if ascending {
                            a.total_cmp(&b)
                        } else {
                            b.total_cmp(&a)
                        }
                    });
                } else if arr.iter().all(|v| v.as_str().is_some()) {
                    sorted.sort_by(|a, b| {
                        let (a, b) = (a.as_str().unwrap_or(""), b.as_str().unwrap_or(""));
                        if ascending {
                            a.cmp(b)
                        } else {
                            b.cmp(a)
                        }
                    });
                } else {
                    return Err(Error::type_error(
                        "array.sort: elements are not comparable",
                        args[0].pos,
                    ));
                }
                Ok(Value::Array(sorted))
            }
            "flatten" => {
                check_arity(args, 1, 1, "array.flatten requires 1 argument", paren_pos)?;
                let arr = array_arg(&args[0], "array.flatten: argument must be an array")?;
                let mut flattened = Vec::new();
                for elem in arr {
                    match elem {
                        Value::Array(inner) => flattened.extend(inner.iter().cloned()),
                        other => flattened.push(other.clone()),
                    }
                }
                Ok(Value::Array(flattened))
            }
            "filter" => {
                check_arity(
                    args,
                    1,
                    3,
                    "array.filter requires between 1 and 3 arguments",
                    paren_pos,
                )?;
                let arr = array_arg(&args[0], "array.filter: first argument must be an array")?;
                if args.len() == 1 {
                    let kept = arr.iter().filter(|elem| !elem.is_null()).cloned().collect();
                    return Ok(Value::Array(kept));
                }
                let subfield = str_arg(&args[1], "array.filter: subfield argument must be string")?;
                let kept = arr
                    .iter()
                    .filter(|elem| {
                        let Some(fields) = elem.as_object() else {
                            return false;
                        };
                        match fields.get(subfield) {
                            Some(value) => match args.get(2) {
                                Some(target) => value.loosely_equals(&target.value),
                                None => !value.is_null(),
                            },
                            None => false,
                        }
                    })
                    .cloned()
                    .collect();
                Ok(Value::Array(kept))
            }
            _ => Err(unknown_function("array", function, call_pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Map;
    use pretty_assertions::assert_eq;

    fn call(function: &str, args: Vec<Value>) -> Result<Value, Error> {
        let args: Vec<Arg> = args
            .into_iter()
            .enumerate()
            .map(|(i, value)| Arg::new(value, Position::new(1, 10 + i as i32)))
            .collect();
        ArrayLib.call(function, &args, Position::new(1, 1), Position::new(1, 9))
    }

    fn obj(key: &str, value: Value) -> Value {
        let mut fields = Map::new();
        fields.insert(key.to_string(), value);
        Value::Object(fields)
    }

    #[test]
    fn contains_uses_loose_equality() {
        let arr = Value::Array(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            call("contains", vec![arr.clone(), Value::Float(2.0)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("contains", vec![arr, Value::Int(3)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn find_returns_the_matching_object_or_default() {
        let arr = Value::Array(vec![obj("id", Value::Int(1)), obj("id", Value::Int(2))]);
        assert_eq!(
            call("find", vec![arr.clone(), Value::Str("id".into()), Value::Int(2)]).unwrap(),
            obj("id", Value::Int(2))
        );
        assert_eq!(
            call(
                "find",
                vec![
                    arr.clone(),
                    Value::Str("id".into()),
                    Value::Int(9),
                    Value::Null
                ]
            )
            .unwrap(),
            Value::Null
        );
        let err = call("find", vec![arr, Value::Str("id".into()), Value::Int(9)]).unwrap_err();
        assert_eq!(err.message(), "array.find: no match found");
    }

    #[test]
    fn sort_is_typed_and_directional() {
        let nums = Value::Array(vec![Value::Int(3), Value::Float(1.5), Value::Int(2)]);
        assert_eq!(
            call("sort", vec![nums.clone()]).unwrap(),
            Value::Array(vec![Value::Float(1.5), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            call("sort", vec![nums, Value::Bool(false)]).unwrap(),
            Value::Array(vec![Value::Int(3), Value::Int(2), Value::Float(1.5)])
        );
        let mixed = Value::Array(vec![Value::Int(1), Value::Str("a".into())]);
        let err = call("sort", vec![mixed]).unwrap_err();
        assert_eq!(err.message(), "array.sort: elements are not comparable");
    }

    #[test]
    fn filter_arities() {
        let arr = Value::Array(vec![
            obj("status", Value::Str("open".into())),
            obj("status", Value::Null),
            obj("other", Value::Int(1)),
            Value::Null,
        ]);
        let dropped_nulls = call("filter", vec![arr.clone()]).unwrap();
        assert_eq!(dropped_nulls.as_array().unwrap().len(), 3);
        let present = call("filter", vec![arr.clone(), Value::Str("status".into())]).unwrap();
        assert_eq!(present.as_array().unwrap().len(), 1);
        let matching = call(
            "filter",
            vec![arr, Value::Str("status".into()), Value::Str("open".into())],
        )
        .unwrap();
        assert_eq!(matching.as_array().unwrap().len(), 1);
    }

    #[test]
    fn flatten_goes_exactly_one_level() {
        let nested = Value::Array(vec![
            Value::Array(vec![Value::Int(1), Value::Array(vec![Value::Int(2)])]),
            Value::Int(3),
        ]);
        assert_eq!(
            call("flatten", vec![nested]).unwrap(),
            Value::Array(vec![
                Value::Int(1),
                Value::Array(vec![Value::Int(2)]),
                Value::Int(3)
            ])
        );
    }

    #[test]
    fn extract_maps_fields_with_default() {
        let arr = Value::Array(vec![obj("v", Value::Int(1)), obj("w", Value::Int(2))]);
        assert_eq!(
            call("extract", vec![arr, Value::Str("v".into()), Value::Int(0)]).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(0)])
        );
    }
}
