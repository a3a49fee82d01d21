use super::{check_arity, num_arg, str_arg, unknown_function, Arg, Library};
use crate::{error::Error, source::Position, value::Value};

/// Numeric functions plus array folds. The folds (`sum`, `min`, `max`,
/// `avg`) always produce a `Float`, even over all-integer input.
pub struct MathLib;

impl Library for MathLib {
    fn call(
        &self,
        function: &str,
        args: &[Arg],
        call_pos: Position,
        paren_pos: Position,
    ) -> Result<Value, Error> {
        match function {
            "abs" => {
                check_arity(args, 1, 1, "math.abs requires 1 argument", paren_pos)?;
                num_arg(&args[0], "math.abs: argument must be numeric")?;
                Ok(match args[0].value {
                    Value::Int(n) => Value::Int(n.wrapping_abs()),
                    Value::Float(n) => Value::Float(n.abs()),
                    _ => unreachable!("checked numeric above"),
                })
            }
            "sqrt" => {
                check_arity(args, 1, 1, "math.sqrt requires 1 argument", paren_pos)?;
                let num = num_arg(&args[0], "math.sqrt: argument must be numeric")?;
                if num < 0.0 {
                    return Err(Error::function_call(
                        "math.sqrt: argument must be non-negative",
                        args[0].pos,
                    ));
                }
                Ok(Value::Float(num.sqrt()))
            }
            "floor" => {
                check_arity(args, 1, 1, "math.floor requires 1 argument", paren_pos)?;
                let num = num_arg(&args[0], "math.floor: argument must be numeric")?;
                Ok(Value::Float(num.floor()))
            }
            "round" => {
                check_arity(args, 1, 1, "math.round requires 1 argument", paren_pos)?;
                let num = num_arg(&args[0], "math.round: argument must be numeric")?;
                Ok(Value::Float(num.round()))
            }
            "ceil" => {
                check_arity(args, 1, 1, "math.ceil requires 1 argument", paren_pos)?;
                let num = num_arg(&args[0], "math.ceil: argument must be numeric")?;
                Ok(Value::Float(num.ceil()))
            }
            "pow" => {
                check_arity(args, 2, 2, "math.pow requires 2 arguments", paren_pos)?;
                let base = num_arg(&args[0], "math.pow: first argument must be numeric")?;
                let exp = num_arg(&args[1], "math.pow: second argument must be numeric")?;
                Ok(Value::Float(base.powf(exp)))
            }
            "sum" => {
                let values = Fold::open("math.sum", args, paren_pos)?;
                let mut sum = 0.0;
                for num in values.numbers() {
                    sum += num?;
                }
                Ok(Value::Float(sum))
            }
            "min" => {
                let values = Fold::open("math.min", args, paren_pos)?;
                if let Some(default) = values.empty_result()? {
                    return Ok(default);
                }
                let mut min = f64::INFINITY;
                for num in values.numbers() {
                    min = min.min(num?);
                }
                Ok(Value::Float(min))
            }
            "max" => {
                let values = Fold::open("math.max", args, paren_pos)?;
                if let Some(default) = values.empty_result()? {
                    return Ok(default);
                }
                let mut max = f64::NEG_INFINITY;
                for num in values.numbers() {
                    max = max.max(num?);
                }
                Ok(Value::Float(max))
            }
            "avg" => {
                let values = Fold::open("math.avg", args, paren_pos)?;
                if let Some(default) = values.empty_result()? {
                    return Ok(default);
                }
                let mut sum = 0.0;
                let mut count = 0usize;
                for num in values.strict_numbers() {
                    sum += num?;
                    count += 1;
                }
                Ok(Value::Float(sum / count as f64))
            }
            _ => Err(unknown_function("math", function, call_pos)),
        }
    }
}

/// Shared plumbing for the array folds: a source array, an optional
/// subfield to extract from object elements, and an optional per-element
/// default.
struct Fold<'a> {
    func: &'static str,
    array: &'a [Value],
    subfield: Option<&'a str>,
    default: Option<&'a Value>,
    pos: Position,
}

impl<'a> Fold<'a> {
    fn open(func: &'static str, args: &'a [Arg], paren_pos: Position) -> Result<Self, Error> {
        check_arity(
            args,
            1,
            3,
            &format!("{} requires 1 to 3 arguments", func),
            paren_pos,
        )?;
        let array = super::array_arg(
            &args[0],
            &format!("{}: first argument must be an array", func),
        )?;
        let subfield = match args.get(1) {
            Some(arg) => Some(str_arg(
                arg,
                &format!("{}: second argument must be string", func),
            )?),
            None => None,
        };
        Ok(Self {
            func,
            array,
            // An empty subfield behaves as if none was given.
            subfield: subfield.filter(|s| !s.is_empty()),
            default: args.get(2).map(|arg| &arg.value),
            pos: args[0].pos,
        })
    }

    /// For min/max/avg over an empty array: the default if provided, else
    /// a `FunctionCallError`.
    fn empty_result(&self) -> Result<Option<Value>, Error> {
        if !self.array.is_empty() {
            return Ok(None);
        }
        match self.default {
            Some(default) => Ok(Some(default.clone())),
            None => Err(Error::function_call(
                format!("{}: array is empty", self.func),
                self.pos,
            )),
        }
    }

    fn element(&self, elem: &'a Value, lenient: bool) -> Result<&'a Value, Error> {
        let Some(subfield) = self.subfield else {
            return Ok(elem);
        };
        let fields = match elem.as_object() {
            Some(fields) => fields,
            None => {
                return match self.default {
                    Some(default) if lenient => Ok(default),
                    _ => Err(Error::function_call(
                        format!("{}: element is not an object and subfield specified", self.func),
                        self.pos,
                    )),
                };
            }
        };
        match fields.get(subfield) {
            Some(value) => Ok(value),
            None => match self.default {
                Some(default) if lenient => Ok(default),
                _ => Err(Error::function_call(
                    format!("{}: field '{}' missing in element", self.func, subfield),
                    self.pos,
                )),
            },
        }
    }

    fn number_of(&self, value: &Value) -> Result<f64, Error> {
        value.as_f64().ok_or_else(|| {
            Error::type_error(format!("{}: element is not numeric", self.func), self.pos)
        })
    }

    /// Element values projected to f64, with the default substituting for
    /// non-object elements and missing fields.
    fn numbers<'s>(&'s self) -> impl Iterator<Item = Result<f64, Error>> + 's {
        self.array.iter().map(move |elem| {
            let value = self.element(elem, true)?;
            self.number_of(value)
        })
    }

    /// Like `numbers`, but a non-object element never falls back to the
    /// default (avg is stricter than the other folds).
    fn strict_numbers<'s>(&'s self) -> impl Iterator<Item = Result<f64, Error>> + 's {
        self.array.iter().map(move |elem| {
            let value = self.element(elem, false)?;
            self.number_of(value)
        })
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
        MathLib.call(function, &args, Position::new(1, 1), Position::new(1, 9))
    }

    #[test]
    fn abs_preserves_the_numeric_variant() {
        assert_eq!(call("abs", vec![Value::Int(-4)]).unwrap(), Value::Int(4));
        assert_eq!(
            call("abs", vec![Value::Float(-4.5)]).unwrap(),
            Value::Float(4.5)
        );
    }

    #[test]
    fn folds_return_floats() {
        let arr = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(call("sum", vec![arr.clone()]).unwrap(), Value::Float(6.0));
        assert_eq!(call("min", vec![arr.clone()]).unwrap(), Value::Float(1.0));
        assert_eq!(call("max", vec![arr.clone()]).unwrap(), Value::Float(3.0));
        assert_eq!(call("avg", vec![arr]).unwrap(), Value::Float(2.0));
    }

    #[test]
    fn folds_extract_subfields_with_defaults() {
        let mut a = crate::value::Map::new();
        a.insert("price".to_string(), Value::Int(50));
        let mut b = crate::value::Map::new();
        b.insert("other".to_string(), Value::Int(1));
        let arr = Value::Array(vec![Value::Object(a), Value::Object(b)]);
        assert_eq!(
            call(
                "sum",
                vec![arr.clone(), Value::Str("price".into()), Value::Int(10)]
            )
            .unwrap(),
            Value::Float(60.0)
        );
        let err = call("sum", vec![arr, Value::Str("price".into())]).unwrap_err();
        assert_eq!(err.message(), "math.sum: field 'price' missing in element");
    }

    #[test]
    fn avg_of_empty_array_needs_a_default() {
        let empty = Value::Array(vec![]);
        let err = call("avg", vec![empty.clone()]).unwrap_err();
        assert_eq!(err.message(), "math.avg: array is empty");
        assert_eq!(
            call("avg", vec![empty, Value::Str("x".into()), Value::Int(7)]).unwrap(),
            Value::Int(7)
        );
    }

    #[test]
    fn sqrt_rejects_negatives() {
        let err = call("sqrt", vec![Value::Int(-1)]).unwrap_err();
        assert_eq!(err.message(), "math.sqrt: argument must be non-negative");
    }
}
