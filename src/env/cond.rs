use super::{check_arity, object_arg, str_arg, unknown_function, Arg, Library};
use crate::{error::Error, source::Position, value::Value};

/// Conditional helpers. Arguments arrive already evaluated, so `ifExpr`
/// selects between computed values rather than deferring evaluation.
pub struct CondLib;

impl Library for CondLib {
    fn call(
        &self,
        function: &str,
        args: &[Arg],
        call_pos: Position,
        paren_pos: Position,
    ) -> Result<Value, Error> {
        match function {
            "ifExpr" => {
                check_arity(args, 3, 3, "cond.ifExpr requires 3 arguments", paren_pos)?;
                let condition = match &args[0].value {
                    Value::Bool(b) => *b,
                    Value::Null => false,
                    _ => {
                        return Err(Error::type_error(
                            "cond.ifExpr: first argument must be boolean",
                            args[0].pos,
                        ));
                    }
                };
                if condition {
                    Ok(args[1].value.clone())
                } else {
                    Ok(args[2].value.clone())
                }
            }
            "coalesce" => {
                check_arity(
                    args,
                    1,
                    usize::MAX,
                    "cond.coalesce requires at least 1 argument",
                    paren_pos,
                )?;
                for arg in args {
                    if !arg.value.is_null() {
                        return Ok(arg.value.clone());
                    }
                }
                Err(Error::function_call(
                    "cond.coalesce: all arguments are null",
                    args[0].pos,
                ))
            }
            "isFieldPresent" => {
                check_arity(args, 2, 2, "cond.isFieldPresent requires 2 arguments", paren_pos)?;
                let fields = object_arg(
                    &args[0],
                    "cond.isFieldPresent: first argument must be an object",
                )?;
                let key = str_arg(
                    &args[1],
                    "cond.isFieldPresent: second argument must be a string",
                )?;
                Ok(Value::Bool(fields.contains_key(key)))
            }
            _ => Err(unknown_function("cond", function, call_pos)),
        }
    }
}
