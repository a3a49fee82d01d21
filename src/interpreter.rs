use crate::{
    ast::*,
    env::{Arg, Environment},
    error::Error,
    source::Position,
    value::{Map, Value},
};

/// Tree-walking evaluator. Holds only a borrow of the environment; each
/// evaluation takes its own context document, so one interpreter may serve
/// many evaluations and an AST may be evaluated from many threads at once.
pub struct Interpreter<'env> {
    env: &'env Environment,
}

/// Evaluates `expr` against `ctx` using the libraries in `env`.
pub fn evaluate(expr: &Expr, ctx: &Map, env: &Environment) -> Result<Value, Error> {
    Interpreter::new(env).evaluate(expr, ctx)
}

impl<'env> Interpreter<'env> {
    pub fn new(env: &'env Environment) -> Self {
        Self { env }
    }

    pub fn evaluate(&self, expr: &Expr, ctx: &Map) -> Result<Value, Error> {
        match expr {
            Expr::Literal(literal) => Ok(literal.value.clone()),
            Expr::Identifier(ident) => Err(Error::unknown_identifier(
                format!("Bare identifier '{}' is not allowed", ident.name),
                ident.pos,
            )),
            Expr::Context(context) => self.eval_context(context, ctx),
            Expr::Unary(unary) => self.eval_unary(unary, ctx),
            Expr::Binary(binary) => self.eval_binary(binary, ctx),
            Expr::MemberAccess(access) => self.eval_member_access(access, ctx),
            Expr::Call(call) => self.eval_call(call, ctx),
            Expr::Array(array) => {
                let mut elements = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    elements.push(self.evaluate(element, ctx)?);
                }
                Ok(Value::Array(elements))
            }
            Expr::Object(object) => {
                let mut fields = Map::new();
                for (key, value) in &object.fields {
                    fields.insert(key.clone(), self.evaluate(value, ctx)?);
                }
                Ok(Value::Object(fields))
            }
        }
    }

    fn eval_context(&self, context: &ContextExpr, ctx: &Map) -> Result<Value, Error> {
        let key = match &context.head {
            ContextHead::Root => return Ok(Value::Object(ctx.clone())),
            ContextHead::Ident(ident) => ident.name.clone(),
            ContextHead::Subscript(subscript) => match self.evaluate(subscript, ctx)? {
                Value::Str(s) => s,
                other => other.canonical(),
            },
        };
        ctx.get(&key).cloned().ok_or_else(|| {
            Error::reference(format!("field '{}' not found", key), context.pos)
        })
    }

    fn eval_unary(&self, unary: &UnaryExpr, ctx: &Map) -> Result<Value, Error> {
        let value = self.evaluate(&unary.operand, ctx)?;
        match unary.op {
            UnaryOp::Minus => match value {
                Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
                Value::Float(n) => Ok(Value::Float(-n)),
                _ => Err(Error::semantic(
                    "unary '-' operator requires a numeric operand",
                    unary.pos,
                )),
            },
            UnaryOp::Not => match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Err(Error::semantic(
                    "NOT operator requires a boolean operand",
                    unary.pos,
                )),
            },
        }
    }

    fn eval_binary(&self, binary: &BinaryExpr, ctx: &Map) -> Result<Value, Error> {
        // AND/OR short-circuit: the right operand is only evaluated when
        // the left does not decide the outcome.
        match binary.op {
            BinaryOp::And => {
                let left = self.eval_logical_operand(&binary.left, ctx, "AND", binary.pos)?;
                if !left {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval_logical_operand(&binary.right, ctx, "AND", binary.pos)?;
                return Ok(Value::Bool(right));
            }
            BinaryOp::Or => {
                let left = self.eval_logical_operand(&binary.left, ctx, "OR", binary.pos)?;
                if left {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval_logical_operand(&binary.right, ctx, "OR", binary.pos)?;
                return Ok(Value::Bool(right));
            }
            _ => {}
        }

        let left = self.evaluate(&binary.left, ctx)?;
        let right = self.evaluate(&binary.right, ctx)?;
        match binary.op {
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Multiply | BinaryOp::Divide => {
                eval_arithmetic(binary.op, &left, &right, binary.pos)
            }
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
                eval_comparison(binary.op, &left, &right, binary.pos)
            }
            BinaryOp::Equal => Ok(Value::Bool(left.loosely_equals(&right))),
            BinaryOp::NotEqual => Ok(Value::Bool(!left.loosely_equals(&right))),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled by the short-circuit path"),
        }
    }

    fn eval_logical_operand(
        &self,
        expr: &Expr,
        ctx: &Map,
        op: &str,
        pos: Position,
    ) -> Result<bool, Error> {
        self.evaluate(expr, ctx)?.as_bool().ok_or_else(|| {
            Error::semantic(format!("{} operator requires boolean operand", op), pos)
        })
    }

    fn eval_member_access(&self, access: &MemberAccessExpr, ctx: &Map) -> Result<Value, Error> {
        let mut value = self.evaluate(&access.target, ctx)?;
        for part in &access.parts {
            if value.is_null() && part.optional {
                return Ok(Value::Null);
            }
            value = match &part.kind {
                MemberKind::Key(key) => self.access_key(value, key, part)?,
                MemberKind::Index(index) => {
                    let index = self.evaluate(index, ctx)?;
                    match value {
                        Value::Object(fields) => {
                            let key = match index {
                                Value::Str(s) => s,
                                other => other.canonical(),
                            };
                            match fields.get(&key) {
                                Some(found) => found.clone(),
                                None if part.optional => return Ok(Value::Null),
                                None => {
                                    return Err(Error::reference(
                                        format!("field '{}' not found", key),
                                        part.pos,
                                    ));
                                }
                            }
                        }
                        Value::Array(items) => {
                            let idx = index.as_i64().ok_or_else(|| {
                                Error::type_error("array index must be numeric", part.pos)
                            })?;
                            if idx < 0 || idx as usize >= items.len() {
                                if part.optional {
                                    return Ok(Value::Null);
                                }
                                return Err(Error::array_out_of_bounds(
                                    "array index out of bounds",
                                    part.pos,
                                ));
                            }
                            items[idx as usize].clone()
                        }
                        _ => {
                            return Err(Error::type_error(
                                "target is not an object or array",
                                part.pos,
                            ));
                        }
                    }
                }
            };
        }
        Ok(value)
    }

    fn access_key(&self, value: Value, key: &str, part: &MemberPart) -> Result<Value, Error> {
        let fields = match value {
            Value::Object(fields) => fields,
            _ => return Err(Error::type_error("dot access on non-object", part.pos)),
        };
        match fields.get(key) {
            Some(found) => Ok(found.clone()),
            None if part.optional => Ok(Value::Null),
            None => Err(Error::reference(
                format!("field '{}' not found", key),
                part.pos,
            )),
        }
    }

    fn eval_call(&self, call: &CallExpr, ctx: &Map) -> Result<Value, Error> {
        if call.namespace.len() < 2 {
            return Err(Error::parameter("function call missing namespace", call.pos));
        }
        let library = self.env.library(&call.namespace[0]).ok_or_else(|| {
            Error::reference(
                format!("library '{}' not found", call.namespace[0]),
                call.pos,
            )
        })?;
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let value = self.evaluate(arg, ctx)?;
            args.push(Arg::new(value, arg.pos()));
        }
        library.call(&call.namespace[1], &args, call.pos, call.paren_pos)
    }
}

fn eval_arithmetic(op: BinaryOp, left: &Value, right: &Value, pos: Position) -> Result<Value, Error> {
    let (lf, rf) = match (left.as_f64(), right.as_f64()) {
        (Some(lf), Some(rf)) => (lf, rf),
        _ => {
            return Err(Error::semantic(
                format!("'{}' operator used on non-numeric type", op),
                pos,
            ));
        }
    };
    if op == BinaryOp::Divide && rf == 0.0 {
        return Err(Error::divide_by_zero("division by zero", pos));
    }
    if left.is_int() != right.is_int() {
        return Err(Error::semantic(
            "Mixed numeric types require explicit conversion",
            pos,
        ));
    }
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        // Integer arithmetic stays in i64: wrapping on overflow, division
        // truncating toward zero.
        let result = match op {
            BinaryOp::Plus => a.wrapping_add(*b),
            BinaryOp::Minus => a.wrapping_sub(*b),
            BinaryOp::Multiply => a.wrapping_mul(*b),
            BinaryOp::Divide => a.wrapping_div(*b),
            _ => return Err(Error::unknown_operator("unknown binary operator", pos)),
        };
        return Ok(Value::Int(result));
    }
    let result = match op {
        BinaryOp::Plus => lf + rf,
        BinaryOp::Minus => lf - rf,
        BinaryOp::Multiply => lf * rf,
        BinaryOp::Divide => lf / rf,
        _ => return Err(Error::unknown_operator("unknown binary operator", pos)),
    };
    Ok(Value::Float(result))
}

fn eval_comparison(op: BinaryOp, left: &Value, right: &Value, pos: Position) -> Result<Value, Error> {
    if let (Some(lf), Some(rf)) = (left.as_f64(), right.as_f64()) {
        let result = match op {
            BinaryOp::Less => lf < rf,
            BinaryOp::Greater => lf > rf,
            BinaryOp::LessEqual => lf <= rf,
            BinaryOp::GreaterEqual => lf >= rf,
            _ => return Err(Error::unknown_operator("unknown binary operator", pos)),
        };
        return Ok(Value::Bool(result));
    }
    if let (Value::Str(ls), Value::Str(rs)) = (left, right) {
        let result = match op {
            BinaryOp::Less => ls < rs,
            BinaryOp::Greater => ls > rs,
            BinaryOp::LessEqual => ls <= rs,
            BinaryOp::GreaterEqual => ls >= rs,
            _ => return Err(Error::unknown_operator("unknown binary operator", pos)),
        };
        return Ok(Value::Bool(result));
    }
    Err(Error::semantic(
        format!("'{}' operator not allowed on given types", op),
        pos,
    ))
}
