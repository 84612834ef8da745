//! Concrete evaluation with C arithmetic
//!
//! Integer division truncates toward zero, `%` takes the sign of the
//! dividend, relational and logical operators yield 0/1 as booleans, and
//! mixing an integer with a real promotes to real.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::ExprError;
use crate::shared::models::ScalarValue;
use std::collections::HashMap;

/// Source of variable values (and macro definedness) during evaluation
pub trait ValueEnv {
    fn value(&self, name: &str) -> Option<ScalarValue>;

    fn is_defined(&self, _name: &str) -> bool {
        false
    }
}

impl ValueEnv for HashMap<String, ScalarValue> {
    fn value(&self, name: &str) -> Option<ScalarValue> {
        self.get(name).copied()
    }
}

impl ValueEnv for std::collections::BTreeMap<String, ScalarValue> {
    fn value(&self, name: &str) -> Option<ScalarValue> {
        self.get(name).copied()
    }
}

pub fn eval(expr: &Expr, env: &dyn ValueEnv) -> Result<ScalarValue, ExprError> {
    match expr {
        Expr::Int(v) => Ok(ScalarValue::Int(*v)),
        Expr::Real(v) => Ok(ScalarValue::Real(*v)),
        Expr::Bool(b) => Ok(ScalarValue::Bool(*b)),
        Expr::Var(name) => env
            .value(name)
            .ok_or_else(|| ExprError::UnboundVariable(name.clone())),
        Expr::Defined(name) => Ok(ScalarValue::Bool(env.is_defined(name))),
        Expr::Unary(op, e) => {
            let v = eval(e, env)?;
            apply_unary(*op, v)
        }
        Expr::Binary(BinaryOp::And, a, b) => {
            if !eval(a, env)?.truthy() {
                return Ok(ScalarValue::Bool(false));
            }
            Ok(ScalarValue::Bool(eval(b, env)?.truthy()))
        }
        Expr::Binary(BinaryOp::Or, a, b) => {
            if eval(a, env)?.truthy() {
                return Ok(ScalarValue::Bool(true));
            }
            Ok(ScalarValue::Bool(eval(b, env)?.truthy()))
        }
        Expr::Binary(op, a, b) => {
            let lhs = eval(a, env)?;
            let rhs = eval(b, env)?;
            apply_binary(*op, lhs, rhs)
        }
        Expr::Ternary(c, a, b) => {
            if eval(c, env)?.truthy() {
                eval(a, env)
            } else {
                eval(b, env)
            }
        }
        Expr::Cast(ty, e) => {
            let v = eval(e, env)?;
            Ok(cast_value(ty, v))
        }
        Expr::Call(name, _) => Err(ExprError::Unsupported(format!("call to {name}"))),
        Expr::Index(..) => Err(ExprError::Unsupported("symbolic array index".into())),
    }
}

fn cast_value(ty: &str, v: ScalarValue) -> ScalarValue {
    let is_float = ty.contains("float") || ty.contains("double");
    let is_bool = ty == "_Bool" || ty == "bool";
    match v {
        _ if is_bool => ScalarValue::Bool(v.truthy()),
        ScalarValue::Real(r) if !is_float => ScalarValue::Int(r.trunc() as i128),
        ScalarValue::Int(i) if is_float => ScalarValue::Real(i as f64),
        ScalarValue::Bool(b) if is_float => ScalarValue::Real(if b { 1.0 } else { 0.0 }),
        ScalarValue::Bool(b) => ScalarValue::Int(b as i128),
        other => other,
    }
}

pub fn apply_unary(op: UnaryOp, v: ScalarValue) -> Result<ScalarValue, ExprError> {
    Ok(match (op, v) {
        (UnaryOp::Not, v) => ScalarValue::Bool(!v.truthy()),
        (UnaryOp::Plus, v) => v,
        (UnaryOp::Neg, ScalarValue::Real(r)) => ScalarValue::Real(-r),
        (UnaryOp::Neg, v) => ScalarValue::Int(-int_of(v)?),
        (UnaryOp::BitNot, v) => ScalarValue::Int(!int_of(v)?),
        (UnaryOp::AddrOf, _) | (UnaryOp::Deref, _) => {
            return Err(ExprError::Unsupported("pointer operation".into()))
        }
    })
}

fn int_of(v: ScalarValue) -> Result<i128, ExprError> {
    v.as_int()
        .ok_or_else(|| ExprError::Unsupported("integer operation on real".into()))
}

pub fn apply_binary(op: BinaryOp, a: ScalarValue, b: ScalarValue) -> Result<ScalarValue, ExprError> {
    use std::cmp::Ordering;

    if op.is_comparison() {
        let ord = a.compare(&b);
        let result = match op {
            BinaryOp::Eq => ord == Some(Ordering::Equal),
            BinaryOp::Ne => ord != Some(Ordering::Equal),
            BinaryOp::Lt => ord == Some(Ordering::Less),
            BinaryOp::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
            BinaryOp::Gt => ord == Some(Ordering::Greater),
            BinaryOp::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
            _ => unreachable!("comparison operators only"),
        };
        return Ok(ScalarValue::Bool(result));
    }

    if op.is_logical() {
        let result = match op {
            BinaryOp::And => a.truthy() && b.truthy(),
            _ => a.truthy() || b.truthy(),
        };
        return Ok(ScalarValue::Bool(result));
    }

    let real = matches!(a, ScalarValue::Real(_)) || matches!(b, ScalarValue::Real(_));
    if real {
        let (x, y) = (a.as_f64(), b.as_f64());
        return match op {
            BinaryOp::Add => Ok(ScalarValue::Real(x + y)),
            BinaryOp::Sub => Ok(ScalarValue::Real(x - y)),
            BinaryOp::Mul => Ok(ScalarValue::Real(x * y)),
            BinaryOp::Div if y == 0.0 => Err(ExprError::DivisionByZero),
            BinaryOp::Div => Ok(ScalarValue::Real(x / y)),
            _ => Err(ExprError::Unsupported(format!("'{}' on real operands", op.symbol()))),
        };
    }

    let (x, y) = (int_of(a)?, int_of(b)?);
    let overflow = || ExprError::Overflow(op.symbol());
    let value = match op {
        BinaryOp::Add => x.checked_add(y).ok_or_else(overflow)?,
        BinaryOp::Sub => x.checked_sub(y).ok_or_else(overflow)?,
        BinaryOp::Mul => x.checked_mul(y).ok_or_else(overflow)?,
        BinaryOp::Div => {
            if y == 0 {
                return Err(ExprError::DivisionByZero);
            }
            // i128 division already truncates toward zero
            x / y
        }
        BinaryOp::Rem => {
            if y == 0 {
                return Err(ExprError::DivisionByZero);
            }
            x % y
        }
        BinaryOp::BitAnd => x & y,
        BinaryOp::BitOr => x | y,
        BinaryOp::BitXor => x ^ y,
        BinaryOp::Shl => {
            let shift = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_shl(shift).ok_or_else(overflow)?
        }
        BinaryOp::Shr => {
            let shift = u32::try_from(y).map_err(|_| overflow())?;
            x.checked_shr(shift).ok_or_else(overflow)?
        }
        _ => return Err(ExprError::Unsupported(op.symbol().to_string())),
    };
    Ok(ScalarValue::Int(value))
}
