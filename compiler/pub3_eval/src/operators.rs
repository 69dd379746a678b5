//! Binary and unary operators on runtime values.
//!
//! Integer arithmetic is carried out in `i128` and narrowed back: a result
//! that fits `u64` and came from two unsigned operands stays `UInt`,
//! anything else that fits `i64` becomes `Int`, and the rest is an overflow
//! error. Any `Double` operand makes the operation floating point.
//!
//! `&&` and `||` short-circuit and are handled by the evaluator.

use std::cmp::Ordering;

use pub3_ir::{BinaryOp, UnaryOp, Value};

use crate::errors::{
    binary_type_mismatch, division_by_zero, integer_overflow, modulo_by_zero,
    unary_type_mismatch, EvalErrorKind,
};

/// Operand classification for arithmetic.
enum Num {
    Int(i128, bool),
    Float(f64),
}

fn as_num(value: &Value) -> Option<Num> {
    match value {
        Value::Int(i) => Some(Num::Int(i128::from(*i), false)),
        Value::UInt(u) => Some(Num::Int(i128::from(*u), true)),
        Value::Double(d) => Some(Num::Float(*d)),
        _ => None,
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "mixed int/float arithmetic follows C double semantics"
)]
fn to_f64(n: &Num) -> f64 {
    match n {
        Num::Int(i, _) => *i as f64,
        Num::Float(d) => *d,
    }
}

fn narrow(op: BinaryOp, result: Option<i128>, unsigned: bool) -> Result<Value, EvalErrorKind> {
    let result = result.ok_or_else(|| integer_overflow(op))?;
    if unsigned {
        if let Ok(u) = u64::try_from(result) {
            return Ok(Value::UInt(u));
        }
    }
    i64::try_from(result)
        .map(Value::Int)
        .map_err(|_| integer_overflow(op))
}

/// Evaluate `left op right` for every operator except `&&`/`||`.
pub fn evaluate_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalErrorKind> {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::NotEq => return Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            let ord = compare(left, right)
                .ok_or_else(|| binary_type_mismatch(op, left.type_name(), right.type_name()))?;
            let holds = match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            return Ok(Value::Bool(holds));
        }
        BinaryOp::And => return Ok(Value::Bool(left.to_bool() && right.to_bool())),
        BinaryOp::Or => return Ok(Value::Bool(left.to_bool() || right.to_bool())),
        _ => {}
    }

    if op == BinaryOp::Add {
        match (left, right) {
            (Value::Str(_), _) | (_, Value::Str(_)) => {
                return Ok(Value::string(format!("{}{}", left.to_str(), right.to_str())));
            }
            (Value::List(a), Value::List(b)) => {
                let items = a.read().iter().chain(b.read().iter()).map(Value::freeze).collect();
                return Ok(Value::list(items));
            }
            _ => {}
        }
    }

    let mismatch = || binary_type_mismatch(op, left.type_name(), right.type_name());
    let (l, r) = match (as_num(left), as_num(right)) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(mismatch()),
    };

    match (l, r) {
        (Num::Int(a, ua), Num::Int(b, ub)) => {
            let unsigned = ua && ub;
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                BinaryOp::Mul => a.checked_mul(b),
                BinaryOp::Div => {
                    if b == 0 {
                        return Err(division_by_zero());
                    }
                    a.checked_div(b)
                }
                BinaryOp::Mod => {
                    if b == 0 {
                        return Err(modulo_by_zero());
                    }
                    a.checked_rem(b)
                }
                _ => return Err(mismatch()),
            };
            narrow(op, result, unsigned)
        }
        (l, r) => {
            let (a, b) = (to_f64(&l), to_f64(&r));
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == 0.0 {
                        return Err(division_by_zero());
                    }
                    a / b
                }
                BinaryOp::Mod => {
                    if b == 0.0 {
                        return Err(modulo_by_zero());
                    }
                    a % b
                }
                _ => return Err(mismatch()),
            };
            Ok(Value::Double(result))
        }
    }
}

/// Equality as templates see it: numbers compare by value across
/// representations, everything else structurally.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (as_num(left), as_num(right)) {
        (Some(Num::Int(a, _)), Some(Num::Int(b, _))) => a == b,
        (Some(l), Some(r)) => to_f64(&l) == to_f64(&r),
        _ => left == right,
    }
}

/// Ordering for numbers and strings; `None` for anything else.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => match (as_num(left)?, as_num(right)?) {
            (Num::Int(a, _), Num::Int(b, _)) => Some(a.cmp(&b)),
            (l, r) => to_f64(&l).partial_cmp(&to_f64(&r)),
        },
    }
}

pub fn evaluate_unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalErrorKind> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.to_bool())),
        UnaryOp::Neg => match operand {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| unary_type_mismatch(op, "int at its minimum")),
            Value::UInt(u) => i64::try_from(-i128::from(*u))
                .map(Value::Int)
                .map_err(|_| unary_type_mismatch(op, "uint out of range")),
            Value::Double(d) => Ok(Value::Double(-d)),
            other => Err(unary_type_mismatch(op, other.type_name())),
        },
    }
}
