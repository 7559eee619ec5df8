//! Binary and unary operators.
//!
//! Both operands must share a primitive kind. Integer arithmetic wraps,
//! like Go's fixed-width integers.

use gvm_runtime::objects::{primitive, slice, string};
use gvm_runtime::{Addr, Heap, Tag, UNASSIGNED};

use super::{pop, push};
use crate::error::{Result, VmError};
use crate::instruction::{BinaryOp, UnaryOp};
use crate::process::VmState;

/// A computed primitive, boxed once the operator is done.
enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    fn boxed(self, heap: &mut Heap) -> gvm_runtime::Result<Addr> {
        match self {
            Value::Int(v) => primitive::new_int(heap, v),
            Value::Float(v) => primitive::new_float(heap, v),
            Value::Bool(v) => primitive::new_bool(heap, v),
        }
    }
}

fn invalid(op: &'static str, operands: Vec<Tag>) -> VmError {
    VmError::InvalidOperandTypes { op, operands }
}

pub fn exec_binary(state: &mut VmState, ctx: Addr, op: BinaryOp) -> Result<()> {
    let rhs = pop(state, ctx)?;
    let lhs = pop(state, ctx)?;
    let heap = &mut state.heap;
    let (lt, rt) = (heap.tag(lhs), heap.tag(rhs));
    let result = match (lt, rt) {
        (Tag::Int, Tag::Int) => {
            let (a, b) = (primitive::int_value(heap, lhs), primitive::int_value(heap, rhs));
            int_op(op, a, b)?.boxed(heap)?
        }
        (Tag::Float, Tag::Float) => {
            let (a, b) = (primitive::float_value(heap, lhs), primitive::float_value(heap, rhs));
            float_op(op, a, b)?.boxed(heap)?
        }
        (Tag::Bool, Tag::Bool) => {
            let (a, b) = (primitive::bool_value(heap, lhs), primitive::bool_value(heap, rhs));
            bool_op(op, a, b)?.boxed(heap)?
        }
        (Tag::String, Tag::String) => {
            if op == BinaryOp::Add {
                string::concat(heap, lhs, rhs)?
            } else {
                let (a, b) = (string::as_bytes(heap, lhs), string::as_bytes(heap, rhs));
                compare(op, a.cmp(&b))
                    .ok_or_else(|| invalid(op.symbol(), vec![lt, rt]))?
                    .boxed(heap)?
            }
        }
        _ => match reference_eq(heap, op, lhs, rhs) {
            Some(v) => v.boxed(heap)?,
            None => return Err(invalid(op.symbol(), vec![lt, rt])),
        },
    };
    push(state, ctx, result)
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Result<Value> {
    let v = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        BinaryOp::Rem => {
            if b == 0 {
                return Err(VmError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::AndNot => a & !b,
        BinaryOp::Shl => {
            if b < 0 {
                return Err(VmError::NegativeShift);
            }
            if b >= 64 {
                0
            } else {
                a.wrapping_shl(b as u32)
            }
        }
        BinaryOp::Shr => {
            if b < 0 {
                return Err(VmError::NegativeShift);
            }
            a >> b.min(63)
        }
        BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
            return Err(invalid(op.symbol(), vec![Tag::Int, Tag::Int]))
        }
        cmp => return compare(cmp, a.cmp(&b)).ok_or_else(|| invalid(op.symbol(), vec![Tag::Int; 2])),
    };
    Ok(Value::Int(v))
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<Value> {
    let v = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Eq => return Ok(Value::Bool(a == b)),
        BinaryOp::Ne => return Ok(Value::Bool(a != b)),
        BinaryOp::Lt => return Ok(Value::Bool(a < b)),
        BinaryOp::Le => return Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => return Ok(Value::Bool(a > b)),
        BinaryOp::Ge => return Ok(Value::Bool(a >= b)),
        _ => return Err(invalid(op.symbol(), vec![Tag::Float, Tag::Float])),
    };
    Ok(Value::Float(v))
}

fn bool_op(op: BinaryOp, a: bool, b: bool) -> Result<Value> {
    let v = match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::LogicalAnd => a && b,
        BinaryOp::LogicalOr => a || b,
        _ => return Err(invalid(op.symbol(), vec![Tag::Bool, Tag::Bool])),
    };
    Ok(Value::Bool(v))
}

fn compare(op: BinaryOp, ord: core::cmp::Ordering) -> Option<Value> {
    use core::cmp::Ordering::*;
    let v = match op {
        BinaryOp::Eq => ord == Equal,
        BinaryOp::Ne => ord != Equal,
        BinaryOp::Lt => ord == Less,
        BinaryOp::Le => ord != Greater,
        BinaryOp::Gt => ord == Greater,
        BinaryOp::Ge => ord != Less,
        _ => return None,
    };
    Some(Value::Bool(v))
}

/// `==`/`!=` on reference kinds: identity, with a nil slice equal to nil.
fn reference_eq(heap: &Heap, op: BinaryOp, lhs: Addr, rhs: Addr) -> Option<Value> {
    if !matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
        return None;
    }
    let (lt, rt) = (heap.tag(lhs), heap.tag(rhs));
    let same = match (lt, rt) {
        (Tag::Slice, Tag::Unassigned) => slice::array_ref(heap, lhs) == UNASSIGNED,
        (Tag::Unassigned, Tag::Slice) => slice::array_ref(heap, rhs) == UNASSIGNED,
        (Tag::Unassigned, _) | (_, Tag::Unassigned) => lhs == rhs,
        _ if lt == rt && !lt.is_primitive() => lhs == rhs,
        _ => return None,
    };
    Some(Value::Bool(if op == BinaryOp::Eq { same } else { !same }))
}

pub fn exec_unary(state: &mut VmState, ctx: Addr, op: UnaryOp) -> Result<()> {
    let a = pop(state, ctx)?;
    let heap = &mut state.heap;
    let tag = heap.tag(a);
    let result = match (op, tag) {
        (UnaryOp::Neg, Tag::Int) => primitive::new_int(heap, primitive::int_value(heap, a).wrapping_neg())?,
        (UnaryOp::Neg, Tag::Float) => primitive::new_float(heap, -primitive::float_value(heap, a))?,
        (UnaryOp::BitNot, Tag::Int) => primitive::new_int(heap, !primitive::int_value(heap, a))?,
        (UnaryOp::Not, Tag::Bool) => primitive::new_bool(heap, !primitive::bool_value(heap, a))?,
        _ => return Err(invalid(op.symbol(), vec![tag])),
    };
    push(state, ctx, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: Result<Value>) -> i64 {
        match v {
            Ok(Value::Int(i)) => i,
            _ => panic!("expected an int"),
        }
    }

    #[test]
    fn test_int_ops_wrap() {
        assert_eq!(int(int_op(BinaryOp::Add, i64::MAX, 1)), i64::MIN);
        assert_eq!(int(int_op(BinaryOp::Div, -7, 2)), -3);
        assert_eq!(int(int_op(BinaryOp::Rem, -7, 2)), -1);
        assert_eq!(int(int_op(BinaryOp::AndNot, 0b1110, 0b0100)), 0b1010);
        assert_eq!(int(int_op(BinaryOp::Shl, 1, 70)), 0);
        assert_eq!(int(int_op(BinaryOp::Shr, -8, 100)), -1);
    }

    #[test]
    fn test_int_errors() {
        assert!(matches!(int_op(BinaryOp::Div, 1, 0), Err(VmError::DivisionByZero)));
        assert!(matches!(int_op(BinaryOp::Shl, 1, -1), Err(VmError::NegativeShift)));
        assert!(matches!(
            int_op(BinaryOp::LogicalAnd, 1, 1),
            Err(VmError::InvalidOperandTypes { op: "&&", .. })
        ));
    }

    #[test]
    fn test_comparisons() {
        assert!(matches!(int_op(BinaryOp::Le, 3, 3), Ok(Value::Bool(true))));
        assert!(matches!(float_op(BinaryOp::Gt, 1.5, 2.0), Ok(Value::Bool(false))));
        assert!(matches!(bool_op(BinaryOp::Ne, true, false), Ok(Value::Bool(true))));
        assert!(float_op(BinaryOp::Rem, 1.0, 2.0).is_err());
    }
}
