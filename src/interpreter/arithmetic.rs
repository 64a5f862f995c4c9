//! Expression Evaluation
//!
//! Pure operators over runtime values:
//! - arithmetic (+, -, *, /, \, %), ints staying ints except for `/`
//! - numeric comparisons
//! - logical operators on booleans
//! - structural equality

use crate::ast::types::{ArithOp, CompareOp, EqualityOp, LogicalOp, Value};
use crate::interpreter::errors::OcliError;
use crate::interpreter::types::{to_bool, to_float, to_num};

fn divide_by_zero() -> OcliError {
    OcliError::runtime("cannot divide by 0")
}

fn int_arith(op: ArithOp, left: i64, right: i64) -> Result<Value, OcliError> {
    match op {
        ArithOp::Add => Ok(Value::Int(left.wrapping_add(right))),
        ArithOp::Sub => Ok(Value::Int(left.wrapping_sub(right))),
        ArithOp::Mul => Ok(Value::Int(left.wrapping_mul(right))),
        ArithOp::Div => {
            if right == 0 {
                return Err(divide_by_zero());
            }
            Ok(Value::Float(left as f64 / right as f64))
        }
        ArithOp::IntDiv => {
            if right == 0 {
                return Err(divide_by_zero());
            }
            Ok(Value::Int(left.wrapping_div(right)))
        }
        ArithOp::Mod => {
            if right == 0 {
                return Err(divide_by_zero());
            }
            Ok(Value::Int(left.wrapping_rem(right)))
        }
    }
}

fn float_arith(op: ArithOp, left: f64, right: f64) -> Result<Value, OcliError> {
    match op {
        ArithOp::Add => Ok(Value::Float(left + right)),
        ArithOp::Sub => Ok(Value::Float(left - right)),
        ArithOp::Mul => Ok(Value::Float(left * right)),
        ArithOp::Div => {
            if right == 0.0 {
                return Err(divide_by_zero());
            }
            Ok(Value::Float(left / right))
        }
        ArithOp::IntDiv | ArithOp::Mod => {
            Err(OcliError::runtime("invalid operator for float operands"))
        }
    }
}

/// Apply an arithmetic operator, numeric strings being accepted.
pub fn apply_arith(op: ArithOp, left: &Value, right: &Value) -> Result<Value, OcliError> {
    let left = to_num(left, "left operand")?;
    let right = to_num(right, "right operand")?;
    match (&left, &right) {
        (Value::Int(l), Value::Int(r)) => int_arith(op, *l, *r),
        _ => float_arith(
            op,
            to_float(&left, "left operand")?,
            to_float(&right, "right operand")?,
        ),
    }
}

pub fn negate(value: &Value) -> Result<Value, OcliError> {
    match to_num(value, "expression")? {
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Float(f) => Ok(Value::Float(-f)),
        _ => Err(OcliError::runtime("cannot negate non numeric value")),
    }
}

pub fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<Value, OcliError> {
    let l = to_float(left, "left expression")?;
    let r = to_float(right, "right expression")?;
    Ok(Value::Bool(match op {
        CompareOp::Lss => l < r,
        CompareOp::Leq => l <= r,
        CompareOp::Gtr => l > r,
        CompareOp::Geq => l >= r,
    }))
}

/// Both operands are evaluated, there is no short-circuit.
pub fn logical(op: LogicalOp, left: &Value, right: &Value) -> Result<Value, OcliError> {
    let l = to_bool(left, "left operand")?;
    let r = to_bool(right, "right operand")?;
    Ok(Value::Bool(match op {
        LogicalOp::Or => l || r,
        LogicalOp::And => l && r,
    }))
}

pub fn equality(op: EqualityOp, left: &Value, right: &Value) -> Value {
    match op {
        EqualityOp::Eq => Value::Bool(left == right),
        EqualityOp::Neq => Value::Bool(left != right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_arith_stays_int() {
        assert_eq!(apply_arith(ArithOp::Add, &Value::Int(2), &Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(apply_arith(ArithOp::Mod, &Value::Int(7), &Value::Int(4)).unwrap(), Value::Int(3));
        assert_eq!(apply_arith(ArithOp::IntDiv, &Value::Int(10), &Value::Int(4)).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_int_division_gives_float() {
        assert_eq!(apply_arith(ArithOp::Div, &Value::Int(10), &Value::Int(4)).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_divide_by_zero() {
        let err = apply_arith(ArithOp::IntDiv, &Value::Int(10), &Value::Int(0)).unwrap_err();
        assert_eq!(err.to_string(), "cannot divide by 0");
        let err = apply_arith(ArithOp::Div, &Value::Float(1.0), &Value::Float(0.0)).unwrap_err();
        assert_eq!(err.to_string(), "cannot divide by 0");
    }

    #[test]
    fn test_mixed_operands_promote() {
        assert_eq!(
            apply_arith(ArithOp::Mul, &Value::Int(2), &Value::Float(1.5)).unwrap(),
            Value::Float(3.0)
        );
        assert_eq!(
            apply_arith(ArithOp::Add, &Value::from("4"), &Value::Int(1)).unwrap(),
            Value::Int(5)
        );
        let err = apply_arith(ArithOp::Mod, &Value::Float(2.0), &Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "invalid operator for float operands");
    }

    #[test]
    fn test_non_numeric_operand() {
        let err = apply_arith(ArithOp::Add, &Value::from("plouf"), &Value::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "left operand should be a number");
    }

    #[test]
    fn test_negate() {
        assert_eq!(negate(&Value::Int(3)).unwrap(), Value::Int(-3));
        assert_eq!(negate(&Value::Float(1.5)).unwrap(), Value::Float(-1.5));
        assert!(negate(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_compare_and_logical() {
        assert_eq!(compare(CompareOp::Lss, &Value::Int(1), &Value::Float(1.5)).unwrap(), Value::Bool(true));
        assert_eq!(compare(CompareOp::Geq, &Value::Int(1), &Value::Int(2)).unwrap(), Value::Bool(false));
        assert_eq!(
            logical(LogicalOp::Or, &Value::Bool(false), &Value::Bool(true)).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            logical(LogicalOp::And, &Value::Int(1), &Value::Bool(true)).unwrap_err().to_string(),
            "left operand should be a boolean"
        );
    }

    #[test]
    fn test_equality_is_typed() {
        assert_eq!(equality(EqualityOp::Eq, &Value::from("a"), &Value::from("a")), Value::Bool(true));
        assert_eq!(equality(EqualityOp::Neq, &Value::Int(1), &Value::Float(1.0)), Value::Bool(true));
    }
}
