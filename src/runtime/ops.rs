//! Operator semantics for binary, unary and comparison expressions.
//!
//! Integer arithmetic is checked; an overflow raises `OverflowError` instead
//! of wrapping. `bool` operands take part in arithmetic as `0`/`1`.

use std::cmp::Ordering;
use std::iter;

use crate::ast::{BinaryOperator, CompareOperator, UnaryOperator};
use crate::runtime::error::{ErrorKind, RuntimeError};
use crate::runtime::sequence;
use crate::runtime::value::{Number, Value};

pub fn binary_op(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    if let (Some(left), Some(right)) = (left.as_number(), right.as_number()) {
        return numeric_op(op, left, right);
    }

    match (op, left, right) {
        (BinaryOperator::Add, Value::Str(left), Value::Str(right)) => {
            Ok(Value::str(&format!("{left}{right}")))
        }
        (BinaryOperator::Add, Value::List(left), Value::List(right)) => {
            let mut items = left.borrow().clone();
            items.extend(right.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOperator::Add, Value::Tuple(left), Value::Tuple(right)) => {
            Ok(Value::tuple(left.iter().chain(right.iter()).cloned().collect()))
        }
        (BinaryOperator::Mul, sequence, count) | (BinaryOperator::Mul, count, sequence)
            if count.as_int().is_some() && is_repeatable(sequence) =>
        {
            repeat(sequence, count.as_int().unwrap_or_default())
        }
        _ => Err(unsupported(op.symbol(), left, right)),
    }
}

fn is_repeatable(value: &Value) -> bool {
    matches!(value, Value::Str(_) | Value::List(_) | Value::Tuple(_))
}

/// Largest number of elements (bytes for `str`) a repetition may produce.
const REPEAT_LIMIT: usize = 1 << 24;

fn repeat(sequence: &Value, count: i64) -> Result<Value, RuntimeError> {
    let count = usize::try_from(count).unwrap_or(0);
    let checked = |len: usize| match len.checked_mul(count) {
        Some(total) if total <= REPEAT_LIMIT => Ok(()),
        _ => Err(RuntimeError::Overflow { operation: "*" }),
    };
    match sequence {
        Value::Str(text) => {
            checked(text.len())?;
            Ok(Value::str(&text.repeat(count)))
        }
        Value::List(items) => {
            let items = items.borrow();
            checked(items.len())?;
            Ok(Value::list(repeated(&items, count)))
        }
        Value::Tuple(items) => {
            checked(items.len())?;
            Ok(Value::tuple(repeated(items, count)))
        }
        _ => Ok(sequence.clone()),
    }
}

fn repeated(items: &[Value], count: usize) -> Vec<Value> {
    iter::repeat_n(items, count).flatten().cloned().collect()
}

fn numeric_op(op: BinaryOperator, left: Number, right: Number) -> Result<Value, RuntimeError> {
    let symbol = op.symbol();
    let overflow = || RuntimeError::Overflow { operation: symbol };
    match (left, right) {
        (Number::Int(left), Number::Int(right)) => match op {
            BinaryOperator::Add => left.checked_add(right).map(Value::Int).ok_or_else(overflow),
            BinaryOperator::Sub => left.checked_sub(right).map(Value::Int).ok_or_else(overflow),
            BinaryOperator::Mul => left.checked_mul(right).map(Value::Int).ok_or_else(overflow),
            BinaryOperator::Div => {
                if right == 0 {
                    return Err(RuntimeError::DivisionByZero {
                        operation: "division",
                    });
                }
                Ok(Value::Float(left as f64 / right as f64))
            }
            BinaryOperator::FloorDiv => int_floor_div(left, right).map(Value::Int),
            BinaryOperator::Mod => int_mod(left, right).map(Value::Int),
            BinaryOperator::Pow => int_pow(left, right),
        },
        (left, right) => float_op(op, left.to_f64(), right.to_f64()),
    }
}

fn int_floor_div(left: i64, right: i64) -> Result<i64, RuntimeError> {
    if right == 0 {
        return Err(RuntimeError::DivisionByZero {
            operation: "integer division or modulo",
        });
    }
    let quotient = left
        .checked_div(right)
        .ok_or(RuntimeError::Overflow { operation: "//" })?;
    if left % right != 0 && ((left < 0) != (right < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn int_mod(left: i64, right: i64) -> Result<i64, RuntimeError> {
    if right == 0 {
        return Err(RuntimeError::DivisionByZero {
            operation: "integer division or modulo",
        });
    }
    let remainder = left.checked_rem(right).unwrap_or(0);
    if remainder != 0 && ((remainder < 0) != (right < 0)) {
        Ok(remainder + right)
    } else {
        Ok(remainder)
    }
}

fn int_pow(base: i64, exponent: i64) -> Result<Value, RuntimeError> {
    if exponent < 0 {
        if base == 0 {
            return Err(negative_power_of_zero());
        }
        return Ok(Value::Float((base as f64).powf(exponent as f64)));
    }
    let result = match base {
        0 | 1 => Some(if exponent == 0 { 1 } else { base }),
        -1 => Some(if exponent % 2 == 0 { 1 } else { -1 }),
        _ => u32::try_from(exponent)
            .ok()
            .and_then(|exponent| base.checked_pow(exponent)),
    };
    result
        .map(Value::Int)
        .ok_or(RuntimeError::Overflow { operation: "**" })
}

fn negative_power_of_zero() -> RuntimeError {
    RuntimeError::Native {
        kind: ErrorKind::ZeroDivisionError,
        message: "0.0 cannot be raised to a negative power".to_string(),
    }
}

fn float_op(op: BinaryOperator, left: f64, right: f64) -> Result<Value, RuntimeError> {
    let result = match op {
        BinaryOperator::Add => left + right,
        BinaryOperator::Sub => left - right,
        BinaryOperator::Mul => left * right,
        BinaryOperator::Div => {
            if right == 0.0 {
                return Err(RuntimeError::DivisionByZero {
                    operation: "float division",
                });
            }
            left / right
        }
        BinaryOperator::FloorDiv => {
            if right == 0.0 {
                return Err(RuntimeError::DivisionByZero {
                    operation: "float floor division",
                });
            }
            (left / right).floor()
        }
        BinaryOperator::Mod => {
            if right == 0.0 {
                return Err(RuntimeError::DivisionByZero {
                    operation: "float modulo",
                });
            }
            let remainder = left % right;
            if remainder != 0.0 && ((remainder < 0.0) != (right < 0.0)) {
                remainder + right
            } else {
                remainder
            }
        }
        BinaryOperator::Pow => {
            if left == 0.0 && right < 0.0 {
                return Err(negative_power_of_zero());
            }
            left.powf(right)
        }
    };
    if result.is_infinite() && left.is_finite() && right.is_finite() {
        return Err(RuntimeError::Overflow {
            operation: op.symbol(),
        });
    }
    Ok(Value::Float(result))
}

pub fn unary_op(op: UnaryOperator, operand: &Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOperator::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOperator::Negate => match operand.as_number() {
            Some(Number::Int(value)) => value
                .checked_neg()
                .map(Value::Int)
                .ok_or(RuntimeError::Overflow { operation: "-" }),
            Some(Number::Float(value)) => Ok(Value::Float(-value)),
            None => Err(RuntimeError::BadUnaryOperand {
                operation: "-",
                type_name: operand.type_name(),
            }),
        },
        UnaryOperator::Plus => match operand.as_number() {
            Some(Number::Int(value)) => Ok(Value::Int(value)),
            Some(Number::Float(value)) => Ok(Value::Float(value)),
            None => Err(RuntimeError::BadUnaryOperand {
                operation: "+",
                type_name: operand.type_name(),
            }),
        },
    }
}

/// Evaluates one link of a (possibly chained) comparison.
pub fn compare(op: CompareOperator, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    match op {
        CompareOperator::Eq => Ok(left.equals(right)),
        CompareOperator::NotEq => Ok(!left.equals(right)),
        CompareOperator::In => contains(right, left),
        CompareOperator::NotIn => contains(right, left).map(|found| !found),
        CompareOperator::Lt => Ok(order(op, left, right)? == Some(Ordering::Less)),
        CompareOperator::LtE => Ok(matches!(
            order(op, left, right)?,
            Some(Ordering::Less | Ordering::Equal)
        )),
        CompareOperator::Gt => Ok(order(op, left, right)? == Some(Ordering::Greater)),
        CompareOperator::GtE => Ok(matches!(
            order(op, left, right)?,
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

/// Ordering used by `<`, `>`, `min`, `max`. `None` means unordered (NaN).
pub fn order(
    op: CompareOperator,
    left: &Value,
    right: &Value,
) -> Result<Option<Ordering>, RuntimeError> {
    if let (Some(left), Some(right)) = (left.as_number(), right.as_number()) {
        return Ok(match (left, right) {
            (Number::Int(left), Number::Int(right)) => Some(left.cmp(&right)),
            (left, right) => left.to_f64().partial_cmp(&right.to_f64()),
        });
    }
    match (left, right) {
        (Value::Str(left), Value::Str(right)) => Ok(Some(left.cmp(right))),
        (Value::List(left), Value::List(right)) => {
            let (left, right) = (left.borrow().clone(), right.borrow().clone());
            order_sequences(op, &left, &right)
        }
        (Value::Tuple(left), Value::Tuple(right)) => order_sequences(op, left, right),
        _ => Err(RuntimeError::Unorderable {
            operation: op.symbol(),
            left: left.type_name(),
            right: right.type_name(),
        }),
    }
}

fn order_sequences(
    op: CompareOperator,
    left: &[Value],
    right: &[Value],
) -> Result<Option<Ordering>, RuntimeError> {
    for (left, right) in left.iter().zip(right) {
        if !left.equals(right) {
            return order(op, left, right);
        }
    }
    Ok(Some(left.len().cmp(&right.len())))
}

/// `item in container`.
pub fn contains(container: &Value, item: &Value) -> Result<bool, RuntimeError> {
    match container {
        Value::Str(text) => match item {
            Value::Str(needle) => Ok(text.contains(needle.as_ref())),
            other => Err(RuntimeError::invalid_argument(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) => Ok(items.borrow().iter().any(|value| value.equals(item))),
        Value::Tuple(items) => Ok(items.iter().any(|value| value.equals(item))),
        Value::Dict(dict) | Value::Set(dict) => dict.borrow().contains(item),
        Value::Range(range) => Ok(match item.as_number() {
            Some(Number::Int(value)) => range.contains(value),
            Some(Number::Float(value)) => {
                value.fract() == 0.0 && range.contains(value as i64)
            }
            None => false,
        }),
        other => Err(RuntimeError::invalid_argument(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// `+` as used by `sum` and augmented assignment on containers.
pub fn add(left: &Value, right: &Value) -> Result<Value, RuntimeError> {
    binary_op(BinaryOperator::Add, left, right)
}

fn unsupported(operation: &'static str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::UnsupportedOperands {
        operation,
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// In-place `+=` on a list extends it, so every alias observes the change.
pub fn augmented_op(
    op: BinaryOperator,
    current: &Value,
    operand: &Value,
) -> Result<Value, RuntimeError> {
    if let (BinaryOperator::Add, Value::List(items)) = (op, current) {
        let extra = sequence::collect(operand)?;
        items.borrow_mut().extend(extra);
        return Ok(current.clone());
    }
    binary_op(op, current, operand)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: i64) -> Value {
        Value::Int(value)
    }

    #[test]
    fn division_semantics() {
        assert_eq!(
            binary_op(BinaryOperator::Div, &int(7), &int(2)).expect("div"),
            Value::Float(3.5)
        );
        assert_eq!(
            binary_op(BinaryOperator::FloorDiv, &int(-7), &int(2)).expect("floordiv"),
            int(-4)
        );
        assert_eq!(
            binary_op(BinaryOperator::Mod, &int(-7), &int(3)).expect("mod"),
            int(2)
        );
        assert_eq!(
            binary_op(BinaryOperator::Mod, &int(7), &int(-3)).expect("mod"),
            int(-2)
        );
        let error = binary_op(BinaryOperator::Div, &int(1), &int(0)).expect_err("zero");
        assert_eq!(error.to_string(), "division by zero");
    }

    #[test]
    fn power_stays_integral_for_non_negative_exponents() {
        assert_eq!(
            binary_op(BinaryOperator::Pow, &int(2), &int(10)).expect("pow"),
            int(1024)
        );
        assert_eq!(
            binary_op(BinaryOperator::Pow, &int(2), &int(-1)).expect("pow"),
            Value::Float(0.5)
        );
        let error = binary_op(BinaryOperator::Pow, &int(10), &int(40)).expect_err("overflow");
        assert_eq!(error.kind(), ErrorKind::OverflowError);
    }

    #[test]
    fn bool_participates_as_integer() {
        assert_eq!(
            binary_op(BinaryOperator::Add, &Value::Bool(true), &int(2)).expect("add"),
            int(3)
        );
    }

    #[test]
    fn sequences_concatenate_and_repeat() {
        assert_eq!(
            binary_op(BinaryOperator::Add, &Value::str("ab"), &Value::str("cd")).expect("concat"),
            Value::str("abcd")
        );
        assert_eq!(
            binary_op(BinaryOperator::Mul, &int(2), &Value::list(vec![int(1)])).expect("repeat"),
            Value::list(vec![int(1), int(1)])
        );
        let error =
            binary_op(BinaryOperator::Sub, &Value::str("a"), &int(1)).expect_err("unsupported");
        assert_eq!(
            error.to_string(),
            "unsupported operand type(s) for -: 'str' and 'int'"
        );
    }

    #[test]
    fn repetition_is_bounded_before_allocating() {
        let tuple = Value::tuple(vec![int(1), Value::str("a")]);
        assert_eq!(
            binary_op(BinaryOperator::Mul, &tuple, &int(2)).expect("repeat").repr(),
            "(1, 'a', 1, 'a')"
        );
        assert_eq!(
            binary_op(BinaryOperator::Mul, &Value::list(vec![int(0)]), &int(-3))
                .expect("negative count")
                .repr(),
            "[]"
        );

        let huge = int(1_000_000_000_000_000_000);
        let error = binary_op(BinaryOperator::Mul, &Value::list(vec![int(0)]), &huge)
            .expect_err("too large");
        assert_eq!(error.kind(), ErrorKind::OverflowError);
        let error =
            binary_op(BinaryOperator::Mul, &Value::str("ab"), &huge).expect_err("too large");
        assert_eq!(error.kind(), ErrorKind::OverflowError);
    }

    #[test]
    fn ordering_rules() {
        assert!(compare(CompareOperator::Lt, &int(1), &Value::Float(1.5)).expect("lt"));
        assert!(compare(CompareOperator::Lt, &Value::str("abc"), &Value::str("abd")).expect("lt"));
        assert!(
            compare(
                CompareOperator::GtE,
                &Value::tuple(vec![int(1), int(2)]),
                &Value::tuple(vec![int(1)])
            )
            .expect("ge")
        );
        let error = compare(CompareOperator::Lt, &int(1), &Value::str("a")).expect_err("mixed");
        assert_eq!(
            error.to_string(),
            "'<' not supported between instances of 'int' and 'str'"
        );
    }

    #[test]
    fn membership() {
        let list = Value::list(vec![int(1), Value::str("x")]);
        assert!(compare(CompareOperator::In, &Value::str("x"), &list).expect("in"));
        assert!(compare(CompareOperator::NotIn, &int(2), &list).expect("not in"));
        assert!(compare(CompareOperator::In, &Value::str("ell"), &Value::str("hello")).expect("in"));
    }

    #[test]
    fn plus_equals_extends_list_in_place() {
        let list = Value::list(vec![int(1)]);
        let alias = list.clone();
        augmented_op(BinaryOperator::Add, &list, &Value::tuple(vec![int(2)])).expect("extend");
        assert_eq!(alias.repr(), "[1, 2]");
    }
}
