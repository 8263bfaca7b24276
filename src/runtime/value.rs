//! Runtime values of the interpreted language.
//!
//! Scalars are stored inline. Lists, dicts, sets and instances are shared by
//! reference (`Rc`), so mutation through one alias is visible through every
//! other alias, matching the reference semantics of the source language.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::FxHasher;

use crate::builtins::BuiltinFunction;
use crate::runtime::class::{ClassValue, InstanceValue};
use crate::runtime::dict::DictObject;
use crate::runtime::error::RuntimeError;
use crate::runtime::function::{BoundMethod, FunctionValue, NativeFunction};

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Tuple(Rc<[Value]>),
    Dict(Rc<RefCell<DictObject>>),
    /// Insertion-ordered set; members are the keys of the inner dict.
    Set(Rc<RefCell<DictObject>>),
    Range(RangeValue),
    Function(Rc<FunctionValue>),
    Builtin(BuiltinFunction),
    Native(Rc<NativeFunction>),
    BoundMethod(Rc<BoundMethod>),
    Class(Rc<ClassValue>),
    Instance(Rc<InstanceValue>),
    Slice(SliceValue),
}

/// Lazily evaluated arithmetic progression produced by `range()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        let (start, stop, step) = self.wide();
        let span = if step > 0 { stop - start } else { start - stop };
        if span <= 0 {
            return 0;
        }
        let count = (span - 1) / step.abs() + 1;
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        if index >= self.len() {
            return None;
        }
        let (start, _, step) = self.wide();
        i64::try_from(start + step * index as i128).ok()
    }

    pub fn contains(&self, value: i64) -> bool {
        let (start, stop, step) = self.wide();
        let value = i128::from(value);
        let in_bounds = if step > 0 {
            start <= value && value < stop
        } else {
            stop < value && value <= start
        };
        in_bounds && (value - start) % step == 0
    }

    /// Bounds widened so arithmetic at the `i64` extremes cannot overflow.
    fn wide(&self) -> (i128, i128, i128) {
        (
            i128::from(self.start),
            i128::from(self.stop),
            i128::from(self.step),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceValue {
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub step: Option<i64>,
}

impl Value {
    pub fn str(value: &str) -> Self {
        Value::Str(Rc::from(value))
    }

    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(values)))
    }

    pub fn tuple(values: Vec<Value>) -> Self {
        Value::Tuple(Rc::from(values))
    }

    pub fn dict(dict: DictObject) -> Self {
        Value::Dict(Rc::new(RefCell::new(dict)))
    }

    pub fn set(members: DictObject) -> Self {
        Value::Set(Rc::new(RefCell::new(members)))
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Instance(instance) => instance.class.name.clone(),
            other => other.builtin_type_name().to_string(),
        }
    }

    fn builtin_type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            Value::Range(_) => "range",
            Value::Function(_) => "function",
            Value::Builtin(_) | Value::Native(_) => "builtin_function_or_method",
            Value::BoundMethod(_) => "method",
            Value::Class(_) => "type",
            Value::Instance(_) => "object",
            Value::Slice(_) => "slice",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(value) => *value,
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Str(value) => !value.is_empty(),
            Value::List(values) => !values.borrow().is_empty(),
            Value::Tuple(values) => !values.is_empty(),
            Value::Dict(dict) | Value::Set(dict) => !dict.borrow().is_empty(),
            Value::Range(range) => !range.is_empty(),
            _ => true,
        }
    }

    /// Integer view of `int` and `bool` values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            Value::Bool(value) => Some(i64::from(*value)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Text produced by `str()` and `print`.
    pub fn to_output(&self) -> String {
        match self {
            Value::Str(value) => value.to_string(),
            other => other.repr(),
        }
    }

    /// Text produced by `repr()`; container elements always use this form.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, &mut Vec::new());
        out
    }

    fn write_repr(&self, out: &mut String, active: &mut Vec<usize>) {
        match self {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(value) => out.push_str(&value.to_string()),
            Value::Float(value) => out.push_str(&format_float(*value)),
            Value::Str(value) => out.push_str(&quote_str(value)),
            Value::List(values) => {
                let id = Rc::as_ptr(values) as *const () as usize;
                if active.contains(&id) {
                    out.push_str("[...]");
                    return;
                }
                active.push(id);
                out.push('[');
                write_items(out, values.borrow().iter(), active);
                out.push(']');
                active.pop();
            }
            Value::Tuple(values) => {
                out.push('(');
                write_items(out, values.iter(), active);
                if values.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Value::Dict(dict) => {
                let id = Rc::as_ptr(dict) as *const () as usize;
                if active.contains(&id) {
                    out.push_str("{...}");
                    return;
                }
                active.push(id);
                out.push('{');
                for (index, (key, value)) in dict.borrow().iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    key.write_repr(out, active);
                    out.push_str(": ");
                    value.write_repr(out, active);
                }
                out.push('}');
                active.pop();
            }
            Value::Set(members) => {
                let members = members.borrow();
                if members.is_empty() {
                    out.push_str("set()");
                    return;
                }
                out.push('{');
                write_items(out, members.keys(), active);
                out.push('}');
            }
            Value::Range(range) => {
                if range.step == 1 {
                    out.push_str(&format!("range({}, {})", range.start, range.stop));
                } else {
                    out.push_str(&format!(
                        "range({}, {}, {})",
                        range.start, range.stop, range.step
                    ));
                }
            }
            Value::Function(function) => {
                out.push_str(&format!("<function {}>", function.name()));
            }
            Value::Builtin(builtin) => {
                out.push_str(&format!("<built-in function {}>", builtin.name()));
            }
            Value::Native(native) => {
                out.push_str(&format!("<built-in function {}>", native.name));
            }
            Value::BoundMethod(method) => {
                out.push_str(&format!(
                    "<bound method {}.{}>",
                    method.receiver().type_name(),
                    method.name()
                ));
            }
            Value::Class(class) => out.push_str(&format!("<class '{}'>", class.name)),
            Value::Instance(instance) => {
                out.push_str(&format!("<{} object>", instance.class.name));
            }
            Value::Slice(slice) => {
                let bound = |value: Option<i64>| {
                    value.map_or_else(|| "None".to_string(), |value| value.to_string())
                };
                out.push_str(&format!(
                    "slice({}, {}, {})",
                    bound(slice.lower),
                    bound(slice.upper),
                    bound(slice.step)
                ));
            }
        }
    }

    /// Structural equality for data, identity for functions, classes and
    /// instances. `1 == 1.0 == True`.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(left), Value::Str(right)) => left == right,
            (Value::List(left), Value::List(right)) => {
                Rc::ptr_eq(left, right) || sequences_equal(&left.borrow(), &right.borrow())
            }
            (Value::Tuple(left), Value::Tuple(right)) => sequences_equal(left, right),
            (Value::Dict(left), Value::Dict(right)) => {
                Rc::ptr_eq(left, right) || left.borrow().equals(&right.borrow(), true)
            }
            (Value::Set(left), Value::Set(right)) => {
                Rc::ptr_eq(left, right) || left.borrow().equals(&right.borrow(), false)
            }
            (Value::Range(left), Value::Range(right)) => {
                let (left_len, right_len) = (left.len(), right.len());
                left_len == right_len
                    && (left_len == 0
                        || (left.start == right.start && (left_len == 1 || left.step == right.step)))
            }
            (Value::Function(left), Value::Function(right)) => Rc::ptr_eq(left, right),
            (Value::Builtin(left), Value::Builtin(right)) => left == right,
            (Value::Native(left), Value::Native(right)) => Rc::ptr_eq(left, right),
            (Value::BoundMethod(left), Value::BoundMethod(right)) => left.same_as(right),
            (Value::Class(left), Value::Class(right)) => Rc::ptr_eq(left, right),
            (Value::Instance(left), Value::Instance(right)) => Rc::ptr_eq(left, right),
            (Value::Slice(left), Value::Slice(right)) => left == right,
            (left, right) => match (left.as_number(), right.as_number()) {
                (Some(left), Some(right)) => left.equals(right),
                _ => false,
            },
        }
    }

    pub(crate) fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(value) => Some(Number::Int(i64::from(*value))),
            Value::Int(value) => Some(Number::Int(*value)),
            Value::Float(value) => Some(Number::Float(*value)),
            _ => None,
        }
    }

    /// Hash used for dict keys and set members. Values that compare equal
    /// hash equally, so `1`, `1.0` and `True` land in the same bucket.
    pub fn hash_key(&self) -> Result<u64, RuntimeError> {
        let mut hasher = FxHasher::default();
        self.hash_into(&mut hasher)?;
        Ok(hasher.finish())
    }

    fn hash_into(&self, hasher: &mut FxHasher) -> Result<(), RuntimeError> {
        match self {
            Value::None => 0u8.hash(hasher),
            Value::Bool(value) => i64::from(*value).hash(hasher),
            Value::Int(value) => value.hash(hasher),
            Value::Float(value) => {
                if value.fract() == 0.0 && value.abs() < 9.2e18 {
                    (*value as i64).hash(hasher);
                } else {
                    value.to_bits().hash(hasher);
                }
            }
            Value::Str(value) => value.hash(hasher),
            Value::Tuple(values) => {
                values.len().hash(hasher);
                for value in values.iter() {
                    value.hash_into(hasher)?;
                }
            }
            Value::Range(range) => (range.start, range.stop, range.step).hash(hasher),
            Value::Function(function) => (Rc::as_ptr(function) as *const () as usize).hash(hasher),
            Value::Builtin(builtin) => builtin.hash(hasher),
            Value::Native(native) => (Rc::as_ptr(native) as *const () as usize).hash(hasher),
            Value::Class(class) => (Rc::as_ptr(class) as *const () as usize).hash(hasher),
            Value::Instance(instance) => {
                (Rc::as_ptr(instance) as *const () as usize).hash(hasher)
            }
            Value::List(_)
            | Value::Dict(_)
            | Value::Set(_)
            | Value::BoundMethod(_)
            | Value::Slice(_) => {
                return Err(RuntimeError::Unhashable {
                    type_name: self.type_name(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_output())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::str(value)
    }
}

/// Numeric view of `bool`, `int` and `float` operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub(crate) fn to_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    fn equals(self, other: Number) -> bool {
        match (self, other) {
            (Number::Int(left), Number::Int(right)) => left == right,
            (left, right) => left.to_f64() == right.to_f64(),
        }
    }
}

fn sequences_equal(left: &[Value], right: &[Value]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(left, right)| left.equals(right))
}

fn write_items<'v>(
    out: &mut String,
    items: impl Iterator<Item = &'v Value>,
    active: &mut Vec<usize>,
) {
    for (index, item) in items.enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        item.write_repr(out, active);
    }
}

/// Quotes with `'` unless the text contains `'` and no `"`.
fn quote_str(value: &str) -> String {
    if value.contains('\'') && !value.contains('"') {
        format!("\"{value}\"")
    } else {
        format!("'{}'", value.replace('\'', "\\'"))
    }
}

/// Shortest round-trip float text, always showing a fractional part or an
/// exponent (`5.0`, `0.1`, `1e+16`).
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let text = format!("{value:e}");
        let (mantissa, exponent) = text.split_once('e').unwrap_or((&text, "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(digits) => ('-', digits),
            None => ('+', exponent),
        };
        return format!("{mantissa}e{sign}{digits:0>2}");
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}
