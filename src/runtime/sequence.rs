//! Indexing, slicing and iteration over container values.

use crate::runtime::dict::DictObject;
use crate::runtime::error::RuntimeError;
use crate::runtime::value::{RangeValue, SliceValue, Value};

/// Iterator over the items a `for` loop or a builtin consumes.
///
/// Containers are snapshotted when iteration starts; ranges are produced
/// lazily so a large `range()` never materializes.
pub enum ValueIter {
    Items(std::vec::IntoIter<Value>),
    Range { range: RangeValue, index: usize },
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::Items(items) => items.next(),
            ValueIter::Range { range, index } => {
                let value = range.get(*index)?;
                *index += 1;
                Some(Value::Int(value))
            }
        }
    }
}

pub fn iterate(value: &Value) -> Result<ValueIter, RuntimeError> {
    let items = match value {
        Value::Range(range) => {
            return Ok(ValueIter::Range {
                range: *range,
                index: 0,
            });
        }
        Value::List(items) => items.borrow().clone(),
        Value::Tuple(items) => items.to_vec(),
        Value::Str(text) => text
            .chars()
            .map(|c| Value::str(c.encode_utf8(&mut [0; 4])))
            .collect(),
        Value::Dict(dict) | Value::Set(dict) => dict.borrow().keys().cloned().collect(),
        other => {
            return Err(RuntimeError::NotIterable {
                type_name: other.type_name(),
            });
        }
    };
    Ok(ValueIter::Items(items.into_iter()))
}

/// Materializes every item of an iterable value.
pub fn collect(value: &Value) -> Result<Vec<Value>, RuntimeError> {
    Ok(iterate(value)?.collect())
}

pub fn len(value: &Value) -> Result<usize, RuntimeError> {
    match value {
        Value::Str(text) => Ok(text.chars().count()),
        Value::List(items) => Ok(items.borrow().len()),
        Value::Tuple(items) => Ok(items.len()),
        Value::Dict(dict) | Value::Set(dict) => Ok(dict.borrow().len()),
        Value::Range(range) => Ok(range.len()),
        other => Err(RuntimeError::invalid_argument(format!(
            "object of type '{}' has no len()",
            other.type_name()
        ))),
    }
}

/// Resolves a possibly negative index against `len`.
fn normalize_index(index: i64, len: usize, container: &'static str) -> Result<usize, RuntimeError> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(RuntimeError::IndexOutOfRange { container })
    }
}

/// Positions selected by `slice` in a sequence of length `len`, in
/// traversal order.
pub fn slice_indices(slice: &SliceValue, len: usize) -> Result<Vec<usize>, RuntimeError> {
    let step = slice.step.unwrap_or(1);
    if step == 0 {
        return Err(RuntimeError::ZeroSliceStep);
    }
    let len = len as i64;
    let clamp = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };

    let (start, stop) = if step > 0 {
        (
            slice.lower.map_or(0, |lower| clamp(lower, 0, len)),
            slice.upper.map_or(len, |upper| clamp(upper, 0, len)),
        )
    } else {
        (
            slice.lower.map_or(len - 1, |lower| clamp(lower, -1, len - 1)),
            slice.upper.map_or(-1, |upper| clamp(upper, -1, len - 1)),
        )
    };

    let mut indices = Vec::new();
    let mut position = start;
    while (step > 0 && position < stop) || (step < 0 && position > stop) {
        indices.push(position as usize);
        match position.checked_add(step) {
            Some(next) => position = next,
            None => break,
        }
    }
    Ok(indices)
}

fn pick<T: Clone>(items: &[T], slice: &SliceValue) -> Result<Vec<T>, RuntimeError> {
    Ok(slice_indices(slice, items.len())?
        .into_iter()
        .map(|index| items[index].clone())
        .collect())
}

/// `object[index]`.
pub fn get_item(object: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (object, index) {
        (Value::Dict(dict), key) => dict.borrow().get_item(key),
        (Value::List(items), Value::Slice(slice)) => Ok(Value::list(pick(&items.borrow(), slice)?)),
        (Value::Tuple(items), Value::Slice(slice)) => Ok(Value::tuple(pick(items, slice)?)),
        (Value::Str(text), Value::Slice(slice)) => {
            let chars: Vec<char> = text.chars().collect();
            Ok(Value::str(&pick(&chars, slice)?.into_iter().collect::<String>()))
        }
        (Value::Range(range), Value::Slice(slice)) => {
            let values = slice_indices(slice, range.len())?
                .into_iter()
                .filter_map(|index| range.get(index))
                .map(Value::Int)
                .collect();
            Ok(Value::list(values))
        }
        (Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Range(_), index) => {
            let Some(raw) = index.as_int() else {
                return Err(RuntimeError::InvalidIndexType {
                    container: object.type_name(),
                    type_name: index.type_name(),
                });
            };
            index_sequence(object, raw)
        }
        (other, _) => Err(RuntimeError::NotSubscriptable {
            type_name: other.type_name(),
        }),
    }
}

fn index_sequence(object: &Value, raw: i64) -> Result<Value, RuntimeError> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let position = normalize_index(raw, items.len(), "list")?;
            Ok(items[position].clone())
        }
        Value::Tuple(items) => {
            let position = normalize_index(raw, items.len(), "tuple")?;
            Ok(items[position].clone())
        }
        Value::Str(text) => {
            let position = normalize_index(raw, text.chars().count(), "string")?;
            let found: String = text.chars().skip(position).take(1).collect();
            Ok(Value::str(&found))
        }
        Value::Range(range) => {
            let position = normalize_index(raw, range.len(), "range object")?;
            Ok(range.get(position).map_or(Value::None, Value::Int))
        }
        other => Err(RuntimeError::NotSubscriptable {
            type_name: other.type_name(),
        }),
    }
}

/// `object[index] = value`. Lists and dicts are mutated in place.
pub fn set_item(object: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match (object, index) {
        (Value::Dict(dict), key) => dict.borrow_mut().insert(key.clone(), value),
        (Value::List(items), Value::Slice(slice)) => {
            // Collect before borrowing so `a[:] = a` reads the old contents.
            let replacement = collect(&value)?;
            assign_slice(&mut items.borrow_mut(), slice, replacement)
        }
        (Value::List(items), index) => {
            let Some(raw) = index.as_int() else {
                return Err(RuntimeError::InvalidIndexType {
                    container: "list".to_string(),
                    type_name: index.type_name(),
                });
            };
            let mut items = items.borrow_mut();
            let position = normalize_index(raw, items.len(), "list assignment")?;
            items[position] = value;
            Ok(())
        }
        (other, _) => Err(RuntimeError::NoItemAssignment {
            type_name: other.type_name(),
        }),
    }
}

fn assign_slice(
    items: &mut Vec<Value>,
    slice: &SliceValue,
    replacement: Vec<Value>,
) -> Result<(), RuntimeError> {
    let step = slice.step.unwrap_or(1);
    if step == 1 {
        let len = items.len() as i64;
        let clamp = |bound: i64| {
            let bound = if bound < 0 { bound + len } else { bound };
            bound.clamp(0, len) as usize
        };
        let start = slice.lower.map_or(0, clamp);
        let stop = slice.upper.map_or(items.len(), clamp).max(start);
        items.splice(start..stop, replacement);
        return Ok(());
    }

    let indices = slice_indices(slice, items.len())?;
    if indices.len() != replacement.len() {
        return Err(RuntimeError::ExtendedSliceSize {
            expected: indices.len(),
            got: replacement.len(),
        });
    }
    for (index, value) in indices.into_iter().zip(replacement) {
        items[index] = value;
    }
    Ok(())
}

/// Builds a `dict` from an iterable of two-item sequences, or copies a dict.
pub fn dict_from(value: &Value) -> Result<DictObject, RuntimeError> {
    if let Value::Dict(dict) = value {
        return Ok(dict.borrow().clone());
    }
    let mut dict = DictObject::new();
    for (position, item) in iterate(value)?.enumerate() {
        let pair = collect(&item).map_err(|_| {
            RuntimeError::invalid_argument(format!(
                "cannot convert dictionary update sequence element #{position} to a sequence"
            ))
        })?;
        let [key, value] = <[Value; 2]>::try_from(pair).map_err(|pair| {
            RuntimeError::invalid_value(format!(
                "dictionary update sequence element #{position} has length {}; 2 is required",
                pair.len()
            ))
        })?;
        dict.insert(key, value)?;
    }
    Ok(dict)
}
