//! Insertion-ordered hash map backing both `dict` and `set` values.
//!
//! Storage preserves insertion order (`entries`) while `buckets` accelerates
//! lookup by hash. Bucket collisions are resolved by checking key equality.

use rustc_hash::FxHashMap;

use crate::runtime::error::RuntimeError;
use crate::runtime::value::Value;

#[derive(Debug, Clone)]
struct DictEntry {
    key: Value,
    value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct DictObject {
    entries: Vec<DictEntry>,
    buckets: FxHashMap<u64, Vec<usize>>,
}

impl DictObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<(Value, Value)>) -> Result<Self, RuntimeError> {
        let mut object = Self {
            entries: Vec::with_capacity(entries.len()),
            buckets: FxHashMap::default(),
        };
        for (key, value) in entries {
            object.insert(key, value)?;
        }
        Ok(object)
    }

    /// Builds set storage: every member maps to `None`.
    pub fn from_members(members: impl IntoIterator<Item = Value>) -> Result<Self, RuntimeError> {
        let mut object = Self::new();
        for member in members {
            object.insert(member, Value::None)?;
        }
        Ok(object)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find_index(&self, hash: u64, key: &Value) -> Option<usize> {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&index| self.entries[index].key.equals(key))
    }

    pub fn get(&self, key: &Value) -> Result<Option<Value>, RuntimeError> {
        let hash = key.hash_key()?;
        Ok(self
            .find_index(hash, key)
            .map(|index| self.entries[index].value.clone()))
    }

    pub fn get_item(&self, key: &Value) -> Result<Value, RuntimeError> {
        self.get(key)?
            .ok_or_else(|| RuntimeError::MissingKey { key: key.repr() })
    }

    pub fn contains(&self, key: &Value) -> Result<bool, RuntimeError> {
        let hash = key.hash_key()?;
        Ok(self.find_index(hash, key).is_some())
    }

    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), RuntimeError> {
        // Hash first, then confirm equality inside the collision bucket so
        // that `True`, `1` and `1.0` alias the same entry.
        let hash = key.hash_key()?;
        if let Some(index) = self.find_index(hash, &key) {
            self.entries[index].value = value;
            return Ok(());
        }

        let index = self.entries.len();
        self.entries.push(DictEntry { key, value });
        self.buckets.entry(hash).or_default().push(index);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|entry| (&entry.key, &entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|entry| &entry.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|entry| &entry.value)
    }

    /// Same key set (order-insensitive), and equal values when
    /// `compare_values` is set.
    pub fn equals(&self, other: &DictObject, compare_values: bool) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|entry| {
                match other.get(&entry.key) {
                    Ok(Some(value)) => !compare_values || entry.value.equals(&value),
                    _ => false,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::DictObject;
    use crate::runtime::error::RuntimeError;
    use crate::runtime::value::Value;

    #[test]
    fn supports_len_get_set_and_render() {
        let mut dict = DictObject::from_entries(vec![
            (Value::str("a"), Value::Int(1)),
            (Value::str("b"), Value::Int(2)),
        ])
        .expect("dict should build");

        assert_eq!(dict.len(), 2);
        assert_eq!(
            dict.get_item(&Value::str("a")).expect("key should exist"),
            Value::Int(1)
        );
        dict.insert(Value::str("a"), Value::Int(7))
            .expect("set should work");
        dict.insert(Value::Int(3), Value::Int(9))
            .expect("set should work");
        assert_eq!(dict.len(), 3);
        assert_eq!(Value::dict(dict).repr(), "{'a': 7, 'b': 2, 3: 9}");
    }

    #[test]
    fn bool_int_and_float_keys_alias() {
        let mut dict = DictObject::from_entries(vec![(Value::Bool(true), Value::Int(1))])
            .expect("dict should build");
        dict.insert(Value::Int(1), Value::Int(9))
            .expect("set should work");
        dict.insert(Value::Float(1.0), Value::Int(10))
            .expect("set should work");
        assert_eq!(dict.len(), 1);
        assert_eq!(
            dict.get_item(&Value::Bool(true)).expect("key should exist"),
            Value::Int(10)
        );
        assert_eq!(Value::dict(dict).repr(), "{True: 10}");
    }

    #[test]
    fn reports_missing_key_and_unhashable_type() {
        let dict = DictObject::from_entries(vec![(Value::Int(1), Value::Int(2))])
            .expect("dict should build");
        assert_eq!(
            dict.get_item(&Value::Int(3))
                .expect_err("missing key should fail"),
            RuntimeError::MissingKey {
                key: "3".to_string()
            }
        );
        assert_eq!(
            dict.get_item(&Value::list(vec![]))
                .expect_err("unhashable key should fail"),
            RuntimeError::Unhashable {
                type_name: "list".to_string()
            }
        );
    }

    #[test]
    fn set_members_are_unique_and_ordered() {
        let members = DictObject::from_members(vec![
            Value::Int(3),
            Value::Int(1),
            Value::Int(3),
            Value::str("x"),
        ])
        .expect("members should hash");
        assert_eq!(Value::set(members).repr(), "{3, 1, 'x'}");
    }
}
