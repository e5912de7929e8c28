//! Per-instance key/value state.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// String-keyed JSON state owned by one actor instance.
///
/// Only the instance's turn loop mutates its map. Mutations mark the map
/// dirty; the loop publishes a snapshot after each turn that changed it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMap {
    entries: BTreeMap<String, Value>,
    #[serde(skip)]
    dirty: bool,
}

impl StateMap {
    /// An empty, clean map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Value under `key` decoded as `T`. `None` if missing or not a `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.entries
            .get(key)
            .and_then(|value| T::deserialize(value).ok())
    }

    /// Store `value` under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
        self.dirty = true;
    }

    /// Remove `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether the map changed since the last `take_dirty`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return the dirty flag and clear it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl PartialEq for StateMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_marks_dirty() {
        let mut state = StateMap::new();
        assert!(!state.is_dirty());

        state.set("count", 0);
        assert!(state.take_dirty());
        assert!(!state.take_dirty());

        assert_eq!(state.get_as::<i64>("count"), Some(0));
    }

    #[test]
    fn test_get_as_wrong_type() {
        let mut state = StateMap::new();
        state.set("count", "zero");
        assert_eq!(state.get_as::<i64>("count"), None);
        assert_eq!(state.get("count"), Some(&json!("zero")));
    }

    #[test]
    fn test_remove_missing_key_stays_clean() {
        let mut state = StateMap::new();
        assert_eq!(state.remove("peer"), None);
        assert!(!state.is_dirty());

        state.set("peer", json!({"actor_type": "Test2"}));
        state.take_dirty();
        assert!(state.remove("peer").is_some());
        assert!(state.is_dirty());
    }

    #[test]
    fn test_equality_ignores_dirty_flag() {
        let mut a = StateMap::new();
        a.set("count", 0);
        let mut b = a.clone();
        b.take_dirty();
        assert_eq!(a, b);
    }
}
