//! Shared key/value workspace for one pipeline run.
//!
//! Every operation takes the single lock for the duration of the map access
//! only. Two separate calls are two separate critical sections: a caller that
//! reads a value and writes it back may interleave with other writers.

mod messaging;

pub use messaging::Envelope;

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct Workspace {
    memory: Mutex<HashMap<String, Value>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock only means another holder panicked between two map
    // calls; entries are independent, so the map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Store a value, returning the previous one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.lock().insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.lock().remove(key)
    }

    /// Append to the list under `key`. A missing or null entry starts a new
    /// list; any other non-list value becomes the first element.
    pub fn append(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut memory = self.lock();
        let slot = memory.entry(key.into()).or_insert(Value::Null);
        match slot {
            Value::Array(items) => items.push(value.into()),
            Value::Null => *slot = Value::Array(vec![value.into()]),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value.into()]);
            }
        }
    }

    /// Take the list under `key`, leaving an empty list in its place.
    pub fn drain(&self, key: &str) -> Vec<Value> {
        let mut memory = self.lock();
        match memory.get_mut(key) {
            Some(Value::Array(items)) => std::mem::take(items),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.take()],
        }
    }

    /// Apply `f` to the entry under `key` while holding the lock.
    pub fn update<F, R>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(&mut Value) -> R,
    {
        let mut memory = self.lock();
        let slot = memory.entry(key.to_string()).or_insert(Value::Null);
        f(slot)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of every entry, ordered by key.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
