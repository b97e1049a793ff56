//! The local node's share of the keyspace.

use std::collections::HashMap;
use std::sync::Mutex;

/// Result of a lookup. A removed key keeps its entry as a tombstone, which
/// reads differently from a key that was never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Value(String),
    Removed,
    Missing,
}

/// In-process key/value store owned exclusively by the local node.
///
/// The single mutex serializes concurrent handler threads; `None` values are
/// tombstones. Nothing is replicated or persisted.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: Mutex<HashMap<String, Option<String>>>,
}

impl KeyValueStore {
    pub fn new() -> KeyValueStore {
        KeyValueStore::default()
    }

    pub fn get(&self, key: &str) -> Lookup {
        match self.lock().get(key) {
            Some(Some(value)) => Lookup::Value(value.clone()),
            Some(None) => Lookup::Removed,
            None => Lookup::Missing,
        }
    }

    /// Creates or overwrites an entry; `None` tombstones the key in place.
    /// Last writer wins between concurrent puts for the same key.
    pub fn insert(&self, key: String, value: Option<String>) {
        self.lock().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Option<String>>> {
        // A poisoned lock means a handler thread panicked mid-write; the map
        // itself is still usable and the serving loop must keep answering.
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
