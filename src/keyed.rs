//! Map of independently locked entries.
//!
//! Operations on one key are serialized by that key's mutex; operations on
//! different keys never contend beyond the brief map lookup.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

pub(crate) struct KeyedStore<K, V> {
    entries: RwLock<HashMap<K, Arc<Mutex<V>>>>,
}

impl<K, V> KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Default,
{
    pub(crate) fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Run `f` on the entry for `key`, creating an empty one if absent.
    pub(crate) fn with_entry<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> R {
        let slot = self.slot(key);
        let mut guard = slot.lock();
        f(&mut guard)
    }

    /// Run `f` on the entry for `key` only if it exists.
    pub(crate) fn with_existing<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let slot = self.entries.read().get(key).cloned()?;
        let mut guard = slot.lock();
        Some(f(&mut guard))
    }

    pub(crate) fn keys(&self) -> Vec<K> {
        self.entries.read().keys().cloned().collect()
    }

    fn slot(&self, key: &K) -> Arc<Mutex<V>> {
        if let Some(slot) = self.entries.read().get(key) {
            return Arc::clone(slot);
        }
        Arc::clone(self.entries.write().entry(key.clone()).or_default())
    }
}

impl<K, V> Default for KeyedStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Default,
{
    fn default() -> Self {
        Self::new()
    }
}
