//! Keyed write serialization: at most one in-flight upsert per period key.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Lock table keyed by period key.
///
/// Entries are created on demand and kept for the life of the table. Engines use
/// process-wide tables unless handed their own.
#[derive(Debug)]
pub struct PeriodLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> PeriodLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, key: &K) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        locks.entry(key.clone()).or_default().clone()
    }

    /// Run `f` while holding the lock for `key`.
    ///
    /// A lock poisoned by a panicking writer is recovered: the guarded data is `()`
    /// and the store itself decides whether the interrupted write landed.
    pub fn with_lock<T>(&self, key: &K, f: impl FnOnce() -> T) -> T {
        let lock = self.handle(key);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        f()
    }

    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for PeriodLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
