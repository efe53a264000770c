//! Keyed read-model storage (summary store boundary).
//!
//! Rows are insert-or-replace by natural key. Writing the same value twice is a
//! no-op reported as [`UpsertOutcome::Unchanged`].
//!
//! Every write carries a version drawn from [`ReadModelStore::next_version`]
//! before the writer read its inputs. A store refuses a write older than the
//! version it already holds for that key, so a slow batch can never overwrite
//! a row derived from a later read of the source. Removed rows keep their
//! version as a tombstone for the same reason.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write-time constraint failed (e.g. the row's entity is unknown to the store).
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// What a write did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    Unchanged,
    Removed,
    /// The key already holds a newer version; nothing was written.
    Superseded,
}

/// Keyed store for disposable, rebuildable read models.
pub trait ReadModelStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Result<Option<V>, StoreError>;

    /// A version greater than every version handed out before.
    fn next_version(&self) -> Result<u64, StoreError>;

    /// Insert or replace the row stored under `key`. At most one row per key exists
    /// after this returns.
    fn upsert(&self, key: K, value: V, version: u64) -> Result<UpsertOutcome, StoreError>;

    /// Remove the row stored under `key`, leaving a tombstone at `version`.
    fn remove(&self, key: &K, version: u64) -> Result<UpsertOutcome, StoreError>;

    /// All rows, ordered by key.
    fn list(&self) -> Result<Vec<V>, StoreError>;

    /// Remove every row (rebuild support). Versions are kept.
    fn clear(&self) -> Result<(), StoreError>;
}

impl<K, V, S> ReadModelStore<K, V> for Arc<S>
where
    S: ReadModelStore<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Result<Option<V>, StoreError> {
        (**self).get(key)
    }

    fn next_version(&self) -> Result<u64, StoreError> {
        (**self).next_version()
    }

    fn upsert(&self, key: K, value: V, version: u64) -> Result<UpsertOutcome, StoreError> {
        (**self).upsert(key, value, version)
    }

    fn remove(&self, key: &K, version: u64) -> Result<UpsertOutcome, StoreError> {
        (**self).remove(key, version)
    }

    fn list(&self) -> Result<Vec<V>, StoreError> {
        (**self).list()
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}

/// Write-time check applied by [`InMemoryReadModelStore`] before accepting a key.
pub type KeyConstraint<K> = Arc<dyn Fn(&K) -> bool + Send + Sync>;

/// A stored row, or the tombstone of a removed one.
#[derive(Debug)]
struct Slot<V> {
    version: u64,
    value: Option<V>,
}

/// In-memory keyed store for tests/dev.
pub struct InMemoryReadModelStore<K, V> {
    inner: RwLock<BTreeMap<K, Slot<V>>>,
    versions: AtomicU64,
    constraint: Option<KeyConstraint<K>>,
}

impl<K, V> InMemoryReadModelStore<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            versions: AtomicU64::new(0),
            constraint: None,
        }
    }

    /// Reject upserts whose key fails `constraint` with an integrity violation,
    /// the way a foreign key would in a relational store.
    pub fn with_constraint(mut self, constraint: KeyConstraint<K>) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Live rows (tombstones excluded).
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .map(|m| m.values().filter(|s| s.value.is_some()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for InMemoryReadModelStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: core::fmt::Debug, V> core::fmt::Debug for InMemoryReadModelStore<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryReadModelStore")
            .field("rows", &self.len())
            .field("version", &self.versions.load(Ordering::SeqCst))
            .field("constrained", &self.constraint.is_some())
            .finish()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl<K, V> ReadModelStore<K, V> for InMemoryReadModelStore<K, V>
where
    K: Ord + Clone + core::fmt::Debug + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Result<Option<V>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(key).and_then(|slot| slot.value.clone()))
    }

    fn next_version(&self) -> Result<u64, StoreError> {
        Ok(self.versions.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn upsert(&self, key: K, value: V, version: u64) -> Result<UpsertOutcome, StoreError> {
        if let Some(constraint) = &self.constraint {
            if !constraint(&key) {
                return Err(StoreError::IntegrityViolation(format!(
                    "key {key:?} references an unknown entity"
                )));
            }
        }

        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let outcome = match map.get(&key) {
            Some(slot) if slot.version > version => return Ok(UpsertOutcome::Superseded),
            Some(Slot { value: Some(existing), .. }) if *existing == value => UpsertOutcome::Unchanged,
            Some(Slot { value: Some(_), .. }) => UpsertOutcome::Replaced,
            _ => UpsertOutcome::Inserted,
        };
        map.insert(
            key,
            Slot {
                version,
                value: Some(value),
            },
        );
        Ok(outcome)
    }

    fn remove(&self, key: &K, version: u64) -> Result<UpsertOutcome, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let outcome = match map.get(key) {
            Some(slot) if slot.version > version => return Ok(UpsertOutcome::Superseded),
            Some(Slot { value: Some(_), .. }) => UpsertOutcome::Removed,
            _ => UpsertOutcome::Unchanged,
        };
        map.insert(key.clone(), Slot { version, value: None });
        Ok(outcome)
    }

    fn list(&self) -> Result<Vec<V>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().filter_map(|slot| slot.value.clone()).collect())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        for slot in map.values_mut() {
            slot.value = None;
        }
        Ok(())
    }
}
