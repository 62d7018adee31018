//! Slow backing tier (system of record).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::db::error::StoreError;
use crate::db::{CacheKey, CacheValue};

/// Trait for the persistent tier. The cache only ever accelerates reads over it.
pub trait PersistentStore<K, V>: Send + Sync {
    fn write(&self, key: &K, value: &V) -> Result<(), StoreError>;

    /// Reads the value for `key`, or fails with `StoreError::NotFound`.
    fn read(&self, key: &K) -> Result<V, StoreError>;

    /// Removes `key`, or fails with `StoreError::NotFound`.
    fn remove(&self, key: &K) -> Result<(), StoreError>;
}

/// Map-backed stand-in for a database.
pub struct InMemoryPersistentStore<K, V> {
    rows: RwLock<HashMap<K, V>>,
    writes: AtomicU64,
}

impl<K, V> InMemoryPersistentStore<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            writes: AtomicU64::new(0),
        }
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Total successful writes since creation.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl<K, V> Default for InMemoryPersistentStore<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> PersistentStore<K, V> for InMemoryPersistentStore<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn write(&self, key: &K, value: &V) -> Result<(), StoreError> {
        self.rows.write().insert(key.clone(), value.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn read(&self, key: &K) -> Result<V, StoreError> {
        self.rows.read().get(key).cloned().ok_or(StoreError::NotFound)
    }

    fn remove(&self, key: &K) -> Result<(), StoreError> {
        self.rows
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

/// Decorator that adds a fixed latency to every call of the wrapped store.
pub struct SlowStore<S> {
    inner: Arc<S>,
    latency: Duration,
}

impl<S> SlowStore<S> {
    pub fn new(inner: Arc<S>, latency: Duration) -> Self {
        Self { inner, latency }
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    fn pause(&self) {
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
    }
}

impl<K, V, S> PersistentStore<K, V> for SlowStore<S>
where
    S: PersistentStore<K, V>,
{
    fn write(&self, key: &K, value: &V) -> Result<(), StoreError> {
        self.pause();
        self.inner.write(key, value)
    }

    fn read(&self, key: &K) -> Result<V, StoreError> {
        self.pause();
        self.inner.read(key)
    }

    fn remove(&self, key: &K) -> Result<(), StoreError> {
        self.pause();
        self.inner.remove(key)
    }
}
