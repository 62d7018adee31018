//! Fast in-memory tier.

use dashmap::DashMap;

use crate::db::error::StoreError;
use crate::db::{CacheKey, CacheValue};

/// Trait for the in-memory cache tier.
///
/// The engine routes every key to a single worker, but one store instance is shared by all
/// workers, so implementations must serialize concurrent access to different keys themselves.
pub trait CacheStore<K, V>: Send + Sync {
    /// Inserts or replaces the value for `key`.
    fn put(&self, key: &K, value: &V) -> Result<(), StoreError>;

    /// Returns a copy of the value for `key`, or `StoreError::NotFound`.
    fn get(&self, key: &K) -> Result<V, StoreError>;

    /// Removes `key`, or fails with `StoreError::NotFound`.
    fn remove(&self, key: &K) -> Result<(), StoreError>;

    fn contains_key(&self, key: &K) -> bool;

    /// Number of resident entries.
    fn len(&self) -> usize;

    /// Maximum number of resident entries the engine will keep.
    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sharded concurrent map with a fixed entry capacity.
///
/// Capacity is advisory: the store itself never rejects a write, the engine evicts before
/// inserting a new key into a full store.
pub struct InMemoryCacheStore<K, V> {
    items: DashMap<K, V>,
    capacity: usize,
}

impl<K, V> InMemoryCacheStore<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    /// Creates a new store able to hold `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: DashMap::with_capacity(capacity),
            capacity,
        }
    }
}

impl<K, V> CacheStore<K, V> for InMemoryCacheStore<K, V>
where
    K: CacheKey,
    V: CacheValue,
{
    fn put(&self, key: &K, value: &V) -> Result<(), StoreError> {
        self.items.insert(key.clone(), value.clone());
        Ok(())
    }

    fn get(&self, key: &K) -> Result<V, StoreError> {
        self.items
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    fn remove(&self, key: &K) -> Result<(), StoreError> {
        self.items
            .remove(key)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.items.contains_key(key)
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
