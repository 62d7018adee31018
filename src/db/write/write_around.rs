//! Write-around propagation.

use crate::db::error::{CacheError, StoreError};
use crate::db::storage::{CacheStore, PersistentStore};
use crate::db::{CacheKey, CacheValue};

use super::policy::WritePolicy;

/// Writes the persistent tier only and invalidates any cached copy afterwards,
/// so the cache never holds a value newer than the system of record.
/// Readers repopulate the cache through a read-through load.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteAround;

impl<K: CacheKey, V: CacheValue> WritePolicy<K, V> for WriteAround {
    fn write(
        &self,
        key: &K,
        value: &V,
        cache: &dyn CacheStore<K, V>,
        persistent: &dyn PersistentStore<K, V>,
    ) -> Result<(), CacheError> {
        if let Err(err) = persistent.write(key, value) {
            return Err(CacheError::PropagationFailure {
                cache: None,
                persistent: Some(err),
            });
        }

        match cache.remove(key) {
            Ok(()) | Err(StoreError::NotFound) => Ok(()),
            Err(err) => Err(CacheError::PropagationFailure {
                cache: Some(err),
                persistent: None,
            }),
        }
    }

    fn caches_writes(&self) -> bool {
        false
    }
}
