//! Write-through propagation.

use tracing::warn;

use crate::db::error::CacheError;
use crate::db::storage::{CacheStore, PersistentStore};
use crate::db::{CacheKey, CacheValue};

use super::policy::{run_both, WritePolicy};

/// Writes both tiers concurrently and completes once both are done.
///
/// Latency is that of the slower tier rather than the sum of both. If one side fails the
/// other is not rolled back; the caller gets a `PropagationFailure` naming the failed side.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteThrough;

impl<K: CacheKey, V: CacheValue> WritePolicy<K, V> for WriteThrough {
    fn write(
        &self,
        key: &K,
        value: &V,
        cache: &dyn CacheStore<K, V>,
        persistent: &dyn PersistentStore<K, V>,
    ) -> Result<(), CacheError> {
        let (cache_res, persistent_res) =
            run_both(|| cache.put(key, value), || persistent.write(key, value));

        match CacheError::propagation(cache_res, persistent_res) {
            None => Ok(()),
            Some(err) => {
                warn!(
                    component = "write-through",
                    event = "propagation_failed",
                    key = ?key,
                    error = %err,
                    "tiers may diverge"
                );
                Err(err)
            }
        }
    }
}
