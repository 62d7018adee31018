//! Write propagation interface.
//

use serde::{Deserialize, Serialize};
use std::thread;
use tracing::warn;

use crate::db::error::{CacheError, StoreError};
use crate::db::storage::{CacheStore, PersistentStore};
use crate::db::{CacheKey, CacheValue};

use super::write_around::WriteAround;
use super::write_through::WriteThrough;

/// Decides how a write reaches the cache tier and the persistent tier.
pub trait WritePolicy<K: CacheKey, V: CacheValue>: Send + Sync {
    /// Propagates `key = value`. Completes only when the policy considers the write done.
    fn write(
        &self,
        key: &K,
        value: &V,
        cache: &dyn CacheStore<K, V>,
        persistent: &dyn PersistentStore<K, V>,
    ) -> Result<(), CacheError>;

    /// Removes `key` from both tiers concurrently.
    ///
    /// NotFound on one side is fine as long as the other side held the key.
    fn delete(
        &self,
        key: &K,
        cache: &dyn CacheStore<K, V>,
        persistent: &dyn PersistentStore<K, V>,
    ) -> Result<(), CacheError> {
        let (cache_res, persistent_res) =
            run_both(|| cache.remove(key), || persistent.remove(key));

        match (cache_res, persistent_res) {
            (Ok(()), Ok(()))
            | (Ok(()), Err(StoreError::NotFound))
            | (Err(StoreError::NotFound), Ok(())) => Ok(()),
            (Err(StoreError::NotFound), Err(StoreError::NotFound)) => Err(CacheError::NotFound),
            (cache, persistent) => Err(CacheError::PropagationFailure {
                cache: cache.err(),
                persistent: persistent.err(),
            }),
        }
    }

    /// Whether a successful write leaves the key resident in the cache tier.
    fn caches_writes(&self) -> bool {
        true
    }
}

/// Available write policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteKind {
    #[default]
    WriteThrough,
    WriteAround,
}

impl WriteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WriteThrough => "write_through",
            Self::WriteAround => "write_around",
        }
    }
}

/// Creates a new write policy.
pub fn new_write_policy<K: CacheKey, V: CacheValue>(
    kind: WriteKind,
) -> Box<dyn WritePolicy<K, V>> {
    match kind {
        WriteKind::WriteThrough => Box::new(WriteThrough),
        WriteKind::WriteAround => Box::new(WriteAround),
    }
}

/// Runs the two tier operations as independent sub-tasks and waits for both.
/// The persistent side gets its own scoped thread, the cache side runs on the caller.
/// If the sub-task thread cannot be spawned, the persistent side is reported as failed.
///
/// Costs one thread spawn per write or delete on top of the persistent round trip.
pub(crate) fn run_both<C, P>(
    cache_op: C,
    persistent_op: P,
) -> (Result<(), StoreError>, Result<(), StoreError>)
where
    C: FnOnce() -> Result<(), StoreError>,
    P: FnOnce() -> Result<(), StoreError> + Send,
{
    thread::scope(|s| {
        match thread::Builder::new()
            .name("persistent-write".to_string())
            .spawn_scoped(s, persistent_op)
        {
            Ok(handle) => {
                let cache_res = cache_op();
                let persistent_res = handle.join().unwrap_or_else(|_| {
                    Err(StoreError::backend(anyhow::anyhow!(
                        "persistent write panicked"
                    )))
                });
                (cache_res, persistent_res)
            }
            Err(err) => {
                warn!(
                    component = "write-policy",
                    event = "spawn_failed",
                    error = %err,
                    "failed to spawn persistent write sub-task"
                );
                (cache_op(), Err(StoreError::backend(err)))
            }
        }
    })
}
