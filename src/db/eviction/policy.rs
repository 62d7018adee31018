//! Eviction policy interface.
//

use serde::{Deserialize, Serialize};

use crate::db::CacheKey;

use super::fifo::FifoEviction;
use super::lfu::LfuEviction;
use super::lru::LruEviction;

/// Decides which key is sacrificed when the cache tier is full.
///
/// A single policy instance is shared by every worker, so implementations guard their
/// state internally.
pub trait EvictionPolicy<K>: Send + Sync {
    /// Records that `key` was just read or written.
    fn key_accessed(&self, key: &K);

    /// Selects the least valuable key and stops tracking it.
    /// Returns `None` when nothing is tracked.
    fn evict_key(&self) -> Option<K>;

    /// Stops tracking `key` without selecting it as a victim.
    fn forget(&self, key: &K);

    /// Number of tracked keys.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Available eviction policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionKind {
    #[default]
    Lru,
    Fifo,
    Lfu,
}

impl EvictionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lru => "lru",
            Self::Fifo => "fifo",
            Self::Lfu => "lfu",
        }
    }
}

/// Creates a new eviction policy.
pub fn new_eviction<K: CacheKey>(kind: EvictionKind) -> Box<dyn EvictionPolicy<K>> {
    match kind {
        EvictionKind::Lru => Box::new(LruEviction::new()),
        EvictionKind::Fifo => Box::new(FifoEviction::new()),
        EvictionKind::Lfu => Box::new(LfuEviction::new()),
    }
}
