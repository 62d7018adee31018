//! Least-recently-used eviction.

use parking_lot::Mutex;

use crate::db::CacheKey;

use super::list::RecencyList;
use super::policy::EvictionPolicy;

/// LRU policy: most recently used key at the head, victim taken from the tail.
pub struct LruEviction<K: CacheKey> {
    order: Mutex<RecencyList<K>>,
}

impl<K: CacheKey> LruEviction<K> {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(RecencyList::new()),
        }
    }

    /// Tracked keys, most recently used first.
    pub fn snapshot(&self) -> Vec<K> {
        self.order.lock().keys()
    }
}

impl<K: CacheKey> Default for LruEviction<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CacheKey> EvictionPolicy<K> for LruEviction<K> {
    fn key_accessed(&self, key: &K) {
        self.order.lock().move_to_front(key);
    }

    fn evict_key(&self) -> Option<K> {
        self.order.lock().pop_tail()
    }

    fn forget(&self, key: &K) {
        self.order.lock().remove(key);
    }

    fn len(&self) -> usize {
        self.order.lock().len()
    }
}
