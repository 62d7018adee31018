//! First-in-first-out eviction.

use parking_lot::Mutex;

use crate::db::CacheKey;

use super::list::RecencyList;
use super::policy::EvictionPolicy;

/// FIFO policy: accesses to known keys do not change their position.
pub struct FifoEviction<K: CacheKey> {
    order: Mutex<RecencyList<K>>,
}

impl<K: CacheKey> FifoEviction<K> {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(RecencyList::new()),
        }
    }
}

impl<K: CacheKey> Default for FifoEviction<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CacheKey> EvictionPolicy<K> for FifoEviction<K> {
    fn key_accessed(&self, key: &K) {
        self.order.lock().push_front_if_absent(key);
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
