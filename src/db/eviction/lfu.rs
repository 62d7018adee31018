//! Least-frequently-used eviction.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

use crate::db::CacheKey;

use super::policy::EvictionPolicy;

/// (access count, last access tick); ticks are unique so ranks never collide.
type Rank = (u64, u64);

struct LfuState<K> {
    ranks: HashMap<K, Rank>,
    order: BTreeMap<Rank, K>,
    tick: u64,
}

/// LFU policy: the victim is the key with the fewest accesses,
/// ties go to the one accessed least recently.
pub struct LfuEviction<K: CacheKey> {
    state: Mutex<LfuState<K>>,
}

impl<K: CacheKey> LfuEviction<K> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LfuState {
                ranks: HashMap::new(),
                order: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    /// Access count recorded for `key`, 0 if untracked.
    pub fn frequency(&self, key: &K) -> u64 {
        self.state
            .lock()
            .ranks
            .get(key)
            .map(|(freq, _)| *freq)
            .unwrap_or(0)
    }
}

impl<K: CacheKey> Default for LfuEviction<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CacheKey> EvictionPolicy<K> for LfuEviction<K> {
    fn key_accessed(&self, key: &K) {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;

        let freq = match state.ranks.get(key).copied() {
            Some(old) => {
                state.order.remove(&old);
                old.0 + 1
            }
            None => 1,
        };

        state.ranks.insert(key.clone(), (freq, tick));
        state.order.insert((freq, tick), key.clone());
    }

    fn evict_key(&self) -> Option<K> {
        let mut state = self.state.lock();
        let (_, victim) = state.order.pop_first()?;
        state.ranks.remove(&victim);
        Some(victim)
    }

    fn forget(&self, key: &K) {
        let mut state = self.state.lock();
        if let Some(rank) = state.ranks.remove(key) {
            state.order.remove(&rank);
        }
    }

    fn len(&self) -> usize {
        self.state.lock().ranks.len()
    }
}
