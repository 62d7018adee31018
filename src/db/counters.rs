//! Counters for engine statistics.
//

use std::sync::atomic::{AtomicU64, Ordering};

use crate::safe;

/// Cumulative engine counters, updated by worker threads.
#[derive(Debug, Default)]
pub struct Counters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub inserts: AtomicU64,
    pub updates: AtomicU64,
    pub removals: AtomicU64,
    /// Victims owned by the evicting worker itself.
    pub evictions_local: AtomicU64,
    /// Victims removed through another worker's urgent lane.
    pub evictions_remote: AtomicU64,
    pub propagation_failures: AtomicU64,
}

/// Point-in-time copy of [`Counters`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub removals: u64,
    pub evictions_local: u64,
    pub evictions_remote: u64,
    pub propagation_failures: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
            evictions_local: self.evictions_local.load(Ordering::Relaxed),
            evictions_remote: self.evictions_remote.load(Ordering::Relaxed),
            propagation_failures: self.propagation_failures.load(Ordering::Relaxed),
        }
    }
}

impl Snapshot {
    pub fn evictions(&self) -> u64 {
        self.evictions_local + self.evictions_remote
    }

    /// Hits over all reads, 0.0 when nothing was read.
    pub fn hit_ratio(&self) -> f64 {
        safe::divide(self.hits, self.hits + self.misses)
    }

    /// Counter growth since `earlier`.
    pub fn since(&self, earlier: &Snapshot) -> Snapshot {
        Snapshot {
            hits: self.hits.saturating_sub(earlier.hits),
            misses: self.misses.saturating_sub(earlier.misses),
            inserts: self.inserts.saturating_sub(earlier.inserts),
            updates: self.updates.saturating_sub(earlier.updates),
            removals: self.removals.saturating_sub(earlier.removals),
            evictions_local: self.evictions_local.saturating_sub(earlier.evictions_local),
            evictions_remote: self.evictions_remote.saturating_sub(earlier.evictions_remote),
            propagation_failures: self
                .propagation_failures
                .saturating_sub(earlier.propagation_failures),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Snapshot::default()
    }
}
