// Metric names and recording helpers for the cache engine.

use crate::db::counters::Snapshot;

// Metric name constants
pub const HITS: &str = "cache_hits";
pub const MISSES: &str = "cache_misses";
pub const INSERTS: &str = "cache_inserts";
pub const UPDATES: &str = "cache_updates";
pub const REMOVALS: &str = "cache_removals";
pub const EVICTIONS_LOCAL: &str = "cache_evictions_local";
pub const EVICTIONS_REMOTE: &str = "cache_evictions_remote";
pub const PROPAGATION_FAILURES: &str = "cache_propagation_failures";

pub const CACHE_LENGTH: &str = "cache_length";
pub const CACHE_CAPACITY: &str = "cache_capacity";
pub const HIT_RATIO: &str = "cache_hit_ratio";

/// Adds a counter delta to the metrics facade.
pub fn add_engine_stat_counters(delta: &Snapshot) {
    metrics::counter!(HITS).increment(delta.hits);
    metrics::counter!(MISSES).increment(delta.misses);
    metrics::counter!(INSERTS).increment(delta.inserts);
    metrics::counter!(UPDATES).increment(delta.updates);
    metrics::counter!(REMOVALS).increment(delta.removals);
    metrics::counter!(EVICTIONS_LOCAL).increment(delta.evictions_local);
    metrics::counter!(EVICTIONS_REMOTE).increment(delta.evictions_remote);
    metrics::counter!(PROPAGATION_FAILURES).increment(delta.propagation_failures);
}

/// Sets cache occupancy gauges.
pub fn set_cache_occupancy(len: usize, capacity: usize) {
    metrics::gauge!(CACHE_LENGTH).set(len as f64);
    metrics::gauge!(CACHE_CAPACITY).set(capacity as f64);
}

pub fn set_hit_ratio(ratio: f64) {
    metrics::gauge!(HIT_RATIO).set(ratio);
}
