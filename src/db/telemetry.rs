// Telemetry for the cache engine.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;

use crate::db::counters::{Counters, Snapshot};
use crate::metrics::meter;

/// Logs a counter delta and mirrors it to metrics.
pub fn log_stats(name: &str, delta: &Snapshot, len: usize, capacity: usize) {
    meter::add_engine_stat_counters(delta);
    meter::set_cache_occupancy(len, capacity);
    meter::set_hit_ratio(delta.hit_ratio());

    // Log if there's activity
    if !delta.is_zero() {
        tracing::info!(
            name = %name,
            component = "engine",
            event = "stats",
            hits = delta.hits,
            misses = delta.misses,
            hit_ratio = delta.hit_ratio(),
            inserts = delta.inserts,
            updates = delta.updates,
            removals = delta.removals,
            evictions_local = delta.evictions_local,
            evictions_remote = delta.evictions_remote,
            propagation_failures = delta.propagation_failures,
            len = len,
            capacity = capacity,
            "engine statistics"
        );
    }
}

/// Logs the cumulative counters once, on shutdown.
pub fn log_final(name: &str, total: &Snapshot, len: usize, capacity: usize) {
    tracing::info!(
        name = %name,
        component = "engine",
        event = "final_stats",
        hits = total.hits,
        misses = total.misses,
        hit_ratio = total.hit_ratio(),
        inserts = total.inserts,
        updates = total.updates,
        removals = total.removals,
        evictions = total.evictions(),
        propagation_failures = total.propagation_failures,
        len = len,
        capacity = capacity,
        "engine stopped"
    );
}

/// Periodically logs counter deltas until `shutdown_token` is cancelled.
pub async fn logger(
    shutdown_token: CancellationToken,
    name: String,
    counters: Arc<Counters>,
    len: Arc<dyn Fn() -> usize + Send + Sync>,
    capacity: usize,
    each: Duration,
) {
    let mut ticker = interval(each);
    // First tick completes immediately.
    ticker.tick().await;

    let mut last = counters.snapshot();
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                return;
            }
            _ = ticker.tick() => {
                let now = counters.snapshot();
                log_stats(&name, &now.since(&last), len(), capacity);
                last = now;
            }
        }
    }
}
