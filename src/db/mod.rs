//! Two-tier cache engine: storage tiers, eviction, write propagation and the engine itself.

use std::fmt::Debug;
use std::hash::Hash;

pub mod counters;
pub mod engine;
pub mod error;
pub mod eviction;
mod slots;
pub mod storage;
pub mod telemetry;
pub mod write;

#[cfg(test)]
mod engine_test;

/// Bounds every cache key satisfies: hashable for routing, cloneable into both tiers.
pub trait CacheKey: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

impl<T> CacheKey for T where T: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

/// Bounds every cached value satisfies.
pub trait CacheValue: Clone + Send + Sync + 'static {}

impl<T> CacheValue for T where T: Clone + Send + Sync + 'static {}

// Re-export main types
pub use counters::{Counters, Snapshot};
pub use engine::CacheEngine;
pub use error::{CacheError, StoreError};
pub use eviction::{new_eviction, EvictionKind, EvictionPolicy};
pub use storage::{CacheStore, InMemoryCacheStore, InMemoryPersistentStore, PersistentStore, SlowStore};
pub use write::{new_write_policy, WriteKind, WritePolicy};
