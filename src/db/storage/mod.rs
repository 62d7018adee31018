//! Storage tiers: the in-memory cache tier and the slow persistent tier.

pub mod cache_store;
pub mod persistent;


// Re-export main types
pub use cache_store::{CacheStore, InMemoryCacheStore};
pub use persistent::{InMemoryPersistentStore, PersistentStore, SlowStore};
