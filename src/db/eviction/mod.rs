//! Pluggable eviction policies.

pub mod fifo;
pub mod lfu;
pub mod list;
pub mod lru;
pub mod policy;


// Re-export main types
pub use fifo::FifoEviction;
pub use lfu::LfuEviction;
pub use lru::LruEviction;
pub use policy::{new_eviction, EvictionKind, EvictionPolicy};
