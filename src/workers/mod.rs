// Worker pool with per-key thread affinity.

pub mod executor;
pub mod pending;
pub mod worker;


// Re-export main types
pub use executor::{owner_index, KeyAffinityExecutor};
pub use pending::Pending;
pub use worker::WorkerState;
