//! Pluggable write propagation policies.

pub mod policy;
pub mod write_around;
pub mod write_through;


// Re-export main types
pub use policy::{new_write_policy, WriteKind, WritePolicy};
pub use write_around::WriteAround;
pub use write_through::WriteThrough;
