//! Metrics facade bindings.
//
//! Values are recorded through the `metrics` crate; installing an exporter is left to the
//! embedding application.

pub mod meter;

// Re-export commonly used items
pub use meter::*;
