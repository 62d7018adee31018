#[path = "shared/safe/mod.rs"]
pub mod safe;
#[cfg(test)]
mod tests;

#[cfg(test)]
pub use tests::support;

pub mod config;
pub mod db;
pub mod metrics;
pub mod workers;

pub use db::{CacheEngine, CacheError};
