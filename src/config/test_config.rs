use super::{EngineBox, Config, Logs, Persistent, Stats};
use crate::db::{EvictionKind, WriteKind};
use std::time::Duration;

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    Config {
        engine: EngineBox {
            env: super::TEST.to_string(),
            workers: 4,
            capacity: 5,
            eviction: EvictionKind::Lru,
            write: WriteKind::WriteThrough,
            persistent: Some(Persistent {
                latency: Some(Duration::ZERO),
            }),
            stats: Some(Stats {
                interval: Some(Duration::from_millis(50)),
            }),
            logs: Some(Logs {
                level: Some("debug".to_string()),
            }),
        },
    }
}
