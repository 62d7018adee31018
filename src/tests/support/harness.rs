// Test harness setup.

use std::sync::{Arc, OnceLock};

use crate::config;
use crate::db::eviction::{new_eviction, EvictionKind};
use crate::db::storage::{CacheStore, InMemoryCacheStore, PersistentStore};
use crate::db::write::{new_write_policy, WriteKind};
use crate::db::CacheEngine;

use super::stores::Rows;

static LOGGER: OnceLock<()> = OnceLock::new();

/// Installs a test-friendly tracing subscriber once per test binary.
pub fn init_test_logging() {
    LOGGER.get_or_init(|| {
        let cfg = config::new_test_config();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(
                config::ConfigTrait::log_level(&cfg),
            ))
            .with_test_writer()
            .try_init();
    });
}

pub type Engine = CacheEngine<String, String>;

/// Options for building an engine over arbitrary tiers.
pub struct EngineSpec {
    pub capacity: usize,
    pub workers: usize,
    pub eviction: EvictionKind,
    pub write: WriteKind,
}

impl Default for EngineSpec {
    fn default() -> Self {
        Self {
            capacity: 5,
            workers: 4,
            eviction: EvictionKind::Lru,
            write: WriteKind::WriteThrough,
        }
    }
}

impl EngineSpec {
    /// Builds an engine over an in-memory cache tier and a fresh row store.
    pub fn build(self) -> (Engine, Rows) {
        let rows = Rows::default();
        let cache: Arc<InMemoryCacheStore<String, String>> =
            Arc::new(InMemoryCacheStore::new(self.capacity));
        let engine = self.build_with(cache, rows.clone());
        (engine, rows)
    }

    /// Builds an engine over caller-provided tiers. The cache tier's own capacity wins.
    pub fn build_with(
        self,
        cache: Arc<dyn CacheStore<String, String>>,
        persistent: Arc<dyn PersistentStore<String, String>>,
    ) -> Engine {
        init_test_logging();
        CacheEngine::new(
            cache,
            persistent,
            new_write_policy(self.write),
            new_eviction(self.eviction),
            self.workers,
        )
        .expect("engine starts")
    }
}
