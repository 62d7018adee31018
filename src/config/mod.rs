// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::db::{EvictionKind, WriteKind};

pub const PROD: &str = "prod";
pub const DEV: &str = "dev";
pub const TEST: &str = "test";

const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Engine {
    #[serde(rename = "engine")]
    pub engine: EngineBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineBox {
    pub env: String,
    /// Worker threads; 0 means one per CPU.
    #[serde(default)]
    pub workers: usize,
    pub capacity: usize,
    #[serde(default)]
    pub eviction: EvictionKind,
    #[serde(default)]
    pub write: WriteKind,
    pub persistent: Option<Persistent>,
    pub stats: Option<Stats>,
    pub logs: Option<Logs>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Persistent {
    /// Artificial latency added to every persistent-tier call.
    #[serde(default, with = "humantime_serde")]
    pub latency: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Stats {
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

pub trait ConfigTrait {
    fn is_prod(&self) -> bool;
    fn is_test(&self) -> bool;
    fn workers(&self) -> usize;
    fn capacity(&self) -> usize;
    fn eviction(&self) -> EvictionKind;
    fn write(&self) -> WriteKind;
    fn persistent_latency(&self) -> Duration;
    fn stats_interval(&self) -> Duration;
    fn log_level(&self) -> &str;
}

// Config type alias for convenience
pub type Config = Engine;

impl ConfigTrait for Config {
    fn is_prod(&self) -> bool {
        self.engine.env == PROD
    }

    fn is_test(&self) -> bool {
        self.engine.env == TEST
    }

    /// Configured worker count, resolving 0 to the number of CPUs.
    fn workers(&self) -> usize {
        match self.engine.workers {
            0 => num_cpus::get(),
            n => n,
        }
    }

    fn capacity(&self) -> usize {
        self.engine.capacity
    }

    fn eviction(&self) -> EvictionKind {
        self.engine.eviction
    }

    fn write(&self) -> WriteKind {
        self.engine.write
    }

    fn persistent_latency(&self) -> Duration {
        self.engine
            .persistent
            .as_ref()
            .and_then(|p| p.latency)
            .unwrap_or(Duration::ZERO)
    }

    fn stats_interval(&self) -> Duration {
        self.engine
            .stats
            .as_ref()
            .and_then(|s| s.interval)
            .unwrap_or(DEFAULT_STATS_INTERVAL)
    }

    fn log_level(&self) -> &str {
        self.engine
            .logs
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Resolve absolute path
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        let cfg = Self::parse(&data).with_context(|| format!("load config from {:?}", abs_path))?;
        Ok(cfg)
    }

    /// Parses and validates configuration from YAML text.
    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Engine = serde_yaml::from_str(data).context("unmarshal yaml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.engine.capacity == 0 {
            anyhow::bail!("engine.capacity must be greater than zero");
        }
        match self.engine.env.as_str() {
            PROD | DEV | TEST => {}
            other => anyhow::bail!("unknown engine.env {:?}", other),
        }
        if self.stats_interval().is_zero() {
            anyhow::bail!("engine.stats.interval must be greater than zero");
        }
        Ok(())
    }
}

// Test config is always available for integration tests
mod test_config;
#[allow(dead_code)]
pub use test_config::new_test_config;
