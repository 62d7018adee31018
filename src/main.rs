// Demo entrypoint: replays the reference cache scenario against a configured engine.

use affinity_cache::config::{Config, ConfigTrait};
use affinity_cache::db::{CacheEngine, CacheError, InMemoryPersistentStore, PersistentStore, SlowStore};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const CONFIG_PATH: &str = "cfg/affinity-cache.cfg.yaml";

type Engine = CacheEngine<String, String>;

/// affinity-cache - capacity-bounded cache with per-key worker affinity
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, value_name = "FILE")]
    cfg: Option<PathBuf>,
}

/// Loads the configuration struct from YAML file.
fn load_cfg(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
    let cfg = Config::load(&path)
        .with_context(|| format!("failed to load config from {:?}", path))?;
    Ok(cfg)
}

/// Configures structured logging based on configuration.
fn configure_logger(cfg: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.log_level()));

    if cfg.is_prod() {
        // Production: JSON format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        // Development: Pretty console format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let cfg = load_cfg(args.cfg)?;
    configure_logger(&cfg);

    info!(
        component = "config",
        event = "load_success",
        workers = cfg.workers(),
        capacity = cfg.capacity(),
        eviction = cfg.eviction().as_str(),
        write = cfg.write().as_str(),
        "config loaded"
    );

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let rows = Arc::new(InMemoryPersistentStore::<String, String>::new());
    let persistent: Arc<dyn PersistentStore<String, String>> =
        Arc::new(SlowStore::new(rows.clone(), cfg.persistent_latency()));
    let engine: Engine =
        CacheEngine::from_config(&cfg, persistent).context("failed to start cache engine")?;

    let stats = tokio::spawn(engine.stats_logger(shutdown_token.clone(), cfg.stats_interval()));

    let outcome = run_scenario(&engine).await;

    shutdown_token.cancel();
    if let Err(err) = stats.await {
        warn!(
            component = "main",
            event = "stats_logger_failed",
            error = %err,
            "stats logger task did not finish cleanly"
        );
    }
    engine.shutdown();

    info!(
        component = "main",
        event = "persistent_rows",
        rows = rows.len(),
        writes = rows.writes(),
        "persistent tier after scenario"
    );
    outcome
}

async fn run_scenario(engine: &Engine) -> Result<()> {
    let fill = [
        ("A", "Apple"),
        ("B", "Banana"),
        ("C", "Cherry"),
        ("D", "Durian"),
        ("E", "Elderberry"),
    ];
    for (key, value) in fill {
        engine.put(key.to_string(), value.to_string()).await?;
    }
    info!(
        component = "demo",
        event = "filled",
        len = engine.len(),
        capacity = engine.capacity(),
        "cache filled"
    );

    // One past capacity, the least recently used key goes.
    engine.put("F".to_string(), "Fig".to_string()).await?;
    match engine.get("A".to_string()).await {
        Ok(value) => warn!(component = "demo", event = "not_evicted", value = %value, "A still cached"),
        Err(CacheError::NotFound) => {
            info!(component = "demo", event = "evicted", key = "A", "A was evicted")
        }
        Err(err) => return Err(err).context("read A"),
    }

    show(engine, "F").await?;

    engine.put("B".to_string(), "Blueberry".to_string()).await?;
    show(engine, "B").await?;

    let key = "C".to_string();
    info!(
        component = "demo",
        event = "affinity",
        key = %key,
        worker = engine.owner_index_of(&key),
        "every operation on C runs on this worker"
    );
    engine.put(key.clone(), "Cranberry".to_string()).await?;
    show(engine, "C").await?;

    // Evicted from the cache tier, still served from the persistent tier.
    show_loaded(engine, "A").await?;

    let stats = engine.stats();
    info!(
        component = "demo",
        event = "done",
        hits = stats.hits,
        misses = stats.misses,
        evictions = stats.evictions(),
        "scenario complete"
    );
    Ok(())
}

async fn show(engine: &Engine, key: &str) -> Result<()> {
    let value = engine
        .get(key.to_string())
        .await
        .with_context(|| format!("read {}", key))?;
    info!(component = "demo", event = "read", key = %key, value = %value, "cache hit");
    Ok(())
}

async fn show_loaded(engine: &Engine, key: &str) -> Result<()> {
    let value = engine
        .load(key.to_string())
        .await
        .with_context(|| format!("load {}", key))?;
    info!(component = "demo", event = "read_through", key = %key, value = %value, "loaded");
    Ok(())
}
