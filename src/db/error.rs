// Error taxonomy for the cache engine and its storage tiers.

use std::io;

/// Errors reported by a single storage tier.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("key not found")]
    NotFound,
    #[error("storage backend failure: {0}")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    /// Wraps an arbitrary backend failure.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        Self::Backend(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Errors surfaced to callers through a pending operation.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("key not found")]
    NotFound,

    /// One or both sides of a write failed. The side that succeeded is not rolled back.
    #[error("write propagation failed (cache: {}, persistent: {})", side(.cache), side(.persistent))]
    PropagationFailure {
        cache: Option<StoreError>,
        persistent: Option<StoreError>,
    },

    #[error("executor is stopped")]
    ExecutorStopped,

    #[error("task panicked: {0}")]
    TaskPanicked(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn worker thread")]
    Spawn(#[from] io::Error),

    #[error(transparent)]
    Store(StoreError),
}

impl CacheError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Builds a propagation failure out of the per-side results of a two-tier operation.
    /// Returns `None` when both sides succeeded.
    pub fn propagation(
        cache: Result<(), StoreError>,
        persistent: Result<(), StoreError>,
    ) -> Option<Self> {
        match (cache, persistent) {
            (Ok(()), Ok(())) => None,
            (cache, persistent) => Some(Self::PropagationFailure {
                cache: cache.err(),
                persistent: persistent.err(),
            }),
        }
    }
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound,
            other => Self::Store(other),
        }
    }
}

fn side(err: &Option<StoreError>) -> String {
    match err {
        Some(e) => e.to_string(),
        None => "ok".to_string(),
    }
}
