//! Worker error types.

use tacmap_cache::CacheError;
use tacmap_core::{ConfigError, WorkerState};
use tacmap_net::FetchError;

/// Errors that end the handling of a single worker event.
///
/// None of them poison the worker: the next event starts from the state the
/// failed one left behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorkerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("install failed: {0}")]
    Install(#[source] CacheError),

    #[error("network error: {0}")]
    Network(#[from] FetchError),

    #[error("cannot {event} while {from}")]
    InvalidTransition { from: WorkerState, event: &'static str },
}
