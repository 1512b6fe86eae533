//! Cache error types.

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The store refused a write because it is full.
    #[error("quota exceeded for store '{store}' ({limit} entries)")]
    QuotaExceeded { store: String, limit: usize },

    /// A precache fetch failed, so nothing from the batch was stored.
    #[error("failed to precache {url}: {reason}")]
    Precache { url: String, reason: String },
}
