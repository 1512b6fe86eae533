//! Fetch error types.

/// Error type for fetch operations.
///
/// A fetch that returns any HTTP status, including 4xx and 5xx, is not an
/// error. These variants cover the cases where no response exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Network unavailable: {0}")]
    Offline(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl FetchError {
    /// Error for an unreachable URL.
    pub fn offline(url: impl Into<String>) -> Self {
        Self::Offline(url.into())
    }
}
