//! Cache lookup status.

use serde::{Deserialize, Serialize};

/// How a response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the store without touching the network.
    Hit,
    /// Fetched from the network.
    Miss,
    /// Served from the store while a revalidation runs in the background.
    Stale,
    /// Not cacheable; passed straight to the network.
    Bypass,
    /// Neither cached nor reachable; a synthetic response was served.
    Offline,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Stale => write!(f, "STALE"),
            Self::Bypass => write!(f, "BYPASS"),
            Self::Offline => write!(f, "OFFLINE"),
        }
    }
}
