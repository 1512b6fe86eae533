//! Worker lifecycle states and host control messages.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Nothing installed yet, or the last install attempt failed.
    #[default]
    Uninstalled,
    /// Core assets are being fetched.
    Installing,
    /// Installed and waiting for activation.
    Waiting,
    /// Controlling clients and serving requests.
    Active,
}

impl WorkerState {
    /// Whether the install step has completed for this version.
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Waiting | Self::Active)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninstalled => write!(f, "uninstalled"),
            Self::Installing => write!(f, "installing"),
            Self::Waiting => write!(f, "installed-waiting"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Command delivered by the host application over the control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    /// Activate the waiting worker without waiting for old clients to close.
    #[serde(rename = "skipWaiting")]
    SkipWaiting,
    /// Delete the entire tile store.
    #[serde(rename = "clearTileCache")]
    ClearTileCache,
}

impl ControlMessage {
    /// Parse a raw message. Unrecognized values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "skipWaiting" => Some(Self::SkipWaiting),
            "clearTileCache" => Some(Self::ClearTileCache),
            _ => None,
        }
    }

    /// Wire form of this message.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipWaiting => "skipWaiting",
            Self::ClearTileCache => "clearTileCache",
        }
    }
}

impl std::fmt::Display for ControlMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
