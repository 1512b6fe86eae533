//! Worker configuration.
//!
//! Everything the caching policies need is carried by one immutable
//! [`WorkerConfig`] passed in at construction. The defaults reproduce the
//! production worker; tests shrink the tile limits instead of touching the
//! policy code.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Errors found while validating a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid scope URL '{0}'")]
    InvalidScope(String),

    #[error("invalid core asset path '{path}': {reason}")]
    InvalidAsset { path: String, reason: String },

    #[error("invalid tile path pattern: {0}")]
    InvalidPattern(String),

    #[error("tile cache capacity must be greater than zero")]
    ZeroCapacity,

    #[error("eviction headroom {headroom} must be smaller than capacity {max_entries}")]
    HeadroomTooLarge { max_entries: usize, headroom: usize },

    #[error("shell and tile stores share the name '{0}'")]
    DuplicateStoreName(String),
}

/// A versioned store name. Bumping the version makes activation delete the
/// previous store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreName {
    /// Base name (e.g., "tacmap-tiles").
    pub prefix: String,
    /// Version tag appended to the prefix.
    pub version: u32,
}

impl StoreName {
    /// Create a new store name.
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self {
            prefix: prefix.into(),
            version,
        }
    }

    /// Full name as used by the storage backend, e.g. `tacmap-v1`.
    pub fn name(&self) -> String {
        format!("{}-v{}", self.prefix, self.version)
    }
}

impl std::fmt::Display for StoreName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-v{}", self.prefix, self.version)
    }
}

/// Tile classification and eviction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileConfig {
    /// Known tile-server hosts. A request whose host contains one of these is a tile.
    #[serde(default = "default_tile_hosts")]
    pub hosts: Vec<String>,
    /// Regex matched (unanchored) against the URL path.
    #[serde(default = "default_tile_path_pattern")]
    pub path_pattern: String,
    /// Maximum number of stored tiles before eviction kicks in.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Extra tiles evicted below the ceiling on each trim.
    #[serde(default = "default_headroom")]
    pub headroom: usize,
}

fn default_tile_hosts() -> Vec<String> {
    [
        "tile.openstreetmap.org",
        "tiles.stadiamaps.com",
        "server.arcgisonline.com",
        "basemap.nationalmap.gov",
        "mt0.google.com",
        "mt1.google.com",
        "mt2.google.com",
        "mt3.google.com",
        "tile.opentopomap.org",
        "stamen-tiles.a.ssl.fastly.net",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_tile_path_pattern() -> String {
    r"/\d+/\d+/\d+".to_string()
}

fn default_max_entries() -> usize {
    2000
}

fn default_headroom() -> usize {
    100
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            hosts: default_tile_hosts(),
            path_pattern: default_tile_path_pattern(),
            max_entries: default_max_entries(),
            headroom: default_headroom(),
        }
    }
}

/// Tokens identifying real-time signaling traffic, which is never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingConfig {
    /// Substrings matched against the host.
    #[serde(default = "default_signaling_hosts")]
    pub host_tokens: Vec<String>,
    /// Substrings matched against the path.
    #[serde(default = "default_signaling_paths")]
    pub path_tokens: Vec<String>,
}

fn default_signaling_hosts() -> Vec<String> {
    vec!["peerjs".to_string()]
}

fn default_signaling_paths() -> Vec<String> {
    vec!["peer".to_string()]
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            host_tokens: default_signaling_hosts(),
            path_tokens: default_signaling_paths(),
        }
    }
}

/// Application shell settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// URL the worker is registered under; core asset paths resolve against it.
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Files required for offline startup, precached on install.
    #[serde(default = "default_core_assets")]
    pub core_assets: Vec<String>,
    /// Body of the 503 response served when a shell asset is unavailable.
    #[serde(default = "default_offline_body")]
    pub offline_body: String,
}

fn default_scope() -> String {
    "http://localhost/".to_string()
}

fn default_core_assets() -> Vec<String> {
    [
        "./",
        "./tacmap-v8.html",
        "./manifest.json",
        "./icon-192.png",
        "./icon-512.png",
        "./icon-180.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_body() -> String {
    "TacMap is offline".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            core_assets: default_core_assets(),
            offline_body: default_offline_body(),
        }
    }
}

/// Complete worker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Store holding the application shell.
    #[serde(default = "default_shell_store")]
    pub shell_store: StoreName,
    /// Store holding map tiles.
    #[serde(default = "default_tile_store")]
    pub tile_store: StoreName,
    /// Tile classification and eviction.
    #[serde(default)]
    pub tiles: TileConfig,
    /// Signaling passthrough tokens.
    #[serde(default)]
    pub signaling: SignalingConfig,
    /// Application shell.
    #[serde(default)]
    pub shell: ShellConfig,
}

fn default_shell_store() -> StoreName {
    StoreName::new("tacmap", 1)
}

fn default_tile_store() -> StoreName {
    StoreName::new("tacmap-tiles", 1)
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            shell_store: default_shell_store(),
            tile_store: default_tile_store(),
            tiles: TileConfig::default(),
            signaling: SignalingConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML worker config")
    }

    /// Load config from a file, TOML or JSON by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?
        };

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Set the tile ceiling and eviction headroom.
    pub fn with_tile_limits(mut self, max_entries: usize, headroom: usize) -> Self {
        self.tiles.max_entries = max_entries;
        self.tiles.headroom = headroom;
        self
    }

    /// Set the scope URL.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.shell.scope = scope.into();
        self
    }

    /// Replace the core asset list.
    pub fn with_core_assets(mut self, assets: &[&str]) -> Self {
        self.shell.core_assets = assets.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Full name of the shell store.
    pub fn shell_store_name(&self) -> String {
        self.shell_store.name()
    }

    /// Full name of the tile store.
    pub fn tile_store_name(&self) -> String {
        self.tile_store.name()
    }

    /// Names of the stores this version owns. Everything else is stale.
    pub fn current_store_names(&self) -> [String; 2] {
        [self.shell_store_name(), self.tile_store_name()]
    }

    /// Parsed scope URL.
    pub fn scope_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.shell.scope).map_err(|_| ConfigError::InvalidScope(self.shell.scope.clone()))
    }

    /// Core asset paths resolved against the scope.
    pub fn core_asset_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let scope = self.scope_url()?;
        self.shell
            .core_assets
            .iter()
            .map(|path| {
                scope.join(path).map_err(|e| ConfigError::InvalidAsset {
                    path: path.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tiles.max_entries == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.tiles.headroom >= self.tiles.max_entries {
            return Err(ConfigError::HeadroomTooLarge {
                max_entries: self.tiles.max_entries,
                headroom: self.tiles.headroom,
            });
        }
        if self.shell_store_name() == self.tile_store_name() {
            return Err(ConfigError::DuplicateStoreName(self.shell_store_name()));
        }
        self.core_asset_urls()?;
        Ok(())
    }
}
