//! Request classification.

use regex::Regex;
use tacmap_core::{ConfigError, WorkerConfig};
use url::Url;

/// Category of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Map tile imagery: cache-first, bounded store.
    Tile,
    /// Real-time signaling: never cached.
    Signaling,
    /// Application shell and anything else: stale-while-revalidate.
    Shell,
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tile => write!(f, "tile"),
            Self::Signaling => write!(f, "signaling"),
            Self::Shell => write!(f, "shell"),
        }
    }
}

/// Pure URL classifier.
///
/// Tile detection is deliberately loose: besides the known tile hosts, any
/// path containing three consecutive numeric segments (`/z/x/y`) counts as
/// a tile, whatever the host.
#[derive(Debug, Clone)]
pub struct Classifier {
    tile_hosts: Vec<String>,
    tile_path: Regex,
    signaling_hosts: Vec<String>,
    signaling_paths: Vec<String>,
}

impl Classifier {
    /// Build a classifier from configuration.
    pub fn new(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let tile_path = Regex::new(&config.tiles.path_pattern)
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            tile_hosts: lowercase(&config.tiles.hosts),
            tile_path,
            signaling_hosts: lowercase(&config.signaling.host_tokens),
            signaling_paths: config.signaling.path_tokens.clone(),
        })
    }

    /// Classify a URL. Tile wins over signaling.
    pub fn classify(&self, url: &Url) -> RequestKind {
        if self.is_tile(url) {
            RequestKind::Tile
        } else if self.is_signaling(url) {
            RequestKind::Signaling
        } else {
            RequestKind::Shell
        }
    }

    /// Whether the URL points at a tile.
    pub fn is_tile(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("");
        self.tile_hosts.iter().any(|h| host.contains(h.as_str()))
            || self.tile_path.is_match(url.path())
    }

    /// Whether the URL belongs to the signaling service.
    pub fn is_signaling(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("");
        let path = url.path();
        self.signaling_hosts.iter().any(|t| host.contains(t.as_str()))
            || self.signaling_paths.iter().any(|t| path.contains(t.as_str()))
    }
}

fn lowercase(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(url: &str) -> RequestKind {
        let classifier = Classifier::new(&WorkerConfig::default()).unwrap();
        classifier.classify(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_known_tile_hosts() {
        assert_eq!(classify("https://tile.openstreetmap.org/3/4/2.png"), RequestKind::Tile);
        assert_eq!(classify("https://a.tile.openstreetmap.org/x.png"), RequestKind::Tile);
        assert_eq!(classify("https://mt2.google.com/vt/lyrs=s&x=1&y=2&z=3"), RequestKind::Tile);
        assert_eq!(
            classify("https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer"),
            RequestKind::Tile
        );
    }

    #[test]
    fn test_zxy_path_on_unknown_host_is_tile() {
        assert_eq!(classify("https://tiles.example.net/14/8190/5447.png"), RequestKind::Tile);
        assert_eq!(classify("http://localhost/api/1/2/3"), RequestKind::Tile);
    }

    #[test]
    fn test_two_numeric_segments_are_not_a_tile() {
        assert_eq!(classify("https://example.net/14/8190.png"), RequestKind::Shell);
        assert_eq!(classify("https://example.net/14/a/3"), RequestKind::Shell);
    }

    #[test]
    fn test_signaling_by_host_and_path() {
        assert_eq!(classify("https://0.peerjs.com/peerjs/id"), RequestKind::Signaling);
        assert_eq!(classify("https://relay.example.com/peer/offer"), RequestKind::Signaling);
    }

    #[test]
    fn test_tile_takes_precedence_over_signaling() {
        assert_eq!(classify("https://0.peerjs.com/1/2/3"), RequestKind::Tile);
    }

    #[test]
    fn test_everything_else_is_shell() {
        assert_eq!(classify("http://localhost/"), RequestKind::Shell);
        assert_eq!(classify("http://localhost/tacmap-v8.html"), RequestKind::Shell);
        assert_eq!(classify("http://localhost/manifest.json"), RequestKind::Shell);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let mut config = WorkerConfig::default();
        config.tiles.path_pattern = "(".to_string();
        assert!(matches!(
            Classifier::new(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_custom_host_list() {
        let mut config = WorkerConfig::default();
        config.tiles.hosts = vec!["Tiles.Internal".to_string()];
        let classifier = Classifier::new(&config).unwrap();
        let url = Url::parse("https://tiles.internal/world.png").unwrap();
        assert_eq!(classifier.classify(&url), RequestKind::Tile);
    }
}
