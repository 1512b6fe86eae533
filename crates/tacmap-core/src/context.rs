//! Intercepted requests and their cache identity.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

/// HTTP headers, keyed by name as received.
pub type Headers = BTreeMap<String, String>;

/// Error raised when a request cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Unique identifier for a handled event, used to correlate log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(pub String);

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = NEXT_REQUEST.fetch_add(1, Ordering::Relaxed);
        Self(format!("{:x}-{:x}", nanos, seq))
    }

    /// Create from an existing ID string.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a request inside a cache store: method plus full URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    /// Create a key for an arbitrary method.
    pub fn new(method: &Method, url: &Url) -> Self {
        Self {
            method: method.as_str().to_string(),
            url: url.as_str().to_string(),
        }
    }

    /// Create a GET key from an already-parsed URL.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }

    /// The request method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The full request URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for RequestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A request delivered by the host's interception facility.
#[derive(Debug, Clone)]
pub struct Request {
    /// Correlation ID for this request.
    pub id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: Headers,
}

impl Request {
    /// Create a new request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            id: RequestId::generate(),
            method,
            url,
            headers: Headers::new(),
        }
    }

    /// Parse `url` and create a GET request for it.
    pub fn get(url: &str) -> Result<Self, RequestError> {
        let parsed = Url::parse(url).map_err(|e| RequestError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(Method::GET, parsed))
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Cache identity of this request.
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    /// Whether this request may be stored in a cache.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }

    /// Host part of the URL, empty when the URL has none.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    /// Path part of the URL.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_get_parses_url() {
        let req = Request::get("https://tile.openstreetmap.org/3/4/2.png").unwrap();
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.host(), "tile.openstreetmap.org");
        assert_eq!(req.path(), "/3/4/2.png");
    }

    #[test]
    fn test_request_get_rejects_relative_url() {
        let err = Request::get("/manifest.json").unwrap_err();
        assert!(matches!(err, RequestError::InvalidUrl { .. }));
    }

    #[test]
    fn test_request_key_ignores_headers() {
        let a = Request::get("https://example.com/a").unwrap();
        let b = Request::get("https://example.com/a")
            .unwrap()
            .with_header("Accept", "image/png");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_request_key_includes_method() {
        let url = Url::parse("https://example.com/a").unwrap();
        assert_ne!(RequestKey::get(&url), RequestKey::new(&Method::POST, &url));
    }

    #[test]
    fn test_request_key_display() {
        let url = Url::parse("https://example.com/a").unwrap();
        assert_eq!(RequestKey::get(&url).to_string(), "GET https://example.com/a");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = Request::get("https://example.com/")
            .unwrap()
            .with_header("Content-Type", "text/html");
        assert_eq!(req.header("content-type"), Some("text/html"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn test_only_get_is_cacheable() {
        let url = Url::parse("https://example.com/").unwrap();
        assert!(Request::new(Method::GET, url.clone()).is_cacheable());
        assert!(!Request::new(Method::POST, url).is_cacheable());
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::generate(), RequestId::generate());
    }
}
