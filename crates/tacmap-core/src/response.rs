//! Response records.

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::context::Headers;

/// Status text of the synthetic tile response served while offline.
pub const OFFLINE_STATUS_TEXT: &str = "Offline";

/// A response, either fetched from the network or read back from a store.
///
/// Responses are never mutated once stored; a fresh fetch replaces the
/// stored record instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// The HTTP status code.
    pub status: u16,
    /// The status line text.
    pub status_text: String,
    /// The response headers.
    #[serde(default)]
    pub headers: Headers,
    /// The response body.
    #[serde(default)]
    pub body: Vec<u8>,
}

impl Response {
    /// Create a new response with the canonical status text.
    pub fn new(status: u16, headers: Headers, body: Vec<u8>) -> Self {
        Self {
            status,
            status_text: canonical_reason(status).to_string(),
            headers,
            body,
        }
    }

    /// Create a `200 OK` response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::OK.as_u16(), Headers::new(), body.into())
    }

    /// Create an empty response with the given status.
    pub fn status(status: u16) -> Self {
        Self::new(status, Headers::new(), Vec::new())
    }

    /// Synthetic empty `404 Offline` response for a tile that is neither
    /// cached nor reachable. Renderers draw it as a blank tile.
    pub fn offline_tile() -> Self {
        Self::status(StatusCode::NOT_FOUND.as_u16()).with_status_text(OFFLINE_STATUS_TEXT)
    }

    /// Synthetic `503` plain-text response for a shell asset that is neither
    /// cached nor reachable.
    pub fn offline_shell(message: &str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            Headers::new(),
            message.as_bytes().to_vec(),
        )
        .with_header("Content-Type", "text/plain")
    }

    /// Override the status text.
    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Whether the response counts as "ok" (2xx) for caching purposes.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Get the body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn canonical_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_is_ok() {
        assert!(Response::status(200).is_ok());
        assert!(Response::status(204).is_ok());
        assert!(Response::status(299).is_ok());
        assert!(!Response::status(199).is_ok());
        assert!(!Response::status(304).is_ok());
        assert!(!Response::status(404).is_ok());
    }

    #[test]
    fn test_canonical_status_text() {
        assert_eq!(Response::ok("x").status_text, "OK");
        assert_eq!(Response::status(503).status_text, "Service Unavailable");
        assert_eq!(Response::status(599).status_text, "");
    }

    #[test]
    fn test_offline_tile() {
        let resp = Response::offline_tile();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.status_text, "Offline");
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_offline_shell() {
        let resp = Response::offline_shell("TacMap is offline");
        assert_eq!(resp.status, 503);
        assert_eq!(resp.content_type(), Some("text/plain"));
        assert_eq!(resp.text(), "TacMap is offline");
    }

    #[test]
    fn test_json_roundtrip_keeps_headers() {
        let resp = Response::ok("body").with_header("ETag", "\"abc\"");
        let json = serde_json::to_string(&resp).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resp);
        assert_eq!(back.header("etag"), Some("\"abc\""));
    }
}
