//! Scripted fetcher for development and testing.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tacmap_core::{Request, Response};

use crate::client::Fetcher;
use crate::error::FetchError;

/// What a scripted URL answers with.
#[derive(Debug, Clone)]
pub enum ScriptedRoute {
    /// Respond with this response.
    Respond(Response),
    /// Fail as if the network were unreachable.
    Offline,
    /// Never complete.
    Pending,
}

#[derive(Debug, Default)]
struct State {
    routes: HashMap<String, ScriptedRoute>,
    calls: HashMap<String, usize>,
    offline: bool,
}

/// In-memory fetcher answering from a table of routes keyed by URL.
///
/// Unknown URLs fail as offline. Every call is counted, which lets tests
/// assert that a cache hit never touched the network.
#[derive(Debug, Default)]
pub struct StaticFetcher {
    state: Mutex<State>,
}

impl StaticFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StaticFetcher::respond`].
    pub fn with_response(self, url: &str, response: Response) -> Self {
        self.respond(url, response);
        self
    }

    /// Answer `url` with `response`.
    pub fn respond(&self, url: &str, response: Response) {
        self.set_route(url, ScriptedRoute::Respond(response));
    }

    /// Make `url` fail as offline.
    pub fn fail(&self, url: &str) {
        self.set_route(url, ScriptedRoute::Offline);
    }

    /// Make `url` hang forever.
    pub fn hang(&self, url: &str) {
        self.set_route(url, ScriptedRoute::Pending);
    }

    /// Replace the route for `url`.
    pub fn set_route(&self, url: &str, route: ScriptedRoute) {
        self.lock().routes.insert(url.to_string(), route);
    }

    /// Take the whole network down (or bring it back), regardless of routes.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Number of fetches issued for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.lock().calls.get(url).copied().unwrap_or(0)
    }

    /// Number of fetches issued in total.
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.url.as_str();
        let route = {
            let mut state = self.lock();
            *state.calls.entry(url.to_string()).or_default() += 1;
            if state.offline {
                ScriptedRoute::Offline
            } else {
                state.routes.get(url).cloned().unwrap_or(ScriptedRoute::Offline)
            }
        };

        match route {
            ScriptedRoute::Respond(response) => Ok(response),
            ScriptedRoute::Offline => Err(FetchError::offline(url)),
            ScriptedRoute::Pending => futures::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn get(url: &str) -> Request {
        Request::get(url).unwrap()
    }

    #[tokio::test]
    async fn test_scripted_response() {
        let fetcher = StaticFetcher::new().with_response("https://a.test/x", Response::ok("x"));
        let resp = fetcher.fetch(&get("https://a.test/x")).await.unwrap();
        assert_eq!(resp.text(), "x");
        assert_eq!(fetcher.calls("https://a.test/x"), 1);
    }

    #[tokio::test]
    async fn test_unknown_url_is_offline() {
        let fetcher = StaticFetcher::new();
        let err = fetcher.fetch(&get("https://a.test/missing")).await.unwrap_err();
        assert_eq!(err, FetchError::offline("https://a.test/missing"));
    }

    #[tokio::test]
    async fn test_global_offline_switch() {
        let fetcher = StaticFetcher::new().with_response("https://a.test/x", Response::ok("x"));
        fetcher.set_offline(true);
        assert!(fetcher.fetch(&get("https://a.test/x")).await.is_err());
        fetcher.set_offline(false);
        assert!(fetcher.fetch(&get("https://a.test/x")).await.is_ok());
        assert_eq!(fetcher.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_error_statuses_are_responses() {
        let fetcher =
            StaticFetcher::new().with_response("https://a.test/x", Response::status(500));
        let resp = fetcher.fetch(&get("https://a.test/x")).await.unwrap();
        assert_eq!(resp.status, 500);
        assert!(!resp.is_ok());
    }

    #[test]
    fn test_pending_route_never_resolves() {
        let fetcher = StaticFetcher::new();
        fetcher.hang("https://a.test/slow");
        let req = get("https://a.test/slow");
        let mut fut = fetcher.fetch(&req);
        assert!((&mut fut).now_or_never().is_none());
        assert_eq!(fetcher.calls("https://a.test/slow"), 1);
    }
}
