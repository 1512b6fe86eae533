//! Fetch dispatch.
//!
//! Routing is a pure decision over the request; the cache managers apply
//! the effects.

use std::sync::Arc;

use tacmap_cache::{CacheStatus, Revalidation, ShellCache, TileCache};
use tacmap_core::{Request, Response};
use tacmap_net::Fetcher;
use tacmap_observability::{EventLogger, WorkerMetrics};
use tracing::debug;

use crate::classifier::{Classifier, RequestKind};
use crate::error::WorkerError;

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not handled; the host performs its default network behavior.
    Decline,
    /// Cache-first tile store.
    Tile,
    /// Straight to the network, never cached.
    Passthrough,
    /// Stale-while-revalidate shell store.
    Shell,
}

/// A handled request.
pub struct FetchOutcome {
    /// Category the request was classified as.
    pub kind: RequestKind,
    /// How the response was produced.
    pub status: CacheStatus,
    /// The response to serve.
    pub response: Response,
    /// Work to keep alive after the response is served.
    ///
    /// The refresh is lazy: its network request is only sent once the
    /// future is polled. Dropping it without polling cancels the refresh
    /// and the stored copy stays as it is.
    pub background: Option<Revalidation>,
}

impl FetchOutcome {
    fn new(kind: RequestKind, status: CacheStatus, response: Response) -> Self {
        Self {
            kind,
            status,
            response,
            background: None,
        }
    }

    /// Split into the response and its background work.
    ///
    /// The caller takes over driving `background`; see the field docs.
    pub fn into_parts(self) -> (Response, Option<Revalidation>) {
        (self.response, self.background)
    }

    /// Hand background work to the current tokio runtime and return the response.
    ///
    /// Outside a runtime the background work is dropped, which cancels the
    /// refresh before any request is sent.
    pub fn detach(self) -> Response {
        let (response, background) = self.into_parts();
        if let Some(task) = background {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(task);
                }
                Err(_) => EventLogger::new("fetch")
                    .warn_builder("no runtime to drive background revalidation, dropping it")
                    .field("status", response.status.to_string())
                    .emit(),
            }
        }
        response
    }
}

impl std::fmt::Debug for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOutcome")
            .field("kind", &self.kind)
            .field("status", &self.status)
            .field("response", &self.response)
            .field("background", &self.background.is_some())
            .finish()
    }
}

/// Routes intercepted requests to their caching policy.
pub struct Dispatcher {
    classifier: Classifier,
    tiles: Arc<TileCache>,
    shell: Arc<ShellCache>,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<WorkerMetrics>,
}

impl Dispatcher {
    /// Create a dispatcher over shared cache managers.
    pub fn new(
        classifier: Classifier,
        tiles: Arc<TileCache>,
        shell: Arc<ShellCache>,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<WorkerMetrics>,
    ) -> Self {
        Self {
            classifier,
            tiles,
            shell,
            fetcher,
            metrics,
        }
    }

    /// Classifier used to pick routes.
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Decide where a request goes without touching the store or network.
    ///
    /// Only GET requests are cacheable, everything else is declined.
    pub fn route(&self, request: &Request) -> Route {
        if !request.is_cacheable() {
            return Route::Decline;
        }

        match self.classifier.classify(&request.url) {
            RequestKind::Tile => Route::Tile,
            RequestKind::Signaling => Route::Passthrough,
            RequestKind::Shell => Route::Shell,
        }
    }

    /// Handle a request. `None` means the request was declined.
    pub async fn dispatch(&self, request: &Request) -> Result<Option<FetchOutcome>, WorkerError> {
        let route = self.route(request);
        debug!(id = %request.id, method = %request.method, url = %request.url, ?route, "dispatching");

        let result = match route {
            Route::Decline => {
                self.metrics.record_declined();
                return Ok(None);
            }
            Route::Tile => self.tile(request).await,
            Route::Passthrough => self.passthrough(request).await,
            Route::Shell => self.shell(request).await,
        };

        if result.is_err() {
            self.metrics.record_error();
        }
        result.map(Some)
    }

    async fn tile(&self, request: &Request) -> Result<FetchOutcome, WorkerError> {
        let fetched = self.tiles.fetch_tile(request).await?;
        match fetched.status {
            CacheStatus::Hit => self.metrics.record_tile_hit(),
            CacheStatus::Offline => self.metrics.record_offline(),
            _ => self.metrics.record_tile_miss(fetched.evicted),
        }
        Ok(FetchOutcome::new(RequestKind::Tile, fetched.status, fetched.response))
    }

    async fn passthrough(&self, request: &Request) -> Result<FetchOutcome, WorkerError> {
        let response = self.fetcher.fetch(request).await?;
        self.metrics.record_passthrough();
        Ok(FetchOutcome::new(RequestKind::Signaling, CacheStatus::Bypass, response))
    }

    async fn shell(&self, request: &Request) -> Result<FetchOutcome, WorkerError> {
        let fetched = self.shell.fetch_shell_asset(request).await?;
        match fetched.status {
            CacheStatus::Stale => self.metrics.record_shell_stale(),
            CacheStatus::Offline => self.metrics.record_offline(),
            _ => self.metrics.record_shell_miss(),
        }
        Ok(FetchOutcome {
            background: fetched.revalidation,
            ..FetchOutcome::new(RequestKind::Shell, fetched.status, fetched.response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use tacmap_cache::{CacheStorage, EvictionPolicy, MemoryCacheStorage};
    use tacmap_core::WorkerConfig;
    use tacmap_net::StaticFetcher;

    const TILE: &str = "https://tile.openstreetmap.org/5/10/12.png";
    const PAGE: &str = "http://localhost/tacmap-v8.html";
    const PEER: &str = "https://0.peerjs.com/peerjs/id";

    struct Harness {
        dispatcher: Dispatcher,
        storage: Arc<MemoryCacheStorage>,
        fetcher: Arc<StaticFetcher>,
        metrics: Arc<WorkerMetrics>,
    }

    fn harness() -> Harness {
        let config = WorkerConfig::default();
        let storage = Arc::new(MemoryCacheStorage::new());
        let fetcher = Arc::new(StaticFetcher::new());
        let metrics = Arc::new(WorkerMetrics::new());
        let tiles = Arc::new(TileCache::new(
            storage.clone(),
            fetcher.clone(),
            config.tile_store_name(),
            EvictionPolicy::from(&config.tiles),
        ));
        let shell = Arc::new(ShellCache::new(
            storage.clone(),
            fetcher.clone(),
            config.shell_store_name(),
            config.shell.offline_body.clone(),
        ));
        let dispatcher = Dispatcher::new(
            Classifier::new(&config).unwrap(),
            tiles,
            shell,
            fetcher.clone(),
            metrics.clone(),
        );
        Harness {
            dispatcher,
            storage,
            fetcher,
            metrics,
        }
    }

    #[test]
    fn test_route_is_pure() {
        let h = harness();
        let post = Request::new(http::Method::POST, url::Url::parse(PAGE).unwrap());

        assert_eq!(h.dispatcher.route(&Request::get(TILE).unwrap()), Route::Tile);
        assert_eq!(h.dispatcher.route(&Request::get(PEER).unwrap()), Route::Passthrough);
        assert_eq!(h.dispatcher.route(&Request::get(PAGE).unwrap()), Route::Shell);
        assert_eq!(h.dispatcher.route(&post), Route::Decline);
        assert_eq!(h.fetcher.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_get_is_declined() {
        let h = harness();
        let post = Request::new(http::Method::POST, url::Url::parse(TILE).unwrap());

        assert!(h.dispatcher.dispatch(&post).await.unwrap().is_none());
        assert_eq!(h.fetcher.total_calls(), 0);
        assert_eq!(h.metrics.snapshot().declined, 1);
    }

    #[tokio::test]
    async fn test_tile_miss_then_hit() {
        let h = harness();
        h.fetcher.respond(TILE, Response::ok("png"));

        let first = h.dispatcher.dispatch(&Request::get(TILE).unwrap()).await.unwrap().unwrap();
        assert_eq!(first.kind, RequestKind::Tile);
        assert_eq!(first.status, CacheStatus::Miss);

        let second = h.dispatcher.dispatch(&Request::get(TILE).unwrap()).await.unwrap().unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.response.text(), "png");
        assert_eq!(h.fetcher.calls(TILE), 1);

        let snap = h.metrics.snapshot();
        assert_eq!((snap.tile_hits, snap.tile_misses), (1, 1));
    }

    #[tokio::test]
    async fn test_signaling_is_never_cached() {
        let h = harness();
        h.fetcher.respond(PEER, Response::ok("id"));

        for _ in 0..2 {
            let outcome = h.dispatcher.dispatch(&Request::get(PEER).unwrap()).await.unwrap().unwrap();
            assert_eq!(outcome.status, CacheStatus::Bypass);
            assert_eq!(outcome.kind, RequestKind::Signaling);
        }
        assert_eq!(h.fetcher.calls(PEER), 2);
        assert!(h.storage.keys().await.unwrap().is_empty());
        assert_eq!(h.metrics.snapshot().passthroughs, 2);
    }

    #[tokio::test]
    async fn test_signaling_network_failure_is_error() {
        let h = harness();

        let err = h.dispatcher.dispatch(&Request::get(PEER).unwrap()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Network(_)));
        assert_eq!(h.metrics.snapshot().errors, 1);
    }

    #[tokio::test]
    async fn test_shell_stale_hands_back_background_work() {
        let h = harness();
        h.fetcher.respond(PAGE, Response::ok("v1"));
        h.dispatcher.dispatch(&Request::get(PAGE).unwrap()).await.unwrap();

        h.fetcher.respond(PAGE, Response::ok("v2"));
        let outcome = h.dispatcher.dispatch(&Request::get(PAGE).unwrap()).await.unwrap().unwrap();
        assert_eq!(outcome.status, CacheStatus::Stale);

        let (response, background) = outcome.into_parts();
        assert_eq!(response.text(), "v1");
        let refreshed = background.unwrap().await.unwrap();
        assert_eq!(refreshed.text(), "v2");
    }

    #[tokio::test]
    async fn test_detach_spawns_revalidation() {
        let h = harness();
        h.fetcher.respond(PAGE, Response::ok("v1"));
        h.dispatcher.dispatch(&Request::get(PAGE).unwrap()).await.unwrap();

        h.fetcher.respond(PAGE, Response::ok("v2"));
        let outcome = h.dispatcher.dispatch(&Request::get(PAGE).unwrap()).await.unwrap().unwrap();
        assert_eq!(outcome.detach().text(), "v1");

        for _ in 0..100 {
            if h.fetcher.calls(PAGE) == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(h.fetcher.calls(PAGE), 2);
    }

    #[tokio::test]
    async fn test_dropped_background_cancels_refresh() {
        let h = harness();
        h.fetcher.respond(PAGE, Response::ok("v1"));
        h.dispatcher.dispatch(&Request::get(PAGE).unwrap()).await.unwrap();

        h.fetcher.respond(PAGE, Response::ok("v2"));
        let outcome = h.dispatcher.dispatch(&Request::get(PAGE).unwrap()).await.unwrap().unwrap();
        let (response, background) = outcome.into_parts();
        drop(background);
        tokio::task::yield_now().await;

        assert_eq!(response.text(), "v1");
        assert_eq!(h.fetcher.calls(PAGE), 1);
    }

    #[test]
    fn test_detach_without_runtime_still_returns_response() {
        let outcome = FetchOutcome {
            background: Some(async { None }.boxed()),
            ..FetchOutcome::new(RequestKind::Shell, CacheStatus::Stale, Response::ok("cached"))
        };
        assert_eq!(outcome.detach().text(), "cached");
    }
}
