//! Stale-while-revalidate for application shell assets.

use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use tacmap_core::{Request, Response};
use tacmap_net::Fetcher;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CacheError, CacheResult};
use crate::status::CacheStatus;
use crate::store::CacheStorage;

/// Background network refresh of a shell asset.
///
/// Resolves to the network response, or `None` when the network was
/// unreachable. An ok response has already been written to the store by the
/// time it resolves. The host decides where to drive it.
pub type Revalidation = BoxFuture<'static, Option<Response>>;

/// Result of a shell asset fetch.
pub struct ShellFetch {
    /// The response to serve.
    pub response: Response,
    /// How it was produced.
    pub status: CacheStatus,
    /// Refresh still to be driven when a stale copy was served.
    pub revalidation: Option<Revalidation>,
}

impl std::fmt::Debug for ShellFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellFetch")
            .field("response", &self.response)
            .field("status", &self.status)
            .field("revalidation", &self.revalidation.is_some())
            .finish()
    }
}

/// Shell asset cache manager.
pub struct ShellCache {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    store_name: String,
    offline_body: String,
}

impl ShellCache {
    /// Create a new shell cache manager.
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        store_name: impl Into<String>,
        offline_body: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            store_name: store_name.into(),
            offline_body: offline_body.into(),
        }
    }

    /// Name of the shell store.
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Serve a shell asset, stale-while-revalidate.
    ///
    /// With a stored copy, that copy is returned at once and the network
    /// refresh is handed back undriven. Without one, the refresh is awaited
    /// and, if the network is unreachable, a `503` plain-text response is
    /// served instead.
    pub async fn fetch_shell_asset(&self, request: &Request) -> CacheResult<ShellFetch> {
        let store = self.storage.open(&self.store_name).await?;
        let cached = store.get(&request.key()).await?;
        let revalidation = self.revalidate(request.clone());

        if let Some(response) = cached {
            debug!(url = %request.url, "serving stale shell asset");
            return Ok(ShellFetch {
                response,
                status: CacheStatus::Stale,
                revalidation: Some(revalidation),
            });
        }

        match revalidation.await {
            Some(response) => Ok(ShellFetch {
                response,
                status: CacheStatus::Miss,
                revalidation: None,
            }),
            None => Ok(ShellFetch {
                response: Response::offline_shell(&self.offline_body),
                status: CacheStatus::Offline,
                revalidation: None,
            }),
        }
    }

    fn revalidate(&self, request: Request) -> Revalidation {
        let storage = Arc::clone(&self.storage);
        let fetcher = Arc::clone(&self.fetcher);
        let store_name = self.store_name.clone();

        async move {
            let response = match fetcher.fetch(&request).await {
                Ok(response) => response,
                Err(e) => {
                    debug!(url = %request.url, error = %e, "shell revalidation failed");
                    return None;
                }
            };

            if response.is_ok() {
                let stored = match storage.open(&store_name).await {
                    Ok(store) => store.put(request.key(), response.clone()).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = stored {
                    warn!(url = %request.url, error = %e, "failed to store revalidated shell asset");
                }
            }

            Some(response)
        }
        .boxed()
    }

    /// Fetch every URL and store all of them in one batch.
    ///
    /// Any network failure or non-ok status aborts the batch before anything
    /// is written, leaving the store exactly as it was.
    pub async fn precache(&self, urls: &[Url]) -> CacheResult<usize> {
        let fetches = urls.iter().map(|url| {
            let request = Request::new(http::Method::GET, url.clone());
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                let response = fetcher
                    .fetch(&request)
                    .await
                    .map_err(|e| CacheError::Precache {
                        url: request.url.to_string(),
                        reason: e.to_string(),
                    })?;
                if !response.is_ok() {
                    return Err(CacheError::Precache {
                        url: request.url.to_string(),
                        reason: format!("status {}", response.status),
                    });
                }
                Ok((request.key(), response))
            }
        });
        let entries = future::try_join_all(fetches).await?;

        let count = entries.len();
        let store = self.storage.open(&self.store_name).await?;
        store.put_all(entries).await?;
        info!(store = %self.store_name, count, "precached shell assets");
        Ok(count)
    }
}
