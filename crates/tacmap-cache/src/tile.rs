//! Cache-first tile fetching with size-bounded eviction.

use std::sync::Arc;

use tacmap_core::{Request, Response};
use tacmap_net::Fetcher;
use tracing::{debug, info};

use crate::error::CacheResult;
use crate::eviction::EvictionPolicy;
use crate::status::CacheStatus;
use crate::store::{CacheStorage, CacheStore};

/// Result of a tile fetch.
#[derive(Debug, Clone)]
pub struct TileFetch {
    /// The response to hand to the renderer.
    pub response: Response,
    /// How it was produced.
    pub status: CacheStatus,
    /// Tiles evicted by the trim that followed a store.
    pub evicted: usize,
}

/// Tile cache manager.
///
/// Tiles are treated as immutable: once stored, a tile is served from the
/// store with no freshness check until it is evicted or the store is purged.
pub struct TileCache {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    store_name: String,
    policy: EvictionPolicy,
}

impl TileCache {
    /// Create a new tile cache manager.
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
        store_name: impl Into<String>,
        policy: EvictionPolicy,
    ) -> Self {
        Self {
            storage,
            fetcher,
            store_name: store_name.into(),
            policy,
        }
    }

    /// Name of the tile store.
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Eviction policy in force.
    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Serve a tile from the store, falling back to the network on a miss.
    ///
    /// A network failure yields an empty `404 Offline` response rather than
    /// an error. Storage failures are returned as errors.
    pub async fn fetch_tile(&self, request: &Request) -> CacheResult<TileFetch> {
        let store = self.storage.open(&self.store_name).await?;
        let key = request.key();

        if let Some(cached) = store.get(&key).await? {
            debug!(url = %request.url, "tile cache hit");
            return Ok(TileFetch {
                response: cached,
                status: CacheStatus::Hit,
                evicted: 0,
            });
        }

        let response = match self.fetcher.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %request.url, error = %e, "tile unavailable offline");
                return Ok(TileFetch {
                    response: Response::offline_tile(),
                    status: CacheStatus::Offline,
                    evicted: 0,
                });
            }
        };

        let mut evicted = 0;
        if response.is_ok() {
            store.put(key, response.clone()).await?;
            evicted = self.trim(store.as_ref()).await?;
        } else {
            debug!(url = %request.url, status = response.status, "tile not cached");
        }

        Ok(TileFetch {
            response,
            status: CacheStatus::Miss,
            evicted,
        })
    }

    /// Trim the tile store down to the policy's target if it is over the ceiling.
    pub async fn trim_tile_cache(&self) -> CacheResult<usize> {
        let store = self.storage.open(&self.store_name).await?;
        self.trim(store.as_ref()).await
    }

    async fn trim(&self, store: &dyn CacheStore) -> CacheResult<usize> {
        let keys = store.keys().await?;
        let victims = self.policy.victims(&keys);
        if victims.is_empty() {
            return Ok(0);
        }

        for key in victims {
            store.delete(key).await?;
        }
        info!(
            store = %self.store_name,
            evicted = victims.len(),
            remaining = keys.len() - victims.len(),
            "trimmed tile cache"
        );
        Ok(victims.len())
    }

    /// Delete the whole tile store. Returns whether it existed.
    pub async fn clear(&self) -> CacheResult<bool> {
        let existed = self.storage.delete(&self.store_name).await?;
        info!(store = %self.store_name, existed, "cleared tile cache");
        Ok(existed)
    }

    /// Number of stored tiles.
    pub async fn len(&self) -> CacheResult<usize> {
        if !self.storage.has(&self.store_name).await? {
            return Ok(0);
        }
        self.storage.open(&self.store_name).await?.len().await
    }
}
