//! Storage backend traits.

use std::sync::Arc;

use async_trait::async_trait;
use tacmap_core::{RequestKey, Response};

use crate::error::CacheResult;

/// A named key-value store of responses.
///
/// Each operation is atomic on its own; nothing locks across operations,
/// so concurrent writers to the same key resolve as last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Name of this store.
    fn name(&self) -> &str;

    /// Look up a stored response.
    async fn get(&self, key: &RequestKey) -> CacheResult<Option<Response>>;

    /// Store a response, replacing any previous one for the key.
    async fn put(&self, key: RequestKey, response: Response) -> CacheResult<()>;

    /// Store a batch of responses. Either every entry is written or none is.
    async fn put_all(&self, entries: Vec<(RequestKey, Response)>) -> CacheResult<()>;

    /// Delete a stored response. Returns whether it existed.
    async fn delete(&self, key: &RequestKey) -> CacheResult<bool>;

    /// All keys, oldest insertion first.
    ///
    /// Replacing the response of an existing key does not move it.
    async fn keys(&self) -> CacheResult<Vec<RequestKey>>;

    /// Number of stored responses.
    async fn len(&self) -> CacheResult<usize>;

    /// Whether the store is empty.
    async fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len().await? == 0)
    }
}

/// The collection of named stores.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if it does not exist.
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheStore>>;

    /// Whether a store exists.
    async fn has(&self, name: &str) -> CacheResult<bool>;

    /// Delete a store and everything in it. Returns whether it existed.
    ///
    /// Handles opened earlier stay usable but are detached: the next `open`
    /// creates a fresh, empty store.
    async fn delete(&self, name: &str) -> CacheResult<bool>;

    /// Names of all stores, oldest first.
    async fn keys(&self) -> CacheResult<Vec<String>>;
}
