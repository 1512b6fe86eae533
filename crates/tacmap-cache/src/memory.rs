//! In-process storage backend.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tacmap_core::{RequestKey, Response};

use crate::error::{CacheError, CacheResult};
use crate::store::{CacheStorage, CacheStore};

#[derive(Debug, Default)]
struct Entries {
    responses: HashMap<RequestKey, Response>,
    /// Insertion order of `responses`, oldest first.
    order: VecDeque<RequestKey>,
}

impl Entries {
    fn insert(&mut self, key: RequestKey, response: Response) {
        if self.responses.insert(key.clone(), response).is_none() {
            self.order.push_back(key);
        }
    }

    fn remove(&mut self, key: &RequestKey) -> bool {
        if self.responses.remove(key).is_none() {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        true
    }
}

/// An in-memory store that tracks insertion order explicitly.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    quota: Option<usize>,
    entries: Mutex<Entries>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quota: None,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Limit the number of entries; writes beyond it fail.
    pub fn with_quota(mut self, quota: usize) -> Self {
        self.quota = Some(quota);
        self
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Entries>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Storage(format!("store '{}' lock poisoned", self.name)))
    }

    fn check_quota(&self, current: usize, added: usize) -> CacheResult<()> {
        match self.quota {
            Some(limit) if current + added > limit => Err(CacheError::QuotaExceeded {
                store: self.name.clone(),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &RequestKey) -> CacheResult<Option<Response>> {
        Ok(self.lock()?.responses.get(key).cloned())
    }

    async fn put(&self, key: RequestKey, response: Response) -> CacheResult<()> {
        let mut entries = self.lock()?;
        if !entries.responses.contains_key(&key) {
            self.check_quota(entries.responses.len(), 1)?;
        }
        entries.insert(key, response);
        Ok(())
    }

    async fn put_all(&self, batch: Vec<(RequestKey, Response)>) -> CacheResult<()> {
        let mut entries = self.lock()?;
        let mut new_keys: Vec<&RequestKey> = batch
            .iter()
            .map(|(k, _)| k)
            .filter(|k| !entries.responses.contains_key(*k))
            .collect();
        new_keys.sort();
        new_keys.dedup();
        self.check_quota(entries.responses.len(), new_keys.len())?;

        for (key, response) in batch {
            entries.insert(key, response);
        }
        Ok(())
    }

    async fn delete(&self, key: &RequestKey) -> CacheResult<bool> {
        Ok(self.lock()?.remove(key))
    }

    async fn keys(&self) -> CacheResult<Vec<RequestKey>> {
        Ok(self.lock()?.order.iter().cloned().collect())
    }

    async fn len(&self) -> CacheResult<usize> {
        Ok(self.lock()?.responses.len())
    }
}

/// In-memory collection of named stores.
///
/// Survives for as long as the value lives; hosts that need persistence
/// across restarts supply their own [`CacheStorage`].
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    stores: Mutex<Vec<Arc<MemoryStore>>>,
    store_quota: Option<usize>,
}

impl MemoryCacheStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Give every store created from now on an entry quota.
    pub fn with_store_quota(mut self, quota: usize) -> Self {
        self.store_quota = Some(quota);
        self
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Vec<Arc<MemoryStore>>>> {
        self.stores
            .lock()
            .map_err(|_| CacheError::Storage("storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> CacheResult<Arc<dyn CacheStore>> {
        let mut stores = self.lock()?;
        if let Some(store) = stores.iter().find(|s| s.name == name) {
            return Ok(store.clone());
        }

        let mut store = MemoryStore::new(name);
        if let Some(quota) = self.store_quota {
            store = store.with_quota(quota);
        }
        let store = Arc::new(store);
        stores.push(store.clone());
        Ok(store)
    }

    async fn has(&self, name: &str) -> CacheResult<bool> {
        Ok(self.lock()?.iter().any(|s| s.name == name))
    }

    async fn delete(&self, name: &str) -> CacheResult<bool> {
        let mut stores = self.lock()?;
        let before = stores.len();
        stores.retain(|s| s.name != name);
        Ok(stores.len() != before)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.lock()?.iter().map(|s| s.name.clone()).collect())
    }
}
