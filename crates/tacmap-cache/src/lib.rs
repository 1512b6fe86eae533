//! Caching policies for the TacMap offline worker.
//!
//! This crate provides:
//! - `CacheStorage` / `CacheStore` - Named key-value stores of responses
//! - `MemoryCacheStorage` - Insertion-ordered in-process storage
//! - `EvictionPolicy` - FIFO victim selection for the bounded tile store
//! - `TileCache` - Cache-first tile fetching with size-bounded eviction
//! - `ShellCache` - Stale-while-revalidate for application shell assets
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tacmap_cache::{MemoryCacheStorage, TileCache, EvictionPolicy};
//!
//! let storage = Arc::new(MemoryCacheStorage::new());
//! let tiles = TileCache::new(storage, fetcher, "tacmap-tiles-v1", EvictionPolicy::new(2000, 100));
//!
//! let outcome = tiles.fetch_tile(&request).await?;
//! ```

mod error;
mod eviction;
mod memory;
mod shell;
mod status;
mod store;
mod tile;

pub use error::*;
pub use eviction::*;
pub use memory::*;
pub use shell::*;
pub use status::*;
pub use store::*;
pub use tile::*;
