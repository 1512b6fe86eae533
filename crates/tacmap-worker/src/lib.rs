//! Request dispatch and lifecycle control for the TacMap offline worker.
//!
//! This crate provides:
//! - `Classifier` - Labels each request as tile, signaling or shell
//! - `Dispatcher` - Routes a labelled request to its caching policy
//! - `LifecycleController` - Install, activate and control messages
//! - `ClientRegistry` - Pages controlled by the worker
//! - `ServiceWorker` - Everything above behind one handle
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tacmap_worker::prelude::*;
//!
//! let worker = ServiceWorker::new(
//!     WorkerConfig::default(),
//!     Arc::new(MemoryCacheStorage::new()),
//!     Arc::new(HttpFetcher::new()),
//! )?;
//! worker.register().await?;
//!
//! if let Some(outcome) = worker.handle_fetch(Request::get(url)?).await? {
//!     respond(outcome.detach());
//! }
//! ```

mod classifier;
mod clients;
mod dispatcher;
mod error;
mod lifecycle;
mod worker;

pub use classifier::*;
pub use clients::*;
pub use dispatcher::*;
pub use error::*;
pub use lifecycle::*;
pub use worker::*;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ActivationReport, Classifier, ClientId, ClientRegistry, Dispatcher, FetchOutcome,
        LifecycleController, MessageOutcome, RequestKind, Route, ServiceWorker, WorkerError,
    };
    pub use tacmap_cache::{CacheStatus, CacheStorage, MemoryCacheStorage};
    pub use tacmap_core::{ControlMessage, Request, Response, WorkerConfig, WorkerState};
    pub use tacmap_net::{Fetcher, HttpFetcher, StaticFetcher};
}
