//! The worker as the host sees it.

use std::sync::Arc;

use tacmap_cache::{CacheStorage, EvictionPolicy, ShellCache, TileCache};
use tacmap_core::{Request, WorkerConfig, WorkerState};
use tacmap_net::Fetcher;
use tacmap_observability::{EventLogger, LogFormat, MetricsSnapshot, WorkerMetrics};
use tracing::debug;

use crate::classifier::Classifier;
use crate::clients::ClientRegistry;
use crate::dispatcher::{Dispatcher, FetchOutcome};
use crate::error::WorkerError;
use crate::lifecycle::{ActivationReport, LifecycleController, MessageOutcome};

/// One worker version: configuration, stores, network and lifecycle.
///
/// The host forwards its install, activate, fetch and message events to the
/// matching methods. Every method takes `&self`, so a worker can be shared
/// behind an `Arc` between concurrently running handlers.
pub struct ServiceWorker {
    config: WorkerConfig,
    dispatcher: Dispatcher,
    lifecycle: LifecycleController,
    clients: Arc<ClientRegistry>,
    metrics: Arc<WorkerMetrics>,
    log_format: LogFormat,
}

impl ServiceWorker {
    /// Build a worker. Fails if the configuration is invalid.
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, WorkerError> {
        config.validate()?;

        let classifier = Classifier::new(&config)?;
        let core_assets = config.core_asset_urls()?;
        let metrics = Arc::new(WorkerMetrics::new());
        let clients = Arc::new(ClientRegistry::new());

        let tiles = Arc::new(TileCache::new(
            Arc::clone(&storage),
            Arc::clone(&fetcher),
            config.tile_store_name(),
            EvictionPolicy::from(&config.tiles),
        ));
        let shell = Arc::new(ShellCache::new(
            Arc::clone(&storage),
            Arc::clone(&fetcher),
            config.shell_store_name(),
            config.shell.offline_body.clone(),
        ));

        let dispatcher = Dispatcher::new(
            classifier,
            Arc::clone(&tiles),
            Arc::clone(&shell),
            fetcher,
            Arc::clone(&metrics),
        );
        let lifecycle =
            LifecycleController::new(storage, shell, tiles, Arc::clone(&clients), core_assets);

        Ok(Self {
            config,
            dispatcher,
            lifecycle,
            clients,
            metrics,
            log_format: LogFormat::default(),
        })
    }

    /// Set the format of event logs. JSON by default; hosts writing to a
    /// terminal usually want [`LogFormat::Human`].
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.lifecycle = self.lifecycle.with_log_format(format);
        self.log_format = format;
        self
    }

    /// Install, then activate straight away if skip-waiting allows it.
    pub async fn register(&self) -> Result<WorkerState, WorkerError> {
        self.lifecycle.install().await?;
        if self.lifecycle.should_activate() {
            self.lifecycle.activate().await?;
        }
        Ok(self.state())
    }

    /// Handle the install event.
    pub async fn install(&self) -> Result<usize, WorkerError> {
        self.lifecycle.install().await
    }

    /// Handle the activate event.
    pub async fn activate(&self) -> Result<ActivationReport, WorkerError> {
        self.lifecycle.activate().await
    }

    /// Handle a fetch event. `None` leaves the request to the host.
    ///
    /// Requests are intercepted once the worker has been activated, and keep
    /// being intercepted while a later re-install runs.
    pub async fn handle_fetch(&self, request: Request) -> Result<Option<FetchOutcome>, WorkerError> {
        if !self.lifecycle.is_serving() {
            let state = self.state();
            debug!(url = %request.url, %state, "worker not activated, declining");
            self.metrics.record_declined();
            return Ok(None);
        }

        let result = self.dispatcher.dispatch(&request).await;
        if let Err(e) = &result {
            EventLogger::with_id(request.id.clone(), "fetch")
                .with_version(self.lifecycle.version())
                .with_format(self.log_format)
                .error_builder("fetch handler failed")
                .field("url", request.url.as_str())
                .field("error", e.to_string())
                .emit();
        }
        result
    }

    /// Handle a message event.
    pub async fn handle_message(&self, data: &str) -> Result<MessageOutcome, WorkerError> {
        self.lifecycle.handle_message(data).await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    /// Version string, the shell store name.
    pub fn version(&self) -> &str {
        self.lifecycle.version()
    }

    /// Configuration the worker was built with.
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Pages known to the worker.
    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    /// Fetch dispatcher, for routing decisions without I/O.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Snapshot of the worker's counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
