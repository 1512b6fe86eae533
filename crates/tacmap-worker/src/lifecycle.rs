//! Install, activate and control-message handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future;
use tacmap_cache::{CacheStorage, ShellCache, TileCache};
use tacmap_core::{ControlMessage, WorkerState};
use tacmap_observability::{EventLogger, LogFormat};
use tracing::debug;
use url::Url;

use crate::clients::ClientRegistry;
use crate::error::WorkerError;

/// What activation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Stores deleted because they belong to no current version.
    pub deleted: Vec<String>,
    /// Pages that switched to this worker.
    pub claimed: usize,
}

/// Result of a control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Not a recognised command.
    Ignored,
    /// Skip-waiting recorded; activation happens once installed.
    SkipWaitingRequested,
    /// The worker was waiting and activated immediately.
    Activated(ActivationReport),
    /// The tile store was deleted.
    TileCacheCleared { existed: bool },
}

/// Drives the worker through its lifecycle.
///
/// The state lock is only held for transitions, never across an await.
/// Once activated, the worker keeps serving through later installs: a
/// re-install moves the state to `Installing` and `Waiting` again, but the
/// stores activated earlier stay in charge until the next activation.
pub struct LifecycleController {
    storage: Arc<dyn CacheStorage>,
    shell: Arc<ShellCache>,
    tiles: Arc<TileCache>,
    clients: Arc<ClientRegistry>,
    core_assets: Vec<Url>,
    state: Mutex<WorkerState>,
    skip_waiting: AtomicBool,
    serving: AtomicBool,
    log_format: LogFormat,
}

impl LifecycleController {
    /// Create a controller for an uninstalled worker.
    pub fn new(
        storage: Arc<dyn CacheStorage>,
        shell: Arc<ShellCache>,
        tiles: Arc<TileCache>,
        clients: Arc<ClientRegistry>,
        core_assets: Vec<Url>,
    ) -> Self {
        Self {
            storage,
            shell,
            tiles,
            clients,
            core_assets,
            state: Mutex::new(WorkerState::Uninstalled),
            skip_waiting: AtomicBool::new(false),
            serving: AtomicBool::new(false),
            log_format: LogFormat::default(),
        }
    }

    /// Set the format of lifecycle event logs.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        *self.lock()
    }

    /// Version string of this worker, the shell store name.
    pub fn version(&self) -> &str {
        self.shell.store_name()
    }

    /// Whether skip-waiting has been requested.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Whether fetches are intercepted: true from the first activation on,
    /// including while a re-install is running or waiting.
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::SeqCst)
    }

    /// Whether the worker is installed and allowed to activate now.
    pub fn should_activate(&self) -> bool {
        self.state() == WorkerState::Waiting && self.skip_waiting_requested()
    }

    /// Precache the core assets and move to `Waiting`.
    ///
    /// The precache is all-or-nothing. On failure the worker returns to the
    /// state it was in, with every store untouched. On success skip-waiting
    /// is requested so the host can activate without waiting for old pages
    /// to close.
    pub async fn install(&self) -> Result<usize, WorkerError> {
        let previous = {
            let mut state = self.lock();
            match *state {
                WorkerState::Uninstalled | WorkerState::Active => {}
                from => return Err(WorkerError::InvalidTransition { from, event: "install" }),
            }
            std::mem::replace(&mut *state, WorkerState::Installing)
        };

        let logger = self.logger("install");
        match self.shell.precache(&self.core_assets).await {
            Ok(count) => {
                *self.lock() = WorkerState::Waiting;
                self.skip_waiting.store(true, Ordering::SeqCst);
                logger
                    .info_builder("precached core assets")
                    .field_u64("count", count as u64)
                    .field("store", self.version())
                    .emit();
                Ok(count)
            }
            Err(e) => {
                *self.lock() = previous;
                logger
                    .error_builder("install failed")
                    .field("error", e.to_string())
                    .field("restored", previous.to_string())
                    .emit();
                Err(WorkerError::Install(e))
            }
        }
    }

    /// Delete stale stores, claim every open page and move to `Active`.
    pub async fn activate(&self) -> Result<ActivationReport, WorkerError> {
        let from = self.state();
        if from != WorkerState::Waiting {
            return Err(WorkerError::InvalidTransition { from, event: "activate" });
        }

        let logger = self.logger("activate");
        let current = [self.shell.store_name(), self.tiles.store_name()];
        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| !current.contains(&name.as_str()))
            .collect();

        let results = future::try_join_all(stale.iter().map(|name| self.storage.delete(name))).await?;
        let deleted: Vec<String> = stale
            .into_iter()
            .zip(results)
            .filter_map(|(name, existed)| existed.then_some(name))
            .collect();

        let claimed = self.clients.claim(self.version());
        *self.lock() = WorkerState::Active;
        self.serving.store(true, Ordering::SeqCst);

        logger
            .info_builder("activated")
            .field_list("deleted", &deleted)
            .field_u64("claimed", claimed as u64)
            .emit();
        Ok(ActivationReport { deleted, claimed })
    }

    /// Handle a raw message from a page.
    pub async fn handle_message(&self, data: &str) -> Result<MessageOutcome, WorkerError> {
        let Some(message) = ControlMessage::parse(data) else {
            debug!(data, "ignoring unknown control message");
            return Ok(MessageOutcome::Ignored);
        };

        let logger = self.logger("message");
        logger.info_builder("control message").field("command", message.as_str()).emit();

        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                if self.state() == WorkerState::Waiting {
                    Ok(MessageOutcome::Activated(self.activate().await?))
                } else {
                    Ok(MessageOutcome::SkipWaitingRequested)
                }
            }
            ControlMessage::ClearTileCache => {
                let existed = self.tiles.clear().await?;
                Ok(MessageOutcome::TileCacheCleared { existed })
            }
        }
    }

    fn logger(&self, event: &str) -> EventLogger {
        EventLogger::new(event)
            .with_version(self.version())
            .with_format(self.log_format)
    }

    fn lock(&self) -> MutexGuard<'_, WorkerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
