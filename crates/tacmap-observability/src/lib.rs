//! Observability for the TacMap offline worker.
//!
//! This crate provides:
//! - `EventLogger` - Structured logging with per-event context over `tracing`
//! - `WorkerMetrics` - Cache hit/miss/eviction counters
//! - `init_tracing` - Subscriber setup for native hosts

mod logging;
mod metrics;

pub use logging::*;
pub use metrics::*;

// Re-export RequestId from tacmap-core for convenience
pub use tacmap_core::RequestId;
