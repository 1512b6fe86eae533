//! Worker-level cache metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters shared by every handler of a worker.
#[derive(Debug, Default)]
pub struct WorkerMetrics {
    tile_hits: AtomicU64,
    tile_misses: AtomicU64,
    tiles_evicted: AtomicU64,
    shell_stale: AtomicU64,
    shell_misses: AtomicU64,
    offline_fallbacks: AtomicU64,
    passthroughs: AtomicU64,
    declined: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time copy of [`WorkerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Tiles served from the tile store.
    pub tile_hits: u64,
    /// Tiles fetched from the network.
    pub tile_misses: u64,
    /// Tiles removed by trimming.
    pub tiles_evicted: u64,
    /// Shell assets served from the store while revalidating.
    pub shell_stale: u64,
    /// Shell assets fetched from the network.
    pub shell_misses: u64,
    /// Synthetic offline responses served.
    pub offline_fallbacks: u64,
    /// Signaling requests passed straight to the network.
    pub passthroughs: u64,
    /// Requests left to the host.
    pub declined: u64,
    /// Handlers that ended in an error.
    pub errors: u64,
}

impl MetricsSnapshot {
    /// Share of tile requests answered from the store.
    pub fn tile_hit_ratio(&self) -> Option<f64> {
        let total = self.tile_hits + self.tile_misses;
        if total == 0 {
            None
        } else {
            Some(self.tile_hits as f64 / total as f64)
        }
    }
}

impl WorkerMetrics {
    /// Create zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a tile served from the store.
    pub fn record_tile_hit(&self) {
        self.tile_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a tile fetched from the network and the tiles its trim evicted.
    pub fn record_tile_miss(&self, evicted: usize) {
        self.tile_misses.fetch_add(1, Ordering::Relaxed);
        self.tiles_evicted.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    /// Count a shell asset served stale.
    pub fn record_shell_stale(&self) {
        self.shell_stale.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a shell asset fetched from the network.
    pub fn record_shell_miss(&self) {
        self.shell_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a synthetic offline response.
    pub fn record_offline(&self) {
        self.offline_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a signaling request passed through.
    pub fn record_passthrough(&self) {
        self.passthroughs.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a request left to the host.
    pub fn record_declined(&self) {
        self.declined.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a fetch handler that failed.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tile_hits: self.tile_hits.load(Ordering::Relaxed),
            tile_misses: self.tile_misses.load(Ordering::Relaxed),
            tiles_evicted: self.tiles_evicted.load(Ordering::Relaxed),
            shell_stale: self.shell_stale.load(Ordering::Relaxed),
            shell_misses: self.shell_misses.load(Ordering::Relaxed),
            offline_fallbacks: self.offline_fallbacks.load(Ordering::Relaxed),
            passthroughs: self.passthroughs.load(Ordering::Relaxed),
            declined: self.declined.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = WorkerMetrics::new();
        metrics.record_tile_hit();
        metrics.record_tile_hit();
        metrics.record_tile_miss(101);
        metrics.record_offline();

        let snap = metrics.snapshot();
        assert_eq!(snap.tile_hits, 2);
        assert_eq!(snap.tile_misses, 1);
        assert_eq!(snap.tiles_evicted, 101);
        assert_eq!(snap.offline_fallbacks, 1);
        assert_eq!(snap.errors, 0);
    }

    #[test]
    fn test_tile_hit_ratio() {
        assert_eq!(MetricsSnapshot::default().tile_hit_ratio(), None);

        let metrics = WorkerMetrics::new();
        metrics.record_tile_hit();
        metrics.record_tile_hit();
        metrics.record_tile_hit();
        metrics.record_tile_miss(0);
        assert_eq!(metrics.snapshot().tile_hit_ratio(), Some(0.75));
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = WorkerMetrics::new();
        metrics.record_passthrough();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["passthroughs"], 1);
    }
}
