//! Size-bounded eviction for the tile store.

use serde::{Deserialize, Serialize};
use tacmap_core::TileConfig;

/// FIFO eviction policy.
///
/// Once a store holds more than `max_entries` keys, the oldest-inserted keys
/// are removed until `max_entries - headroom` remain. Reads never refresh a
/// key's position, so this is first-in-first-out and not LRU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionPolicy {
    /// Ceiling that triggers a trim.
    pub max_entries: usize,
    /// How far below the ceiling a trim goes.
    pub headroom: usize,
}

impl EvictionPolicy {
    /// Create a new policy.
    pub fn new(max_entries: usize, headroom: usize) -> Self {
        Self {
            max_entries,
            headroom,
        }
    }

    /// Number of keys a trim leaves behind.
    pub fn target(&self) -> usize {
        self.max_entries.saturating_sub(self.headroom)
    }

    /// How many of `count` keys must go.
    pub fn excess(&self, count: usize) -> usize {
        if count > self.max_entries {
            (count - self.max_entries + self.headroom).min(count)
        } else {
            0
        }
    }

    /// Pick the keys to delete from `keys`, which must be ordered oldest first.
    pub fn victims<'a, K>(&self, keys: &'a [K]) -> &'a [K] {
        &keys[..self.excess(keys.len())]
    }
}

impl From<&TileConfig> for EvictionPolicy {
    fn from(config: &TileConfig) -> Self {
        Self::new(config.max_entries, config.headroom)
    }
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self::from(&TileConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_eviction_at_or_below_ceiling() {
        let policy = EvictionPolicy::new(2000, 100);
        assert_eq!(policy.excess(0), 0);
        assert_eq!(policy.excess(1999), 0);
        assert_eq!(policy.excess(2000), 0);
    }

    #[test]
    fn test_eviction_goes_below_ceiling_by_headroom() {
        let policy = EvictionPolicy::new(2000, 100);
        assert_eq!(policy.excess(2001), 101);
        assert_eq!(2001 - policy.excess(2001), policy.target());
        assert_eq!(policy.excess(2500), 600);
    }

    #[test]
    fn test_victims_are_oldest_first() {
        let policy = EvictionPolicy::new(3, 1);
        let keys = ["a", "b", "c", "d"];
        assert_eq!(policy.victims(&keys), &["a", "b"]);
    }

    #[test]
    fn test_zero_headroom() {
        let policy = EvictionPolicy::new(3, 0);
        let keys = [1, 2, 3, 4, 5];
        assert_eq!(policy.victims(&keys), &[1, 2]);
    }

    #[test]
    fn test_default_matches_tile_config() {
        let policy = EvictionPolicy::default();
        assert_eq!(policy.max_entries, 2000);
        assert_eq!(policy.headroom, 100);
        assert_eq!(policy.target(), 1900);
    }
}
