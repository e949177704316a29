//! Cache statistics.
//!
//! Counters are monotonic for the process lifetime. `clear()` on the engine
//! does not touch them; `reset_stats()` is the explicit reset.

use serde::Serialize;

/// Running counters maintained by the engine.
#[derive(Debug, Default)]
pub(crate) struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
}

impl CacheStats {
    pub(crate) fn snapshot(&self, size: u64) -> StatsSnapshot {
        let lookups = self.hits + self.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        };

        StatsSnapshot {
            hits: self.hits,
            misses: self.misses,
            sets: self.sets,
            deletes: self.deletes,
            size,
            hit_rate,
        }
    }
}

/// Point-in-time copy of the cache statistics.
///
/// Returned by value; mutating it has no effect on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing (or an expired entry).
    pub misses: u64,
    /// Successful inserts/overwrites.
    pub sets: u64,
    /// Delete calls, counted even when the key was absent.
    pub deletes: u64,
    /// Number of physically present entries at snapshot time.
    pub size: u64,
    /// `hits / (hits + misses)`, or `0.0` before the first lookup.
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_is_zero_without_lookups() {
        let stats = CacheStats::default();
        assert_eq!(stats.snapshot(0).hit_rate, 0.0);
    }

    #[test]
    fn hit_rate_is_hits_over_lookups() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.snapshot(5).hit_rate, 0.75);
        assert_eq!(stats.snapshot(5).size, 5);
    }
}
