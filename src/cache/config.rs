//! Cache configuration.

use std::time::Duration;

/// Configuration for a cache engine instance.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction kicks in.
    pub max_size: u64,

    /// Default time-to-live for entries stored without an explicit TTL.
    pub ttl: Duration,

    /// Whether hit/miss/set/delete counters are maintained.
    pub enable_stats: bool,

    /// Interval of the background sweep that purges expired entries.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1_000,
            ttl: Duration::from_secs(300), // 5 minutes
            enable_stats: true,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given max size.
    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            max_size,
            ..Default::default()
        }
    }

    /// Set max size for the cache (builder pattern).
    #[must_use]
    pub fn max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the default time-to-live for entries.
    #[must_use]
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.ttl = duration;
        self
    }

    /// Enable or disable statistics counters.
    #[must_use]
    pub fn enable_stats(mut self, enabled: bool) -> Self {
        self.enable_stats = enabled;
        self
    }

    /// Set the background sweep interval.
    #[must_use]
    pub fn sweep_interval(mut self, duration: Duration) -> Self {
        self.sweep_interval = duration;
        self
    }

    /// Create config for rarely changing data.
    /// Lower capacity, longer TTL.
    pub fn cold_data() -> Self {
        Self {
            max_size: 500,
            ttl: Duration::from_secs(3600), // 1 hour
            ..Default::default()
        }
    }

    /// Create config for expensive, quickly stale data (leaderboard pages).
    /// Higher capacity, short TTL.
    pub fn hot_pages() -> Self {
        Self {
            max_size: 5_000,
            ttl: Duration::from_secs(60), // 1 minute
            ..Default::default()
        }
    }
}
