//! Generic TTL+LRU cache engine.
//!
//! A capacity-bounded key-value store with per-entry expiry, strict
//! least-recently-used eviction and running hit/miss/set/delete counters.
//! Values are opaque to the engine; domain knowledge lives in the
//! [`CacheCoordinator`](super::CacheCoordinator).
//!
//! Expiry is dual-enforced: lazily on `get`/`has` (correctness never depends
//! on the sweep having run) and actively by a periodic background sweep
//! started with [`CacheEngine::init`] (memory stays bounded even for keys
//! nobody re-reads).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use super::config::CacheConfig;
use super::stats::{CacheStats, StatsSnapshot};

struct Entry<V> {
    value: V,
    expires_at: Instant,
    /// Access-order ledger value; the key with the smallest value across all
    /// present entries is the LRU eviction victim.
    last_access: u64,
}

impl<V> Entry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

struct EngineState<V> {
    entries: HashMap<String, Entry<V>>,
    /// Strictly monotonic counter, bumped on every hit and every set, so the
    /// LRU minimum is always unique.
    ledger: u64,
    stats: CacheStats,
}

impl<V> EngineState<V> {
    fn next_access(&mut self) -> u64 {
        self.ledger += 1;
        self.ledger
    }

    /// Remove the entry with the globally smallest access counter.
    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
            debug!(key = %key, "evicted least-recently-used cache entry");
        }
    }

    fn sweep(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before - self.entries.len()
    }
}

/// Generic opaque key-value cache with TTL expiry and LRU eviction.
///
/// Cloning is cheap and shares the same underlying store, like a handle.
pub struct CacheEngine<V> {
    state: Arc<Mutex<EngineState<V>>>,
    config: CacheConfig,
    sweeper: Arc<Mutex<Option<JoinHandle<()>>>>,
}

// Manual Clone implementation that doesn't require V: Clone
impl<V> Clone for CacheEngine<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: self.config.clone(),
            sweeper: Arc::clone(&self.sweeper),
        }
    }
}

impl<V> CacheEngine<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a new engine with the given config. The background sweep is not
    /// started until [`init`](Self::init) is called.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState {
                entries: HashMap::new(),
                ledger: 0,
                stats: CacheStats::default(),
            })),
            config,
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the periodic expiry sweep. Idempotent; a second call while the
    /// sweeper is running is a no-op. Must be called within a tokio runtime.
    pub fn init(&self) {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return;
        }

        let state = Arc::downgrade(&self.state);
        let interval = self.config.sweep_interval;

        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(state) = state.upgrade() else { break };
                let removed = state.lock().sweep(Instant::now());
                if removed > 0 {
                    debug!(removed, "swept expired cache entries");
                }
            }
        }));

        info!(
            interval_secs = interval.as_secs(),
            "cache sweep task started"
        );
    }

    /// Get a value if present and not expired.
    ///
    /// A hit bumps the access-order ledger for the key; an expired entry is
    /// removed as a side effect and counted as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock();
        let now = Instant::now();

        let expired = match state.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.count_miss(&mut state);
                return None;
            }
        };

        if expired {
            state.entries.remove(key);
            self.count_miss(&mut state);
            return None;
        }

        let access = state.next_access();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.last_access = access;
            let value = entry.value.clone();
            self.count_hit(&mut state);
            return Some(value);
        }

        self.count_miss(&mut state);
        None
    }

    /// Insert or overwrite a value with the default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.config.ttl);
    }

    /// Insert or overwrite a value with an explicit TTL.
    ///
    /// A zero TTL means "already expired". Capacity is only checked for keys
    /// not currently present; overwriting never evicts.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let mut state = self.state.lock();

        if !state.entries.contains_key(&key)
            && state.entries.len() as u64 >= self.config.max_size
        {
            state.evict_lru();
        }

        let last_access = state.next_access();
        state.entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
                last_access,
            },
        );

        if self.config.enable_stats {
            state.stats.sets += 1;
        }
    }

    /// Remove an entry. Silent when the key is absent; the delete counter is
    /// incremented either way.
    pub fn delete(&self, key: &str) {
        let mut state = self.state.lock();
        state.entries.remove(key);
        if self.config.enable_stats {
            state.stats.deletes += 1;
        }
    }

    /// Remove all entries and reset the access-order ledger.
    ///
    /// The cumulative statistics survive; use
    /// [`reset_stats`](Self::reset_stats) to zero them.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.ledger = 0;
    }

    /// Zero the cumulative hit/miss/set/delete counters.
    pub fn reset_stats(&self) {
        self.state.lock().stats = CacheStats::default();
    }

    /// Existence check with the same lazy-expiry side effect as `get`, but
    /// without touching statistics or access order.
    pub fn has(&self, key: &str) -> bool {
        let mut state = self.state.lock();
        let now = Instant::now();

        match state.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                state.entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Element-wise `get` over a batch of keys. No atomicity across the batch.
    pub fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.get(key.as_ref())).collect()
    }

    /// Element-wise `set` over a batch of entries with the default TTL.
    pub fn mset(&self, entries: impl IntoIterator<Item = (String, V)>) {
        self.mset_with_ttl(entries, self.config.ttl);
    }

    /// Element-wise `set` over a batch of entries with an explicit TTL.
    pub fn mset_with_ttl(&self, entries: impl IntoIterator<Item = (String, V)>, ttl: Duration) {
        for (key, value) in entries {
            self.set_with_ttl(key, value, ttl);
        }
    }

    /// Point-in-time statistics snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        let state = self.state.lock();
        state.stats.snapshot(state.entries.len() as u64)
    }

    /// Number of physically present entries (expired-but-unswept included).
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check whether the engine holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all expired entries now, returning how many were purged.
    ///
    /// The task started by [`init`](Self::init) calls this periodically;
    /// exposed for callers that want a deterministic sweep.
    pub fn sweep(&self) -> usize {
        self.state.lock().sweep(Instant::now())
    }

    /// Stop the background sweep and release all entries.
    ///
    /// Safe to call without a prior [`init`](Self::init) and safe to call
    /// more than once.
    pub fn close(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        self.clear();
    }

    fn count_hit(&self, state: &mut EngineState<V>) {
        if self.config.enable_stats {
            state.stats.hits += 1;
        }
    }

    fn count_miss(&self, state: &mut EngineState<V>) {
        if self.config.enable_stats {
            state.stats.misses += 1;
        }
    }
}

impl<V> std::fmt::Debug for CacheEngine<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("size", &self.state.lock().entries.len())
            .field("max_size", &self.config.max_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(max_size: u64) -> CacheEngine<i64> {
        CacheEngine::new(CacheConfig::with_max_size(max_size).ttl(Duration::from_secs(60)))
    }

    #[tokio::test(start_paused = true)]
    async fn get_returns_absent_after_ttl() {
        let cache = engine(10);
        cache.set_with_ttl("k", 1, Duration::from_secs(5));
        assert_eq!(cache.get("k"), Some(1));

        tokio::time::advance(Duration::from_millis(5_001)).await;
        assert_eq!(cache.get("k"), None);
        // Expired entry was removed lazily.
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_expires_immediately() {
        let cache = engine(10);
        cache.set_with_ttl("k", 1, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn evicts_first_inserted_key_without_reads() {
        let cache = engine(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        cache.set("d", 4);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.get("d"), Some(4));
    }

    #[tokio::test]
    async fn a_hit_refreshes_lru_order() {
        let cache = engine(3);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);
        // "a" becomes most recent, so "b" is now the LRU victim.
        assert_eq!(cache.get("a"), Some(1));
        cache.set("d", 4);

        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[tokio::test]
    async fn overwriting_never_evicts() {
        let cache = engine(2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[tokio::test]
    async fn hit_and_miss_accounting() {
        let cache = engine(10);

        assert_eq!(cache.get("k"), None);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.hit_rate, 0.0);

        cache.set("k", 1);
        assert_eq!(cache.get("k"), Some(1));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_counted() {
        let cache = engine(10);
        cache.delete("missing");
        assert_eq!(cache.stats().deletes, 1);

        cache.set("k", 1);
        cache.delete("k");
        cache.delete("k");
        assert_eq!(cache.stats().deletes, 3);
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn has_does_not_touch_stats_or_order() {
        let cache = engine(2);
        cache.set("a", 1);
        cache.set("b", 2);

        assert!(cache.has("a"));
        assert!(!cache.has("missing"));
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);

        // "a" was only probed with has(), so it is still the LRU victim.
        cache.set("c", 3);
        assert_eq!(cache.get("a"), None);
    }

    #[tokio::test]
    async fn clear_resets_entries_but_not_stats() {
        let cache = engine(10);
        cache.set("k", 1);
        cache.get("k");
        cache.clear();

        assert!(cache.is_empty());
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.sets, 1);

        cache.reset_stats();
        assert_eq!(cache.stats().hits, 0);
    }

    #[tokio::test]
    async fn batch_ops_are_element_wise() {
        let cache = engine(10);
        cache.mset(vec![("a".to_string(), 1), ("b".to_string(), 2)]);

        assert_eq!(cache.mget(&["a", "missing", "b"]), vec![Some(1), None, Some(2)]);
        let stats = cache.stats();
        assert_eq!(stats.sets, 2);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_purges_expired_entries_without_reads() {
        let cache = engine(10);
        cache.set_with_ttl("short", 1, Duration::from_secs(1));
        cache.set_with_ttl("long", 2, Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.has("long"));
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweep_runs_on_interval() {
        let cache = CacheEngine::new(
            CacheConfig::with_max_size(10)
                .ttl(Duration::from_secs(1))
                .sweep_interval(Duration::from_secs(60)),
        );
        cache.init();
        cache.init(); // idempotent
        cache.set("k", 1);

        // Let the sweeper task register its timer before moving the clock.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        // The sweeper purged the entry even though nobody read it.
        assert_eq!(cache.len(), 0);
        cache.close();
    }

    #[tokio::test]
    async fn close_is_idempotent_and_safe_without_init() {
        let cache = engine(10);
        cache.set("k", 1);
        cache.close();
        assert!(cache.is_empty());
        cache.close();

        cache.init();
        cache.close();
        cache.close();
    }

    #[tokio::test]
    async fn disabled_stats_stay_zero() {
        let cache: CacheEngine<i64> =
            CacheEngine::new(CacheConfig::default().enable_stats(false));
        cache.set("k", 1);
        cache.get("k");
        cache.get("missing");
        cache.delete("k");

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.sets, 0);
        assert_eq!(stats.deletes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_lru_scenario() {
        let cache = CacheEngine::new(
            CacheConfig::with_max_size(2).ttl(Duration::from_millis(60_000)),
        );
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.get("a"), Some(1)); // "a" now most recent

        cache.set("c", 3); // evicts "b"
        let misses_before = cache.stats().misses;
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.stats().misses, misses_before + 1);

        assert_eq!(cache.get("a"), Some(1));
        assert_eq!(cache.get("c"), Some(3));
    }
}
