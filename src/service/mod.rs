//! Orchestrating level service.
//!
//! Wires the cache coordinator in front of a [`Storage`] backend:
//! - reads are read-through (cache, then storage, then write-back);
//! - writes invalidate the matching cache keys after the persistent write
//!   commits and before returning, so the next read cannot observe data
//!   older than the write it follows;
//! - the per-tick accrual path invalidates leaderboard pages only when the
//!   tick crossed a level boundary. XP changes far more often than levels,
//!   so leaderboard entries may lag by up to their TTL between level-ups.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Utc};
use tracing::{debug, info};

use crate::cache::{CacheCoordinator, StatsSnapshot};
use crate::models::{GuildConfig, GuildSnapshot, LeaderboardEntry, SortField, UserRecord};
use crate::storage::{Storage, StorageError};
use crate::xp::CurveRegistry;

/// Result of one voice accrual tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    /// XP granted by this tick (zero while on cooldown).
    pub xp_gained: u64,
    /// XP total after the tick.
    pub total_xp: u64,
    /// Level before the tick.
    pub previous_level: u32,
    /// Level after the tick.
    pub new_level: u32,
    /// Whether the tick crossed a level boundary.
    pub leveled_up: bool,
}

/// Read-through facade over cache + storage for leveling queries and
/// mutations.
pub struct LevelService {
    storage: Arc<dyn Storage>,
    cache: CacheCoordinator,
    curves: Arc<CurveRegistry>,
}

impl LevelService {
    pub fn new(
        storage: Arc<dyn Storage>,
        cache: CacheCoordinator,
        curves: Arc<CurveRegistry>,
    ) -> Self {
        info!(cache_enabled = cache.is_enabled(), "level service initialized");
        Self {
            storage,
            cache,
            curves,
        }
    }

    // --- Read paths (read-through) ---

    /// Guild snapshot: cache first, storage on a miss, write-back on a fetch.
    pub async fn guild(&self, guild_id: &str) -> Result<Option<GuildSnapshot>, StorageError> {
        if let Some(snapshot) = self.cache.get_guild(guild_id).await {
            return Ok(Some(snapshot));
        }

        let fetched = self.storage.get_guild(guild_id).await?;
        if let Some(snapshot) = &fetched {
            self.cache.set_guild(snapshot).await;
        }
        Ok(fetched)
    }

    /// Single user record: cache first, storage on a miss.
    pub async fn user(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<UserRecord>, StorageError> {
        if let Some(record) = self.cache.get_user(guild_id, user_id).await {
            return Ok(Some(record));
        }

        let fetched = self.storage.get_user(guild_id, user_id).await?;
        if let Some(record) = &fetched {
            self.cache.set_user(record).await;
        }
        Ok(fetched)
    }

    /// Ranked leaderboard page: cache first, storage on a miss.
    pub async fn leaderboard(
        &self,
        guild_id: &str,
        sort: SortField,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        if let Some(page) = self.cache.get_leaderboard(guild_id, sort, limit, offset).await {
            return Ok(page);
        }

        let page = self.storage.leaderboard(guild_id, sort, limit, offset).await?;
        self.cache
            .set_leaderboard(guild_id, sort, limit, offset, &page)
            .await;
        Ok(page)
    }

    // --- Mutation paths (write-invalidate) ---

    /// Replace a guild's leveling configuration.
    pub async fn update_guild_config(
        &self,
        guild_id: &str,
        config: GuildConfig,
    ) -> Result<GuildSnapshot, StorageError> {
        let mut snapshot = self
            .storage
            .get_guild(guild_id)
            .await?
            .unwrap_or_else(|| GuildSnapshot::new(guild_id));
        snapshot.config = config;
        snapshot.last_updated = Utc::now();

        self.storage.save_guild(&snapshot).await?;
        // Invalidate after the write commits, before returning.
        self.cache.invalidate_guild(guild_id).await;
        Ok(snapshot)
    }

    /// Persist a full user record (the bulk update path).
    pub async fn update_user(&self, record: &UserRecord) -> Result<(), StorageError> {
        self.storage.save_user(record).await?;
        self.cache
            .invalidate_user(&record.guild_id, &record.user_id)
            .await;
        Ok(())
    }

    /// Mark the start of a voice session: bumps the session counter and the
    /// daily streak.
    pub async fn begin_session(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<UserRecord, StorageError> {
        let now = Utc::now();
        // Read-modify-write must start from the persistent record; a cached
        // entry may predate accruals that never invalidate it.
        let mut record = self
            .storage
            .get_user(guild_id, user_id)
            .await?
            .unwrap_or_else(|| UserRecord::new(guild_id, user_id));

        let last_day = record.last_seen.date_naive();
        let today = now.date_naive();
        record.streak = if record.total_sessions == 0 {
            1
        } else if last_day == today {
            record.streak.max(1)
        } else if last_day + Days::new(1) == today {
            record.streak + 1
        } else {
            1
        };
        record.total_sessions += 1;
        record.last_seen = now;

        self.storage.save_user(&record).await?;
        self.cache.invalidate_user(guild_id, user_id).await;
        debug!(guild_id, user_id, sessions = record.total_sessions, "session started");
        Ok(record)
    }

    /// Accrue one presence tick: voice time always counts; XP is granted
    /// outside the guild's cooldown window and the level is recomputed from
    /// the guild's curve.
    ///
    /// Leaderboard pages are invalidated only when the tick crossed a level
    /// boundary; the user's own cache entry is left to its TTL.
    pub async fn record_voice_tick(
        &self,
        guild_id: &str,
        user_id: &str,
        channel_id: &str,
        elapsed: Duration,
    ) -> Result<TickOutcome, StorageError> {
        let config = self
            .guild(guild_id)
            .await?
            .map(|snapshot| snapshot.config)
            .unwrap_or_default();
        // Accruals stack tick over tick, so the base record must come from
        // storage: the user cache entry is not refreshed by this path and a
        // primed entry would roll back newer ticks on every save.
        let mut record = self
            .storage
            .get_user(guild_id, user_id)
            .await?
            .unwrap_or_else(|| UserRecord::new(guild_id, user_id));

        let now = Utc::now();
        let on_cooldown = config.cooldown_secs > 0
            && now.signed_duration_since(record.last_seen)
                < chrono::Duration::seconds(config.cooldown_secs as i64)
            && record.total_voice_time_ms > 0;

        let elapsed_ms = elapsed.as_millis() as u64;
        record.total_voice_time_ms += elapsed_ms;
        record.accrue_channel_time(channel_id, elapsed_ms);

        let xp_gained = if on_cooldown {
            0
        } else {
            config.xp_per_minute * elapsed_ms / 60_000
        };
        record.xp += xp_gained;

        let curve = self.curves.get_or_standard(&config.level_curve);
        let previous_level = record.level;
        let new_level = curve.level_for_xp(record.xp);
        let leveled_up = new_level > previous_level;
        record.level = new_level;
        record.last_seen = now;

        self.storage.save_user(&record).await?;
        if leveled_up {
            debug!(guild_id, user_id, new_level, "level up, invalidating leaderboards");
            self.cache.invalidate_leaderboards(guild_id).await;
        }

        Ok(TickOutcome {
            xp_gained,
            total_xp: record.xp,
            previous_level,
            new_level,
            leveled_up,
        })
    }

    // --- Lifecycle / observability ---

    /// Cache statistics, or `None` when caching is disabled.
    pub async fn cache_stats(&self) -> Option<StatsSnapshot> {
        self.cache.stats().await
    }

    /// Drop every cached entry.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Release the cache and stop its background sweep.
    pub async fn close(&self) {
        self.cache.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::storage::MemoryStorage;

    /// Install a subscriber once so test runs can surface service logs via
    /// `RUST_LOG`.
    fn init_tracing() {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("voxrank=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    }

    fn service() -> (LevelService, Arc<MemoryStorage>) {
        init_tracing();
        let storage = Arc::new(MemoryStorage::new());
        let service = LevelService::new(
            storage.clone(),
            CacheCoordinator::new(CacheConfig::default()),
            Arc::new(CurveRegistry::with_defaults()),
        );
        (service, storage)
    }

    #[tokio::test]
    async fn reads_are_read_through() {
        let (service, storage) = service();
        let mut record = UserRecord::new("g1", "u1");
        record.xp = 250;
        storage.save_user(&record).await.unwrap();

        // First read misses and writes back, second read hits.
        assert!(service.user("g1", "u1").await.unwrap().is_some());
        assert!(service.user("g1", "u1").await.unwrap().is_some());

        let stats = service.cache_stats().await.expect("stats");
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        service.close().await;
    }

    #[tokio::test]
    async fn absent_entities_fall_through_without_caching() {
        let (service, _storage) = service();
        assert!(service.guild("missing").await.unwrap().is_none());
        assert!(service.user("g1", "missing").await.unwrap().is_none());

        let stats = service.cache_stats().await.expect("stats");
        assert_eq!(stats.sets, 0);
        service.close().await;
    }

    #[tokio::test]
    async fn guild_config_update_is_visible_to_the_next_read() {
        let (service, _storage) = service();
        service
            .update_guild_config("g1", GuildConfig::default())
            .await
            .unwrap();

        // Prime the cache with the current snapshot.
        let before = service.guild("g1").await.unwrap().expect("guild");
        assert_eq!(before.config.xp_per_minute, 10);

        let config = GuildConfig {
            xp_per_minute: 99,
            ..GuildConfig::default()
        };
        service.update_guild_config("g1", config).await.unwrap();

        let after = service.guild("g1").await.unwrap().expect("guild");
        assert_eq!(after.config.xp_per_minute, 99);
        service.close().await;
    }

    #[tokio::test]
    async fn bulk_user_update_invalidates_the_user_entry() {
        let (service, _storage) = service();
        let mut record = UserRecord::new("g1", "u1");
        record.xp = 100;
        service.update_user(&record).await.unwrap();

        // Prime the cache.
        assert_eq!(service.user("g1", "u1").await.unwrap().unwrap().xp, 100);

        record.xp = 5_000;
        service.update_user(&record).await.unwrap();
        assert_eq!(service.user("g1", "u1").await.unwrap().unwrap().xp, 5_000);
        service.close().await;
    }

    #[tokio::test]
    async fn tick_accrues_time_and_xp() {
        let (service, _storage) = service();
        let outcome = service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();

        // Default config grants 10 XP per minute.
        assert_eq!(outcome.xp_gained, 10);
        assert_eq!(outcome.total_xp, 10);
        assert!(!outcome.leveled_up);

        let record = service.user("g1", "u1").await.unwrap().expect("record");
        assert_eq!(record.total_voice_time_ms, 60_000);
        assert_eq!(record.channels[0].channel_id, "c1");
        service.close().await;
    }

    #[tokio::test]
    async fn tick_without_level_up_leaves_leaderboard_pages_cached() {
        let (service, _storage) = service();
        service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();

        // Prime a leaderboard page.
        let page = service
            .leaderboard("g1", SortField::Xp, 10, 0)
            .await
            .unwrap();
        assert_eq!(page[0].xp, 10);

        // Another tick changes XP but not the level; the cached page is
        // deliberately left stale until its TTL.
        let outcome = service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!outcome.leveled_up);

        let cached = service
            .leaderboard("g1", SortField::Xp, 10, 0)
            .await
            .unwrap();
        assert_eq!(cached[0].xp, 10);
        service.close().await;
    }

    #[tokio::test]
    async fn level_up_invalidates_common_leaderboard_pages() {
        let (service, _storage) = service();
        let mut record = UserRecord::new("g1", "u1");
        record.xp = 95; // standard curve: level 1 at 100 XP
        service.update_user(&record).await.unwrap();

        let stale = service
            .leaderboard("g1", SortField::Xp, 10, 0)
            .await
            .unwrap();
        assert_eq!(stale[0].level, 0);

        let outcome = service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(outcome.leveled_up);
        assert_eq!(outcome.new_level, 1);

        // The common page was invalidated, so the next read sees the level.
        let fresh = service
            .leaderboard("g1", SortField::Xp, 10, 0)
            .await
            .unwrap();
        assert_eq!(fresh[0].level, 1);
        service.close().await;
    }

    #[tokio::test]
    async fn cooldown_gates_xp_but_not_voice_time() {
        let (service, storage) = service();
        let config = GuildConfig {
            cooldown_secs: 120,
            ..GuildConfig::default()
        };
        service.update_guild_config("g1", config).await.unwrap();

        let first = service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(first.xp_gained, 10);

        let second = service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(second.xp_gained, 0);
        assert_eq!(second.total_xp, 10);

        // Ticks don't invalidate the user entry, so read storage directly.
        let record = storage.get_user("g1", "u1").await.unwrap().expect("record");
        assert_eq!(record.total_voice_time_ms, 120_000);
        service.close().await;
    }

    #[tokio::test]
    async fn repeated_ticks_accrue_through_a_primed_cache() {
        let (service, storage) = service();

        // Reads between ticks prime the user cache entry; ticks never
        // refresh it, so each accrual must still stack on storage.
        service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(service.user("g1", "u1").await.unwrap().is_some());
        service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(service.user("g1", "u1").await.unwrap().is_some());
        let last = service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(last.total_xp, 30);
        let record = storage.get_user("g1", "u1").await.unwrap().expect("record");
        assert_eq!(record.xp, 30);
        assert_eq!(record.total_voice_time_ms, 180_000);
        service.close().await;
    }

    #[tokio::test]
    async fn session_start_does_not_revert_tick_accruals() {
        let (service, storage) = service();
        service.begin_session("g1", "u1").await.unwrap();
        // Prime the cache with the pre-tick record.
        assert!(service.user("g1", "u1").await.unwrap().is_some());

        service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();

        let record = service.begin_session("g1", "u1").await.unwrap();
        assert_eq!(record.xp, 10);
        assert_eq!(record.total_voice_time_ms, 60_000);
        assert_eq!(record.total_sessions, 2);

        let stored = storage.get_user("g1", "u1").await.unwrap().expect("record");
        assert_eq!(stored.xp, 10);
        service.close().await;
    }

    #[tokio::test]
    async fn sessions_bump_counters_and_streak() {
        let (service, _storage) = service();
        let first = service.begin_session("g1", "u1").await.unwrap();
        assert_eq!(first.total_sessions, 1);
        assert_eq!(first.streak, 1);

        // Same day: streak unchanged.
        let second = service.begin_session("g1", "u1").await.unwrap();
        assert_eq!(second.total_sessions, 2);
        assert_eq!(second.streak, 1);

        // Pretend the last session was yesterday.
        let mut record = second.clone();
        record.last_seen = Utc::now() - chrono::Duration::days(1);
        service.update_user(&record).await.unwrap();

        let third = service.begin_session("g1", "u1").await.unwrap();
        assert_eq!(third.streak, 2);

        // A gap longer than a day resets the streak.
        let mut record = third.clone();
        record.last_seen = Utc::now() - chrono::Duration::days(5);
        service.update_user(&record).await.unwrap();
        let fourth = service.begin_session("g1", "u1").await.unwrap();
        assert_eq!(fourth.streak, 1);
        service.close().await;
    }

    #[tokio::test]
    async fn disabled_cache_degrades_to_storage_only() {
        let storage = Arc::new(MemoryStorage::new());
        let service = LevelService::new(
            storage.clone(),
            CacheCoordinator::disabled(),
            Arc::new(CurveRegistry::with_defaults()),
        );

        let mut record = UserRecord::new("g1", "u1");
        record.xp = 77;
        storage.save_user(&record).await.unwrap();

        assert_eq!(service.user("g1", "u1").await.unwrap().unwrap().xp, 77);
        assert!(service.cache_stats().await.is_none());

        service
            .record_voice_tick("g1", "u1", "c1", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(service.user("g1", "u1").await.unwrap().unwrap().xp, 87);
        service.close().await;
    }
}
