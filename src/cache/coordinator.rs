//! Domain-aware cache coordinator.
//!
//! Facade in front of the generic engine: owns key construction, structured
//! value (de)serialization, per-entity TTL policy and the write-invalidate
//! protocol. The engine stores opaque JSON values; entities are serialized on
//! the way in and rebuilt (timestamps included) on the way out.
//!
//! Every method is infallible from the caller's point of view: any internal
//! fault (serialization, corrupt entry) is logged and degrades to a miss or a
//! no-op, never an error. Constructed without an engine, the coordinator runs
//! in disabled mode where every read misses and every write is a no-op, so
//! callers never branch on whether caching is active.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{GuildSnapshot, LeaderboardEntry, SortField, UserRecord};

use super::config::CacheConfig;
use super::engine::CacheEngine;
use super::keys;
use super::stats::StatsSnapshot;

/// Default TTL for leaderboard pages: expensive to compute, quick to go
/// stale (any XP change reorders ranks).
const LEADERBOARD_TTL: Duration = Duration::from_secs(60);

/// Domain facade over the cache engine.
///
/// Cloning shares the underlying engine.
#[derive(Debug, Clone)]
pub struct CacheCoordinator {
    engine: Option<CacheEngine<Value>>,
    entity_ttl: Duration,
}

impl CacheCoordinator {
    /// Create a coordinator backed by a fresh engine and start its sweep.
    ///
    /// `config.ttl` becomes the default TTL for guild and user entries;
    /// leaderboard pages default to one minute. Must be called within a tokio
    /// runtime (the sweep task is spawned here).
    pub fn new(config: CacheConfig) -> Self {
        let entity_ttl = config.ttl;
        let engine = CacheEngine::new(config);
        engine.init();
        Self {
            engine: Some(engine),
            entity_ttl,
        }
    }

    /// Create a coordinator with caching disabled: every read misses, every
    /// write and invalidation is a successful no-op.
    pub fn disabled() -> Self {
        Self {
            engine: None,
            entity_ttl: Duration::ZERO,
        }
    }

    /// Whether an engine is attached.
    pub fn is_enabled(&self) -> bool {
        self.engine.is_some()
    }

    // --- Guild snapshots ---

    /// Read a guild snapshot from the cache.
    pub async fn get_guild(&self, guild_id: &str) -> Option<GuildSnapshot> {
        self.load(&keys::guild_key(guild_id))
    }

    /// Cache a guild snapshot with the default entity TTL.
    pub async fn set_guild(&self, snapshot: &GuildSnapshot) {
        self.set_guild_with_ttl(snapshot, self.entity_ttl).await;
    }

    /// Cache a guild snapshot with an explicit TTL.
    pub async fn set_guild_with_ttl(&self, snapshot: &GuildSnapshot, ttl: Duration) {
        self.store(keys::guild_key(&snapshot.guild_id), snapshot, ttl);
    }

    /// Drop the cached snapshot for a guild.
    ///
    /// Must run synchronously after every committed guild write, before the
    /// writer returns, so the next read cannot observe data older than that
    /// write.
    pub async fn invalidate_guild(&self, guild_id: &str) {
        if let Some(engine) = &self.engine {
            engine.delete(&keys::guild_key(guild_id));
            debug!(guild_id, "invalidated guild cache entry");
        }
    }

    // --- User records ---

    /// Read a user record from the cache.
    pub async fn get_user(&self, guild_id: &str, user_id: &str) -> Option<UserRecord> {
        self.load(&keys::user_key(guild_id, user_id))
    }

    /// Cache a user record with the default entity TTL.
    pub async fn set_user(&self, record: &UserRecord) {
        self.set_user_with_ttl(record, self.entity_ttl).await;
    }

    /// Cache a user record with an explicit TTL.
    pub async fn set_user_with_ttl(&self, record: &UserRecord, ttl: Duration) {
        self.store(keys::user_key(&record.guild_id, &record.user_id), record, ttl);
    }

    /// Drop the cached record for one user.
    pub async fn invalidate_user(&self, guild_id: &str, user_id: &str) {
        if let Some(engine) = &self.engine {
            engine.delete(&keys::user_key(guild_id, user_id));
            debug!(guild_id, user_id, "invalidated user cache entry");
        }
    }

    // --- Leaderboard pages ---

    /// Read a ranked leaderboard page from the cache.
    pub async fn get_leaderboard(
        &self,
        guild_id: &str,
        sort: SortField,
        limit: u32,
        offset: u32,
    ) -> Option<Vec<LeaderboardEntry>> {
        self.load(&keys::leaderboard_key(guild_id, sort, limit, offset))
    }

    /// Cache a leaderboard page with the short leaderboard TTL.
    pub async fn set_leaderboard(
        &self,
        guild_id: &str,
        sort: SortField,
        limit: u32,
        offset: u32,
        page: &[LeaderboardEntry],
    ) {
        self.set_leaderboard_with_ttl(guild_id, sort, limit, offset, page, LEADERBOARD_TTL)
            .await;
    }

    /// Cache a leaderboard page with an explicit TTL.
    pub async fn set_leaderboard_with_ttl(
        &self,
        guild_id: &str,
        sort: SortField,
        limit: u32,
        offset: u32,
        page: &[LeaderboardEntry],
        ttl: Duration,
    ) {
        self.store(keys::leaderboard_key(guild_id, sort, limit, offset), &page, ttl);
    }

    /// Fan-out delete across the common leaderboard permutations for a guild:
    /// every sort field crossed with the common page limits at offset 0.
    ///
    /// A bounded approximation: exact invalidation would require tracking
    /// every distinct query ever cached. Uncommon permutations may serve
    /// stale pages until their own TTL expires.
    pub async fn invalidate_leaderboards(&self, guild_id: &str) {
        let Some(engine) = &self.engine else { return };

        let fanout = keys::leaderboard_fanout(guild_id);
        let count = fanout.len();
        for key in fanout {
            engine.delete(&key);
        }
        debug!(guild_id, count, "invalidated leaderboard cache entries");
    }

    // --- Lifecycle / observability ---

    /// Engine statistics snapshot, or `None` when caching is disabled.
    pub async fn stats(&self) -> Option<StatsSnapshot> {
        self.engine.as_ref().map(|engine| engine.stats())
    }

    /// Drop every cached entry.
    pub async fn clear(&self) {
        if let Some(engine) = &self.engine {
            engine.clear();
        }
    }

    /// Stop the sweep task and release all entries.
    pub async fn close(&self) {
        if let Some(engine) = &self.engine {
            engine.close();
        }
    }

    fn store<T: Serialize>(&self, key: String, value: &T, ttl: Duration) {
        let Some(engine) = &self.engine else { return };

        match serde_json::to_value(value) {
            Ok(raw) => engine.set_with_ttl(key, raw, ttl),
            Err(e) => warn!(key, error = %e, "failed to serialize cache value, skipping"),
        }
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let engine = self.engine.as_ref()?;
        let raw = engine.get(key)?;

        match serde_json::from_value(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                // Corrupt or shape-mismatched entry: treat as a miss, the
                // next write-back overwrites it.
                warn!(key, error = %e, "failed to deserialize cache value, treating as miss");
                None
            }
        }
    }
}
