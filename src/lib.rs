//! Voxrank - voice activity XP and leveling.
//!
//! Tracks user presence in voice channels, accrues XP and levels, and serves
//! read-heavy queries (per-user stats, guild configuration, leaderboards)
//! backed by a pluggable persistent store, with a TTL+LRU cache in front.
//!
//! ## Architecture
//!
//! - `cache` - generic TTL+LRU engine and the domain cache coordinator
//! - `models` - guild, user and leaderboard entities
//! - `storage` - pluggable persistent store (in-memory, MongoDB)
//! - `xp` - level curves and the curve registry
//! - `service` - read-through orchestration and the invalidation protocol
//!
//! ## Consistency model
//!
//! The cache is per-process and eventually consistent, bounded by TTL and
//! best-effort invalidation on known mutation paths. Multiple processes
//! sharing one persistent store do not see each other's invalidations; that
//! is a documented limitation, not a configuration problem.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use voxrank::{
//!     CacheConfig, CacheCoordinator, CurveRegistry, LevelService, MemoryStorage, SortField,
//! };
//!
//! # async fn run() -> Result<(), voxrank::StorageError> {
//! let service = LevelService::new(
//!     Arc::new(MemoryStorage::new()),
//!     CacheCoordinator::new(CacheConfig::default()),
//!     Arc::new(CurveRegistry::with_defaults()),
//! );
//!
//! let outcome = service
//!     .record_voice_tick("guild", "user", "channel", Duration::from_secs(60))
//!     .await?;
//! if outcome.leveled_up {
//!     println!("level {} reached", outcome.new_level);
//! }
//!
//! let top = service.leaderboard("guild", SortField::Xp, 10, 0).await?;
//! println!("{} rows", top.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod models;
pub mod service;
pub mod storage;
pub mod xp;

pub use cache::{CacheConfig, CacheCoordinator, CacheEngine, StatsSnapshot};
pub use models::{
    ChannelStats, GuildConfig, GuildSnapshot, LeaderboardEntry, SortField, UserRecord,
};
pub use service::{LevelService, TickOutcome};
pub use storage::{Database, MemoryStorage, MongoStorage, Storage, StorageError};
pub use xp::{CurveRegistry, LevelCurve, LinearCurve, StandardCurve};
