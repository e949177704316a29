//! Pluggable persistent storage.
//!
//! The cache layer never talks to storage directly; the service layer reads
//! through the cache and falls back to a [`Storage`] implementation on a
//! miss. Backends: [`MemoryStorage`] (tests, ephemeral deployments) and
//! [`MongoStorage`].

mod memory;
mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{GuildSnapshot, LeaderboardEntry, SortField, UserRecord};

pub use memory::MemoryStorage;
pub use mongo::{Database, MongoStorage};

/// Errors surfaced by a storage backend.
///
/// Unlike cache faults, storage faults propagate to the caller.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

/// Fetch/persist interface for leveling entities.
///
/// Reads return `Ok(None)` for absent entities; only backend failures are
/// errors. Writes are upserts.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a guild's configuration and membership snapshot.
    async fn get_guild(&self, guild_id: &str) -> Result<Option<GuildSnapshot>, StorageError>;

    /// Persist a guild snapshot (config and any members it carries).
    async fn save_guild(&self, snapshot: &GuildSnapshot) -> Result<(), StorageError>;

    /// Fetch one user's record within a guild.
    async fn get_user(&self, guild_id: &str, user_id: &str)
        -> Result<Option<UserRecord>, StorageError>;

    /// Persist one user record.
    async fn save_user(&self, record: &UserRecord) -> Result<(), StorageError>;

    /// Remove one user record. Returns whether anything was deleted.
    async fn delete_user(&self, guild_id: &str, user_id: &str) -> Result<bool, StorageError>;

    /// Ranked page of a guild's members, ordered descending by `sort` with
    /// 1-based ranks relative to the full ordering.
    async fn leaderboard(
        &self,
        guild_id: &str,
        sort: SortField,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError>;
}
