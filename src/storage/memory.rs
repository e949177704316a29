//! In-memory storage backend.
//!
//! Canonical store for user records is the per-user map; a guild snapshot is
//! recomposed on read from the guild document plus its users.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::{GuildSnapshot, LeaderboardEntry, SortField, UserRecord};

use super::{Storage, StorageError};

/// DashMap-backed storage. Cheap to construct, nothing persists.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    guilds: DashMap<String, GuildSnapshot>,
    users: DashMap<(String, String), UserRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn guild_users(&self, guild_id: &str) -> Vec<UserRecord> {
        self.users
            .iter()
            .filter(|entry| entry.key().0 == guild_id)
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_guild(&self, guild_id: &str) -> Result<Option<GuildSnapshot>, StorageError> {
        let Some(stored) = self.guilds.get(guild_id).map(|g| g.value().clone()) else {
            return Ok(None);
        };

        let mut snapshot = stored;
        snapshot.users = self
            .guild_users(guild_id)
            .into_iter()
            .map(|record| (record.user_id.clone(), record))
            .collect::<HashMap<_, _>>();
        Ok(Some(snapshot))
    }

    async fn save_guild(&self, snapshot: &GuildSnapshot) -> Result<(), StorageError> {
        for record in snapshot.users.values() {
            self.save_user(record).await?;
        }

        let mut stored = snapshot.clone();
        stored.users = HashMap::new();
        self.guilds.insert(stored.guild_id.clone(), stored);
        Ok(())
    }

    async fn get_user(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<UserRecord>, StorageError> {
        let key = (guild_id.to_string(), user_id.to_string());
        Ok(self.users.get(&key).map(|r| r.value().clone()))
    }

    async fn save_user(&self, record: &UserRecord) -> Result<(), StorageError> {
        let key = (record.guild_id.clone(), record.user_id.clone());
        self.users.insert(key, record.clone());
        Ok(())
    }

    async fn delete_user(&self, guild_id: &str, user_id: &str) -> Result<bool, StorageError> {
        let key = (guild_id.to_string(), user_id.to_string());
        Ok(self.users.remove(&key).is_some())
    }

    async fn leaderboard(
        &self,
        guild_id: &str,
        sort: SortField,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let mut records = self.guild_users(guild_id);

        records.sort_by(|a, b| {
            let ordering = match sort {
                SortField::VoiceTime => b.total_voice_time_ms.cmp(&a.total_voice_time_ms),
                SortField::Xp => b.xp.cmp(&a.xp),
                SortField::Level => b.level.cmp(&a.level),
            };
            // Stable tie-break so pagination never duplicates rows.
            ordering.then_with(|| a.user_id.cmp(&b.user_id))
        });

        let page = records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .enumerate()
            .map(|(i, record)| LeaderboardEntry {
                user_id: record.user_id,
                guild_id: record.guild_id,
                voice_time_ms: record.total_voice_time_ms,
                xp: record.xp,
                level: record.level,
                rank: offset + i as u32 + 1,
            })
            .collect();
        Ok(page)
    }
}
