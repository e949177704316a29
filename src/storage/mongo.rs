//! MongoDB storage backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::models::{GuildConfig, GuildSnapshot, LeaderboardEntry, SortField, UserRecord};

use super::{Storage, StorageError};

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StorageError> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        let db = client.database(db_name);

        Ok(Self { db })
    }

    /// Get a typed collection from the database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}

/// Guild document as stored: configuration only, members live in their own
/// collection and are recomposed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GuildDoc {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    guild_id: String,
    #[serde(default)]
    config: GuildConfig,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    extra: HashMap<String, Value>,
}

/// MongoDB-backed [`Storage`].
#[derive(Debug, Clone)]
pub struct MongoStorage {
    guilds: Collection<GuildDoc>,
    users: Collection<UserRecord>,
}

impl MongoStorage {
    pub fn new(db: &Database) -> Self {
        Self {
            guilds: db.collection("guilds"),
            users: db.collection("users"),
        }
    }

    fn sort_path(sort: SortField) -> &'static str {
        match sort {
            SortField::VoiceTime => "total_voice_time_ms",
            SortField::Xp => "xp",
            SortField::Level => "level",
        }
    }
}

#[async_trait]
impl Storage for MongoStorage {
    async fn get_guild(&self, guild_id: &str) -> Result<Option<GuildSnapshot>, StorageError> {
        let filter = doc! { "guild_id": guild_id };
        let Some(guild) = self.guilds.find_one(filter).await? else {
            return Ok(None);
        };

        let cursor = self.users.find(doc! { "guild_id": guild_id }).await?;
        let records: Vec<UserRecord> = cursor.try_collect().await?;

        Ok(Some(GuildSnapshot {
            guild_id: guild.guild_id,
            config: guild.config,
            users: records
                .into_iter()
                .map(|record| (record.user_id.clone(), record))
                .collect(),
            last_updated: guild.last_updated,
            extra: guild.extra,
        }))
    }

    async fn save_guild(&self, snapshot: &GuildSnapshot) -> Result<(), StorageError> {
        let document = GuildDoc {
            id: None,
            guild_id: snapshot.guild_id.clone(),
            config: snapshot.config.clone(),
            last_updated: snapshot.last_updated,
            extra: snapshot.extra.clone(),
        };

        let filter = doc! { "guild_id": &snapshot.guild_id };
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.guilds
            .replace_one(filter, &document)
            .with_options(options)
            .await?;

        for record in snapshot.users.values() {
            self.save_user(record).await?;
        }

        debug!(guild_id = %snapshot.guild_id, "saved guild snapshot");
        Ok(())
    }

    async fn get_user(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Option<UserRecord>, StorageError> {
        let filter = doc! { "guild_id": guild_id, "user_id": user_id };
        Ok(self.users.find_one(filter).await?)
    }

    async fn save_user(&self, record: &UserRecord) -> Result<(), StorageError> {
        let filter = doc! { "guild_id": &record.guild_id, "user_id": &record.user_id };
        let options = mongodb::options::ReplaceOptions::builder()
            .upsert(true)
            .build();

        self.users
            .replace_one(filter, record)
            .with_options(options)
            .await?;
        Ok(())
    }

    async fn delete_user(&self, guild_id: &str, user_id: &str) -> Result<bool, StorageError> {
        let filter = doc! { "guild_id": guild_id, "user_id": user_id };
        let result = self.users.delete_one(filter).await?;
        Ok(result.deleted_count > 0)
    }

    async fn leaderboard(
        &self,
        guild_id: &str,
        sort: SortField,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let filter = doc! { "guild_id": guild_id };
        let sort_path = Self::sort_path(sort);
        // Secondary sort on user_id keeps pagination stable across ties.
        let sort_doc = doc! { sort_path: -1, "user_id": 1 };

        let cursor = self
            .users
            .find(filter)
            .sort(sort_doc)
            .skip(offset as u64)
            .limit(limit as i64)
            .await?;
        let records: Vec<UserRecord> = cursor.try_collect().await?;

        Ok(records
            .into_iter()
            .enumerate()
            .map(|(i, record)| LeaderboardEntry {
                user_id: record.user_id,
                guild_id: record.guild_id,
                voice_time_ms: record.total_voice_time_ms,
                xp: record.xp,
                level: record.level,
                rank: offset + i as u32 + 1,
            })
            .collect())
    }
}
