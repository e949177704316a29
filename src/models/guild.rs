//! Guild configuration and membership snapshot.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user::UserRecord;

/// Per-guild leveling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildConfig {
    /// XP granted per full minute of voice presence.
    #[serde(default = "default_xp_per_minute")]
    pub xp_per_minute: u64,

    /// Minimum seconds between two counted accrual ticks for one user.
    #[serde(default)]
    pub cooldown_secs: u64,

    /// Name of the level curve in the curve registry.
    #[serde(default = "default_curve")]
    pub level_curve: String,

    /// Whether level-ups should be announced by the fronting bot.
    #[serde(default)]
    pub announce_level_up: bool,

    /// Open-ended per-guild extension fields.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

fn default_xp_per_minute() -> u64 {
    10
}

fn default_curve() -> String {
    "standard".to_string()
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            xp_per_minute: default_xp_per_minute(),
            cooldown_secs: 0,
            level_curve: default_curve(),
            announce_level_up: false,
            extra: HashMap::new(),
        }
    }
}

/// Guild configuration plus a snapshot of its tracked members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildSnapshot {
    /// Platform guild ID.
    pub guild_id: String,

    /// Leveling configuration.
    #[serde(default)]
    pub config: GuildConfig,

    /// Tracked members, keyed by user ID.
    #[serde(default)]
    pub users: HashMap<String, UserRecord>,

    /// When this snapshot was last written.
    pub last_updated: DateTime<Utc>,

    /// Open-ended extension fields.
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl GuildSnapshot {
    /// Create a new snapshot with default config and no members.
    pub fn new(guild_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            config: GuildConfig::default(),
            users: HashMap::new(),
            last_updated: Utc::now(),
            extra: HashMap::new(),
        }
    }

    /// Number of tracked members.
    pub fn member_count(&self) -> usize {
        self.users.len()
    }
}
