//! Per-user voice activity record.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accumulated voice time for a single channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Platform channel ID.
    pub channel_id: String,
    /// Total voice time spent in this channel, in milliseconds.
    #[serde(default)]
    pub voice_time_ms: u64,
    /// Number of accrual ticks attributed to this channel.
    #[serde(default)]
    pub ticks: u64,
}

/// A user's tracked stats within one guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Platform user ID.
    pub user_id: String,
    /// Platform guild ID.
    pub guild_id: String,

    /// Total voice presence, in milliseconds.
    #[serde(default)]
    pub total_voice_time_ms: u64,
    /// Accumulated experience points.
    #[serde(default)]
    pub xp: u64,
    /// Current level, derived from `xp` by the guild's level curve.
    #[serde(default)]
    pub level: u32,

    /// Per-channel breakdown of voice time.
    #[serde(default)]
    pub channels: Vec<ChannelStats>,

    /// Last observed voice activity.
    pub last_seen: DateTime<Utc>,

    /// Consecutive active days.
    #[serde(default)]
    pub streak: u32,
    /// Number of voice sessions started.
    #[serde(default)]
    pub total_sessions: u64,

    /// Open-ended per-user extension fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl UserRecord {
    /// Create a fresh record with zeroed stats.
    pub fn new(guild_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            guild_id: guild_id.into(),
            total_voice_time_ms: 0,
            xp: 0,
            level: 0,
            channels: Vec::new(),
            last_seen: Utc::now(),
            streak: 0,
            total_sessions: 0,
            metadata: None,
        }
    }

    /// Add voice time to a channel's breakdown, creating the slot on first use.
    pub fn accrue_channel_time(&mut self, channel_id: &str, elapsed_ms: u64) {
        match self.channels.iter_mut().find(|c| c.channel_id == channel_id) {
            Some(stats) => {
                stats.voice_time_ms += elapsed_ms;
                stats.ticks += 1;
            }
            None => self.channels.push(ChannelStats {
                channel_id: channel_id.to_string(),
                voice_time_ms: elapsed_ms,
                ticks: 1,
            }),
        }
    }
}
