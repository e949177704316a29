//! Leaderboard page model and sort fields.

use serde::{Deserialize, Serialize};

/// Field a leaderboard page is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    VoiceTime,
    Xp,
    Level,
}

impl SortField {
    /// Stable string form, used in cache keys and storage queries.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::VoiceTime => "voice_time",
            SortField::Xp => "xp",
            SortField::Level => "level",
        }
    }

    /// All supported sort fields, in fan-out order.
    pub const ALL: [SortField; 3] = [SortField::VoiceTime, SortField::Xp, SortField::Level];
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a ranked leaderboard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub guild_id: String,
    pub voice_time_ms: u64,
    pub xp: u64,
    pub level: u32,
    /// 1-based rank within the full ordering (not within the page).
    pub rank: u32,
}
