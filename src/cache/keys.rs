//! Cache key namespace.
//!
//! Three disjoint key families, owned by the coordinator (the engine never
//! interprets keys):
//!
//! - `guild:{guild_id}`
//! - `user:{guild_id}:{user_id}`
//! - `leaderboard:{guild_id}:{sort}:{limit}:{offset}`

use crate::models::SortField;

/// Page sizes covered by the leaderboard invalidation fan-out.
pub const PAGE_LIMITS: [u32; 4] = [10, 25, 50, 100];

/// Key for a guild configuration + membership snapshot.
pub fn guild_key(guild_id: &str) -> String {
    format!("guild:{guild_id}")
}

/// Key for an individual user record.
pub fn user_key(guild_id: &str, user_id: &str) -> String {
    format!("user:{guild_id}:{user_id}")
}

/// Key for one ranked leaderboard page.
pub fn leaderboard_key(guild_id: &str, sort: SortField, limit: u32, offset: u32) -> String {
    format!("leaderboard:{guild_id}:{sort}:{limit}:{offset}")
}

/// Keys covered by a leaderboard invalidation for one guild: the Cartesian
/// product of all sort fields and the common page limits, at offset 0.
///
/// Deliberately bounded; uncommon permutations (offset > 0, unlisted limits)
/// are left to expire via their own TTL.
pub fn leaderboard_fanout(guild_id: &str) -> Vec<String> {
    let mut keys = Vec::with_capacity(SortField::ALL.len() * PAGE_LIMITS.len());
    for sort in SortField::ALL {
        for limit in PAGE_LIMITS {
            keys.push(leaderboard_key(guild_id, sort, limit, 0));
        }
    }
    keys
}
