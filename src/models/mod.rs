//! Domain model exports.

mod guild;
mod leaderboard;
mod user;

pub use guild::{GuildConfig, GuildSnapshot};
pub use leaderboard::{LeaderboardEntry, SortField};
pub use user::{ChannelStats, UserRecord};
