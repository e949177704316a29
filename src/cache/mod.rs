//! Cache module - TTL+LRU caching for read-heavy leveling queries.
//!
//! Two layers:
//! - [`CacheEngine`] - generic, statistics-instrumented key-value store with
//!   per-entry expiry and least-recently-used eviction. No domain knowledge.
//! - [`CacheCoordinator`] - domain facade mapping guild snapshots, user
//!   records and leaderboard pages to cache keys, with per-entity TTLs and
//!   the write-invalidate protocol.
//!
//! The cache is a performance layer, never a correctness layer: coordinator
//! methods cannot fail, and a disabled coordinator behaves as an always-miss
//! cache.

mod config;
mod coordinator;
mod engine;
pub mod keys;
mod stats;

pub use config::CacheConfig;
pub use coordinator::CacheCoordinator;
pub use engine::CacheEngine;
pub use stats::StatsSnapshot;
