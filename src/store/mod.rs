pub mod sqlite;

use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::CacheEntry;

pub use sqlite::SqliteCache;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Cache migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("Corrupt cache entry for {url}: {source}")]
    Corrupt {
        url: String,
        source: serde_json::Error,
    },

    #[error("Failed to serialize cache entry for {url}: {source}")]
    Serialize {
        url: String,
        source: serde_json::Error,
    },

    #[error("Cache lock poisoned")]
    Poisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Per-feed line of the cache report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFeedInfo {
    pub feed_url: String,
    pub title: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub item_count: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheInfo {
    pub total_feeds: usize,
    pub total_items: usize,
    pub total_bytes: u64,
    pub feeds: Vec<CachedFeedInfo>,
}

/// Persistence of the last successfully fetched content of each feed.
pub trait CacheStore {
    /// The stored entry for `feed_url`, `None` on a miss.
    fn read(&self, feed_url: &str) -> CacheResult<Option<CacheEntry>>;

    /// Insert or replace the entry for `entry.feed_url` in one atomic step.
    fn write(&self, entry: &CacheEntry) -> CacheResult<()>;

    /// Note a failed refresh on an existing entry without touching its items.
    fn record_error(&self, feed_url: &str, message: &str) -> CacheResult<()>;

    fn info(&self) -> CacheResult<CacheInfo>;

    /// Location on disk, `None` for in-memory stores.
    fn path(&self) -> Option<&Path>;

    fn clear(&self) -> CacheResult<()>;
}
