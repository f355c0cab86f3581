use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Item;

/// Last known-good content of a feed, keyed by its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub feed_url: String,
    pub fetched_at: DateTime<Utc>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Vec<Item>,
    /// Message of the most recent failed refresh, cleared by the next success.
    pub last_error: Option<String>,
}

impl CacheEntry {
    pub fn new(feed_url: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            feed_url: feed_url.into(),
            fetched_at,
            title: None,
            description: None,
            items: Vec::new(),
            last_error: None,
        }
    }

    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => &self.feed_url,
        }
    }
}

/// A feed to aggregate, with every list that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedTarget {
    pub url: String,
    pub lists: Vec<String>,
}
