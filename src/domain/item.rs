use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized feed entry.
///
/// `published` is `None` when the feed gave no date or one that could not be
/// parsed; such items are treated as "unknown date" by the filters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Item {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Item {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published: None,
            categories: Vec::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }

    /// Case-insensitive substring match against the title and every category.
    ///
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return false;
        }
        self.title.to_lowercase().contains(needle)
            || self
                .categories
                .iter()
                .any(|c| c.to_lowercase().contains(needle))
    }
}

/// An item placed on the merged timeline, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineItem {
    pub item: Item,
    pub feed_url: String,
    pub feed_title: String,
    /// Lists the source feed belongs to, in registry order.
    pub lists: Vec<String>,
    /// Terminal color code (0-255) resolved for the first source list.
    pub color: u8,
}
