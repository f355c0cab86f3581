use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::TimelineItem;

/// Filters applied to the merged timeline.
#[derive(Debug, Clone, Default)]
pub struct TimelineFilter {
    pub since: Option<DateTime<Utc>>,
    /// Items dated after this instant are dropped.
    pub not_after: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// Flatten per-feed item sets, given in feed order, into one timeline.
///
/// The first occurrence of a link wins; later duplicates only contribute
/// their lists. Items without a link are never merged.
pub fn merge(feeds: Vec<Vec<TimelineItem>>) -> Vec<TimelineItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<TimelineItem> = Vec::new();

    for item in feeds.into_iter().flatten() {
        if item.item.link.is_empty() || seen.insert(item.item.link.clone()) {
            merged.push(item);
            continue;
        }
        if let Some(first) = merged.iter_mut().find(|m| m.item.link == item.item.link) {
            for list in item.lists {
                if !first.lists.contains(&list) {
                    first.lists.push(list);
                }
            }
        }
    }

    merged
}

/// Filter, order newest first, then truncate.
///
/// Items with an unknown date are never dropped by `since` or `not_after` and
/// sort after every dated item. Ties keep merge order.
pub fn apply(mut items: Vec<TimelineItem>, filter: &TimelineFilter) -> Vec<TimelineItem> {
    if let Some(query) = &filter.search {
        let needle = query.trim().to_lowercase();
        items.retain(|i| i.item.matches(&needle));
    }

    if let Some(since) = filter.since {
        items.retain(|i| i.item.published.is_none_or(|p| p >= since));
    }

    if let Some(now) = filter.not_after {
        items.retain(|i| i.item.published.is_none_or(|p| p <= now));
    }

    // stable: equal dates stay in feed order
    items.sort_by(|a, b| b.item.published.cmp(&a.item.published));

    if let Some(limit) = filter.limit {
        items.truncate(limit);
    }

    items
}
