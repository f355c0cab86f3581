//! Followed feeds, grouped into named lists.
//!
//! The registry is persisted as `lists.toml` next to the config file:
//!
//! ```toml
//! next_id = 2
//!
//! [lists.default]
//! id = 0
//! feeds = ["https://blog.rust-lang.org/feed.xml"]
//!
//! [lists.news]
//! id = 1
//! feeds = ["https://lwn.net/headlines/rss"]
//! ```
//!
//! Feed order inside a list is insertion order. Lists are kept sorted by name,
//! and a list is removed once its last feed is unfollowed. Each list gets an
//! `id` when it is created; color mappings are keyed by it.

mod opml;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::write_atomic;
use crate::domain::FeedTarget;

pub const DEFAULT_LIST: &str = "default";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("list not found: {0}")]
    ListNotFound(String),

    #[error("feed not found in list {list}: {url}")]
    FeedNotFound { list: String, url: String },

    #[error("list already exists: {0}")]
    ListExists(String),

    #[error("Failed to read/write lists file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse lists file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize lists: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// One named list: its color identifier and feeds in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct List {
    id: u8,
    #[serde(default)]
    feeds: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ListsFile {
    #[serde(default)]
    next_id: u8,
    #[serde(default)]
    lists: BTreeMap<String, List>,
}

#[derive(Debug)]
pub struct Registry {
    path: PathBuf,
    /// Identifier handed to the next new list.
    next_id: u8,
    lists: BTreeMap<String, List>,
}

impl Registry {
    /// Load the registry stored at `path`; a missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let file = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| RegistryError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            toml::from_str(&content).map_err(|e| RegistryError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?
        } else {
            ListsFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            next_id: file.next_id,
            lists: file.lists,
        })
    }

    pub fn save(&self) -> Result<(), RegistryError> {
        let file = ListsFile {
            next_id: self.next_id,
            lists: self.lists.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        write_atomic(&self.path, content.as_bytes()).map_err(|e| RegistryError::Io {
            path: self.path.clone(),
            source: e,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the next identifier not held by an existing list.
    ///
    /// Identifiers are never derived from names, so renaming or adding other
    /// lists does not move a list's color. After 256 lists the counter wraps.
    fn allocate_id(&mut self) -> u8 {
        let start = self.next_id;
        let mut id = start;
        loop {
            if !self.lists.values().any(|l| l.id == id) {
                break;
            }
            id = id.wrapping_add(1);
            if id == start {
                break;
            }
        }
        self.next_id = id.wrapping_add(1);
        id
    }

    /// Add `url` to `list`, creating the list if needed.
    ///
    /// Returns `false` when the feed was already in the list.
    pub fn follow(&mut self, list: &str, url: &str) -> bool {
        if !self.lists.contains_key(list) {
            let id = self.allocate_id();
            self.lists.insert(
                list.to_string(),
                List {
                    id,
                    feeds: Vec::new(),
                },
            );
        }
        let Some(entry) = self.lists.get_mut(list) else {
            return false;
        };
        if entry.feeds.iter().any(|f| f == url) {
            return false;
        }
        entry.feeds.push(url.to_string());
        true
    }

    pub fn unfollow(&mut self, list: &str, url: &str) -> Result<(), RegistryError> {
        let entry = self
            .lists
            .get_mut(list)
            .ok_or_else(|| RegistryError::ListNotFound(list.to_string()))?;

        let pos = entry
            .feeds
            .iter()
            .position(|f| f == url)
            .ok_or_else(|| RegistryError::FeedNotFound {
                list: list.to_string(),
                url: url.to_string(),
            })?;
        entry.feeds.remove(pos);

        if entry.feeds.is_empty() {
            self.lists.remove(list);
        }
        Ok(())
    }

    /// Feeds of `list`, or of every list (deduplicated, first-seen order) when
    /// `list` is empty.
    pub fn list_feeds(&self, list: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self.targets(list)?.into_iter().map(|t| t.url).collect())
    }

    pub fn list_names(&self) -> Vec<String> {
        self.lists.keys().cloned().collect()
    }

    pub fn contains_list(&self, list: &str) -> bool {
        self.lists.contains_key(list)
    }

    /// Persisted identifier of a list, the key of its color mapping.
    pub fn list_id(&self, list: &str) -> Option<u8> {
        self.lists.get(list).map(|l| l.id)
    }

    /// Resolve the feeds to aggregate, each tagged with the lists following it.
    pub fn targets(&self, list: &str) -> Result<Vec<FeedTarget>, RegistryError> {
        if !list.is_empty() {
            let entry = self
                .lists
                .get(list)
                .ok_or_else(|| RegistryError::ListNotFound(list.to_string()))?;
            return Ok(entry
                .feeds
                .iter()
                .map(|url| FeedTarget {
                    url: url.clone(),
                    lists: vec![list.to_string()],
                })
                .collect());
        }

        let mut targets: Vec<FeedTarget> = Vec::new();
        for (name, entry) in &self.lists {
            for url in &entry.feeds {
                match targets.iter_mut().find(|t| &t.url == url) {
                    Some(target) => target.lists.push(name.clone()),
                    None => targets.push(FeedTarget {
                        url: url.clone(),
                        lists: vec![name.clone()],
                    }),
                }
            }
        }
        Ok(targets)
    }

    /// Rename a list, keeping its identifier.
    pub fn rename_list(&mut self, old: &str, new: &str) -> Result<(), RegistryError> {
        if self.lists.contains_key(new) {
            return Err(RegistryError::ListExists(new.to_string()));
        }
        let entry = self
            .lists
            .remove(old)
            .ok_or_else(|| RegistryError::ListNotFound(old.to_string()))?;
        self.lists.insert(new.to_string(), entry);
        Ok(())
    }

    pub fn remove_list(&mut self, list: &str) -> Result<Vec<String>, RegistryError> {
        self.lists
            .remove(list)
            .map(|l| l.feeds)
            .ok_or_else(|| RegistryError::ListNotFound(list.to_string()))
    }

    /// Follow every feed found in an OPML document. Returns how many were new.
    pub fn import_opml(&mut self, list: &str, content: &str) -> usize {
        opml::parse_outlines(content)
            .into_iter()
            .filter(|(_, url)| self.follow(list, url))
            .count()
    }

    pub fn export_opml(&self, list: &str) -> Result<String, RegistryError> {
        let entry = self
            .lists
            .get(list)
            .ok_or_else(|| RegistryError::ListNotFound(list.to_string()))?;
        Ok(opml::render(list, &entry.feeds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (tempfile::TempDir, Registry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::load(&dir.path().join("lists.toml")).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_follow_creates_list_and_is_idempotent() {
        let (_dir, mut reg) = registry();
        assert!(reg.follow("news", "https://a.com/feed"));
        assert!(!reg.follow("news", "https://a.com/feed"));
        assert!(reg.follow("news", "https://b.com/feed"));

        assert_eq!(
            reg.list_feeds("news").unwrap(),
            vec!["https://a.com/feed", "https://b.com/feed"]
        );
    }

    #[test]
    fn test_unfollow_errors() {
        let (_dir, mut reg) = registry();
        reg.follow("news", "https://a.com/feed");

        assert!(matches!(
            reg.unfollow("missing", "https://a.com/feed"),
            Err(RegistryError::ListNotFound(_))
        ));
        assert!(matches!(
            reg.unfollow("news", "https://b.com/feed"),
            Err(RegistryError::FeedNotFound { .. })
        ));
    }

    #[test]
    fn test_unfollow_last_feed_prunes_list() {
        let (_dir, mut reg) = registry();
        reg.follow("news", "https://a.com/feed");
        reg.unfollow("news", "https://a.com/feed").unwrap();

        assert!(!reg.contains_list("news"));
        assert!(reg.list_names().is_empty());
    }

    #[test]
    fn test_all_lists_deduplicates_in_first_seen_order() {
        let (_dir, mut reg) = registry();
        reg.follow("b-list", "https://shared.com/feed");
        reg.follow("b-list", "https://b.com/feed");
        reg.follow("a-list", "https://a.com/feed");
        reg.follow("a-list", "https://shared.com/feed");

        assert_eq!(
            reg.list_feeds("").unwrap(),
            vec![
                "https://a.com/feed",
                "https://shared.com/feed",
                "https://b.com/feed"
            ]
        );

        let targets = reg.targets("").unwrap();
        assert_eq!(targets[1].lists, vec!["a-list", "b-list"]);
    }

    #[test]
    fn test_unknown_list_is_an_error() {
        let (_dir, reg) = registry();
        assert!(matches!(
            reg.list_feeds("nope"),
            Err(RegistryError::ListNotFound(_))
        ));
        assert!(reg.list_feeds("").unwrap().is_empty());
    }

    #[test]
    fn test_list_ids_are_assigned_once() {
        let (_dir, mut reg) = registry();
        reg.follow("tech", "https://t.com/feed");
        assert_eq!(reg.list_id("tech"), Some(0));

        // a name sorting earlier does not shift existing ids
        reg.follow("alpha", "https://a.com/feed");
        assert_eq!(reg.list_id("tech"), Some(0));
        assert_eq!(reg.list_id("alpha"), Some(1));
        assert_eq!(reg.list_id("missing"), None);

        reg.rename_list("tech", "dev").unwrap();
        assert_eq!(reg.list_id("dev"), Some(0));

        // removed ids are not handed out again right away
        reg.remove_list("alpha").unwrap();
        reg.follow("beta", "https://b.com/feed");
        assert_eq!(reg.list_id("beta"), Some(2));
    }

    #[test]
    fn test_list_ids_survive_reload() {
        let (dir, mut reg) = registry();
        reg.follow("zeta", "https://z.com/feed");
        reg.follow("alpha", "https://a.com/feed");
        reg.save().unwrap();

        let mut reloaded = Registry::load(&dir.path().join("lists.toml")).unwrap();
        assert_eq!(reloaded.list_id("zeta"), Some(0));
        assert_eq!(reloaded.list_id("alpha"), Some(1));

        reloaded.follow("middle", "https://m.com/feed");
        assert_eq!(reloaded.list_id("middle"), Some(2));
    }

    #[test]
    fn test_allocation_skips_ids_in_use() {
        let (_dir, mut reg) = registry();
        reg.follow("a", "https://a.com/feed");
        reg.follow("b", "https://b.com/feed");
        reg.next_id = 0;

        reg.follow("c", "https://c.com/feed");
        assert_eq!(reg.list_id("c"), Some(2));
    }

    #[test]
    fn test_save_and_reload() {
        let (dir, mut reg) = registry();
        reg.follow(DEFAULT_LIST, "https://a.com/feed");
        reg.follow("news", "https://b.com/feed");
        reg.save().unwrap();

        let reloaded = Registry::load(&dir.path().join("lists.toml")).unwrap();
        assert_eq!(reloaded.list_names(), vec!["default", "news"]);
        assert_eq!(
            reloaded.list_feeds("news").unwrap(),
            vec!["https://b.com/feed"]
        );
    }

    #[test]
    fn test_rename_and_remove() {
        let (_dir, mut reg) = registry();
        reg.follow("old", "https://a.com/feed");
        reg.follow("other", "https://b.com/feed");

        assert!(matches!(
            reg.rename_list("old", "other"),
            Err(RegistryError::ListExists(_))
        ));
        reg.rename_list("old", "new").unwrap();
        assert_eq!(reg.list_feeds("new").unwrap(), vec!["https://a.com/feed"]);

        assert_eq!(reg.remove_list("new").unwrap(), vec!["https://a.com/feed"]);
        assert!(reg.remove_list("new").is_err());
    }

    #[test]
    fn test_opml_import_export() {
        let (_dir, mut reg) = registry();
        reg.follow("news", "https://a.com/feed");
        let exported = reg.export_opml("news").unwrap();

        let (_dir2, mut other) = registry();
        assert_eq!(other.import_opml("imported", &exported), 1);
        assert_eq!(
            other.list_feeds("imported").unwrap(),
            vec!["https://a.com/feed"]
        );
        // importing again adds nothing
        assert_eq!(other.import_opml("imported", &exported), 0);
    }
}
