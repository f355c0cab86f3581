use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::domain::{CacheEntry, Item};
use crate::store::{CacheError, CacheInfo, CacheResult, CacheStore, CachedFeedInfo};

pub struct SqliteCache {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteCache {
    pub fn new<P: AsRef<Path>>(path: P) -> CacheResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> CacheResult<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations.to_latest(&mut conn)?;
        Ok(())
    }

    fn lock(&self) -> CacheResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CacheError::Poisoned)
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default()
    }
}

impl CacheStore for SqliteCache {
    fn read(&self, feed_url: &str) -> CacheResult<Option<CacheEntry>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT fetched_at, title, description, items, last_error
                 FROM cache_entries WHERE feed_url = ?1",
                params![feed_url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, Option<String>>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((fetched_at, title, description, items, last_error)) = row else {
            return Ok(None);
        };

        let items: Vec<Item> =
            serde_json::from_str(&items).map_err(|e| CacheError::Corrupt {
                url: feed_url.to_string(),
                source: e,
            })?;

        Ok(Some(CacheEntry {
            feed_url: feed_url.to_string(),
            fetched_at: Self::parse_datetime(&fetched_at),
            title,
            description,
            items,
            last_error,
        }))
    }

    fn write(&self, entry: &CacheEntry) -> CacheResult<()> {
        let items = serde_json::to_string(&entry.items).map_err(|e| CacheError::Serialize {
            url: entry.feed_url.clone(),
            source: e,
        })?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO cache_entries
                (feed_url, fetched_at, title, description, items, item_count, last_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(feed_url) DO UPDATE SET
                fetched_at = ?2, title = ?3, description = ?4,
                items = ?5, item_count = ?6, last_error = ?7",
            params![
                entry.feed_url,
                entry.fetched_at.to_rfc3339(),
                entry.title,
                entry.description,
                items,
                entry.items.len() as i64,
                entry.last_error,
            ],
        )?;

        Ok(())
    }

    fn record_error(&self, feed_url: &str, message: &str) -> CacheResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE cache_entries SET last_error = ?1 WHERE feed_url = ?2",
            params![message, feed_url],
        )?;
        Ok(())
    }

    fn info(&self) -> CacheResult<CacheInfo> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT feed_url, title, fetched_at, item_count, last_error
             FROM cache_entries ORDER BY feed_url",
        )?;
        let feeds = stmt
            .query_map([], |row| {
                Ok(CachedFeedInfo {
                    feed_url: row.get(0)?,
                    title: row.get(1)?,
                    fetched_at: Self::parse_datetime(&row.get::<_, String>(2)?),
                    item_count: row.get::<_, i64>(3)? as usize,
                    last_error: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;

        Ok(CacheInfo {
            total_feeds: feeds.len(),
            total_items: feeds.iter().map(|f| f.item_count).sum(),
            total_bytes: (page_count * page_size) as u64,
            feeds,
        })
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn clear(&self) -> CacheResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM cache_entries", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(url: &str, titles: &[&str]) -> CacheEntry {
        let mut entry = CacheEntry::new(url, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        entry.title = Some("Feed".into());
        entry.items = titles
            .iter()
            .map(|t| Item::new(*t, format!("{}/{}", url, t)))
            .collect();
        entry
    }

    #[test]
    fn test_write_and_read() {
        let store = SqliteCache::in_memory().unwrap();
        let mut written = entry("https://example.com/feed.xml", &["a", "b"]);
        written.items[0].published = Some(Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap());
        written.items[1].categories = vec!["rust".into()];
        store.write(&written).unwrap();

        let read = store.read("https://example.com/feed.xml").unwrap().unwrap();
        assert_eq!(read, written);
    }

    #[test]
    fn test_read_miss() {
        let store = SqliteCache::in_memory().unwrap();
        assert!(store.read("https://example.com/feed.xml").unwrap().is_none());
    }

    #[test]
    fn test_write_overwrites() {
        let store = SqliteCache::in_memory().unwrap();
        store.write(&entry("https://example.com/feed.xml", &["a", "b"])).unwrap();
        store.write(&entry("https://example.com/feed.xml", &["c"])).unwrap();

        let read = store.read("https://example.com/feed.xml").unwrap().unwrap();
        assert_eq!(read.items.len(), 1);
        assert_eq!(read.items[0].title, "c");
    }

    #[test]
    fn test_record_error_keeps_items() {
        let store = SqliteCache::in_memory().unwrap();
        store.write(&entry("https://example.com/feed.xml", &["a"])).unwrap();
        store
            .record_error("https://example.com/feed.xml", "connection refused")
            .unwrap();
        // no entry, nothing to annotate
        store.record_error("https://other.com/feed.xml", "timeout").unwrap();

        let read = store.read("https://example.com/feed.xml").unwrap().unwrap();
        assert_eq!(read.items.len(), 1);
        assert_eq!(read.last_error.as_deref(), Some("connection refused"));
        assert!(store.read("https://other.com/feed.xml").unwrap().is_none());
    }

    #[test]
    fn test_info_and_clear() {
        let store = SqliteCache::in_memory().unwrap();
        store.write(&entry("https://a.com/feed", &["a", "b"])).unwrap();
        store.write(&entry("https://b.com/feed", &["c"])).unwrap();

        let info = store.info().unwrap();
        assert_eq!(info.total_feeds, 2);
        assert_eq!(info.total_items, 3);
        assert!(info.total_bytes > 0);
        assert_eq!(info.feeds[0].feed_url, "https://a.com/feed");
        assert_eq!(info.feeds[0].item_count, 2);

        store.clear().unwrap();
        assert_eq!(store.info().unwrap().total_feeds, 0);
        assert!(store.read("https://a.com/feed").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_items_reported() {
        let store = SqliteCache::in_memory().unwrap();
        store.write(&entry("https://a.com/feed", &["a"])).unwrap();
        store
            .lock()
            .unwrap()
            .execute("UPDATE cache_entries SET items = 'not json'", [])
            .unwrap();

        assert!(matches!(
            store.read("https://a.com/feed"),
            Err(CacheError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("cache.db");
        {
            let store = SqliteCache::new(&path).unwrap();
            store.write(&entry("https://a.com/feed", &["a"])).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
        }

        let store = SqliteCache::new(&path).unwrap();
        assert_eq!(store.read("https://a.com/feed").unwrap().unwrap().items.len(), 1);
    }
}
