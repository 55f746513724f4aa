//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the storage traits.

use crate::state::{CrawlEntry, CrawlSession, CrawlStatus, CrawlTable, Frontier};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    ResultStore, SessionStore, SettingsStore, StorageError, StorageResult,
};
use crate::storage::{
    StoredPage, SESSION_FRONTIER_KEY, SESSION_PROGRESS_KEY, SESSION_SEED_URL_KEY,
    SESSION_TABLE_KEY,
};
use crate::CrawlerError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(CrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlerError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CrawlerError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    /// Counts stored pages
    pub fn count_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp '{}': {}", raw, e)))
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> StorageResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| StorageError::Serialization(format!("bad value for '{}': {}", key, e)))
}

impl ResultStore for SqliteStorage {
    fn put_pages(&mut self, entries: &[CrawlEntry]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut written = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO pages (url, content, status, stored_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(url) DO UPDATE SET
                    content = excluded.content,
                    status = excluded.status,
                    stored_at = excluded.stored_at",
            )?;

            for entry in entries {
                let content = match (&entry.status, &entry.content) {
                    (CrawlStatus::Completed, Some(content)) => content,
                    _ => {
                        tracing::debug!("Not storing {} ({})", entry.url, entry.status);
                        continue;
                    }
                };

                stmt.execute(params![
                    entry.url,
                    content,
                    CrawlStatus::Completed.to_db_string(),
                    now
                ])?;
                written += 1;
            }
        }

        tx.commit()?;
        tracing::debug!("Stored {} pages", written);
        Ok(written)
    }

    fn get_all_pages(&self) -> StorageResult<Vec<StoredPage>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, content, stored_at FROM pages ORDER BY stored_at, rowid")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(url, content, stored_at)| {
                Ok(StoredPage {
                    url,
                    content,
                    stored_at: parse_timestamp(&stored_at)?,
                })
            })
            .collect()
    }

    fn get_page(&self, url: &str) -> StorageResult<Option<StoredPage>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, content, stored_at FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((url, content, stored_at)) => Ok(Some(StoredPage {
                url,
                content,
                stored_at: parse_timestamp(&stored_at)?,
            })),
            None => Ok(None),
        }
    }

    fn delete_page(&mut self, url: &str) -> StorageResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM pages WHERE url = ?1", params![url])?;
        Ok(deleted > 0)
    }

    fn delete_all_pages(&mut self) -> StorageResult<usize> {
        let deleted = self.conn.execute("DELETE FROM pages", [])?;
        Ok(deleted)
    }
}

impl SettingsStore for SqliteStorage {
    fn get_setting<T: DeserializeOwned>(&self, key: &str, default: T) -> StorageResult<T> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => decode(key, &raw),
            None => Ok(default),
        }
    }

    fn put_setting<T: Serialize>(&mut self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, raw],
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteStorage {
    fn load_session(&self) -> StorageResult<Option<CrawlSession>> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM session")?;
        let values: HashMap<String, String> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<_, _>>()?;

        if values.is_empty() {
            return Ok(None);
        }

        let seed_url: Option<String> = match values.get(SESSION_SEED_URL_KEY) {
            Some(raw) => decode(SESSION_SEED_URL_KEY, raw)?,
            None => None,
        };
        let table: CrawlTable = match values.get(SESSION_TABLE_KEY) {
            Some(raw) => decode(SESSION_TABLE_KEY, raw)?,
            None => CrawlTable::new(),
        };
        let frontier: Frontier = match values.get(SESSION_FRONTIER_KEY) {
            Some(raw) => decode(SESSION_FRONTIER_KEY, raw)?,
            None => Frontier::new(),
        };
        let progress: u8 = match values.get(SESSION_PROGRESS_KEY) {
            Some(raw) => decode(SESSION_PROGRESS_KEY, raw)?,
            None => 0,
        };

        Ok(Some(CrawlSession::restore(
            seed_url, table, frontier, progress,
        )))
    }

    fn save_session(&mut self, session: &CrawlSession) -> StorageResult<()> {
        let values = [
            (SESSION_SEED_URL_KEY, serde_json::to_string(&session.seed_url)?),
            (SESSION_TABLE_KEY, serde_json::to_string(&session.table)?),
            (SESSION_FRONTIER_KEY, serde_json::to_string(&session.frontier)?),
            (SESSION_PROGRESS_KEY, serde_json::to_string(&session.progress)?),
        ];

        let tx = self.conn.transaction()?;
        for (key, value) in &values {
            tx.execute(
                "INSERT OR REPLACE INTO session (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn clear_session(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM session", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::LinkCandidate;
    use crate::storage::MAX_CONCURRENT_REQUESTS_KEY;

    fn completed(url: &str, content: &str) -> CrawlEntry {
        CrawlEntry {
            url: url.to_string(),
            content: Some(content.to_string()),
            status: CrawlStatus::Completed,
        }
    }

    #[test]
    fn test_create_in_memory() {
        assert!(SqliteStorage::new_in_memory().is_ok());
    }

    #[test]
    fn test_put_pages_only_stores_completed() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let entries = vec![
            completed("https://ex.com/a", "A"),
            CrawlEntry {
                url: "https://ex.com/b".to_string(),
                content: None,
                status: CrawlStatus::Error,
            },
            CrawlEntry {
                url: "https://ex.com/c".to_string(),
                content: None,
                status: CrawlStatus::Pending,
            },
        ];

        assert_eq!(storage.put_pages(&entries).unwrap(), 1);
        assert_eq!(storage.count_pages().unwrap(), 1);
        assert!(storage.get_page("https://ex.com/b").unwrap().is_none());
    }

    #[test]
    fn test_put_pages_overwrites_same_url() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .put_pages(&[completed("https://ex.com/a", "old")])
            .unwrap();
        storage
            .put_pages(&[completed("https://ex.com/a", "new")])
            .unwrap();

        let pages = storage.get_all_pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].content, "new");
    }

    #[test]
    fn test_get_all_pages_keeps_insert_order() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .put_pages(&[
                completed("https://ex.com/z", "Z"),
                completed("https://ex.com/a", "A"),
            ])
            .unwrap();

        let urls: Vec<_> = storage
            .get_all_pages()
            .unwrap()
            .into_iter()
            .map(|p| p.url)
            .collect();
        assert_eq!(urls, vec!["https://ex.com/z", "https://ex.com/a"]);
    }

    #[test]
    fn test_delete_page_and_all() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .put_pages(&[
                completed("https://ex.com/a", "A"),
                completed("https://ex.com/b", "B"),
                completed("https://ex.com/c", "C"),
            ])
            .unwrap();

        assert!(storage.delete_page("https://ex.com/a").unwrap());
        assert!(!storage.delete_page("https://ex.com/a").unwrap());
        assert_eq!(storage.delete_all_pages().unwrap(), 2);
        assert!(storage.get_all_pages().unwrap().is_empty());
    }

    #[test]
    fn test_settings_default_and_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();

        let limit: usize = storage
            .get_setting(MAX_CONCURRENT_REQUESTS_KEY, 1)
            .unwrap();
        assert_eq!(limit, 1);

        storage.put_setting(MAX_CONCURRENT_REQUESTS_KEY, &4usize).unwrap();
        let limit: usize = storage
            .get_setting(MAX_CONCURRENT_REQUESTS_KEY, 1)
            .unwrap();
        assert_eq!(limit, 4);
    }

    #[test]
    fn test_setting_with_wrong_type_is_an_error() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.put_setting("name", &"text").unwrap();

        let result: StorageResult<usize> = storage.get_setting("name", 0);
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_session_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.load_session().unwrap().is_none());

        let mut session = CrawlSession::new();
        session.seed_url = Some("https://ex.com/".to_string());
        session.table.mark_completed("https://ex.com/", "seed".to_string());
        session.table.mark_fetching("https://ex.com/a");
        session
            .frontier
            .push(LinkCandidate::new("https://ex.com/a", "A"));
        session.frontier.toggle(0);
        session.progress = 50;

        storage.save_session(&session).unwrap();
        let restored = storage.load_session().unwrap().unwrap();

        assert_eq!(restored.seed_url.as_deref(), Some("https://ex.com/"));
        assert_eq!(restored.progress, 50);
        assert_eq!(restored.frontier.selected_urls(), vec!["https://ex.com/a"]);
        // An abandoned in-flight fetch comes back as pending
        assert_eq!(
            restored.table.status("https://ex.com/a"),
            Some(CrawlStatus::Pending)
        );
    }

    #[test]
    fn test_clear_session() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage.save_session(&CrawlSession::new()).unwrap();
        assert!(storage.load_session().unwrap().is_some());

        storage.clear_session().unwrap();
        assert!(storage.load_session().unwrap().is_none());
    }

    #[test]
    fn test_file_backed_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            storage
                .put_pages(&[completed("https://ex.com/a", "A")])
                .unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        let page = storage.get_page("https://ex.com/a").unwrap().unwrap();
        assert_eq!(page.content, "A");
    }
}
