//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

/// A stored response: enough to replay it to a caller later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

/// A cache hit with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub response: CachedResponse,
  /// When the response was written into the bucket.
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStore: Send + Sync {
  /// Store a response under `(bucket, url)`, replacing any previous entry.
  fn put(&self, bucket: &str, url: &str, response: &CachedResponse) -> Result<()>;

  /// Look up the response cached for `(bucket, url)`.
  fn get(&self, bucket: &str, url: &str) -> Result<Option<CacheEntry>>;

  /// Names of all buckets that currently hold entries.
  fn buckets(&self) -> Result<Vec<String>>;

  /// Drop a bucket and everything in it.
  fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

/// SQLite-based cache storage.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open the cache database at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open an in-memory cache, used by tests.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("kelime").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the response cache.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS response_cache (
    bucket TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (bucket, url)
);

CREATE INDEX IF NOT EXISTS idx_response_cache_bucket ON response_cache(bucket);
"#;

impl CacheStore for SqliteStore {
  fn put(&self, bucket: &str, url: &str, response: &CachedResponse) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO response_cache (bucket, url, status, content_type, body, cached_at)
         VALUES (?, ?, ?, ?, ?, datetime('now'))",
        params![
          bucket,
          url,
          response.status,
          response.content_type,
          response.body
        ],
      )
      .map_err(|e| eyre!("Failed to store response: {}", e))?;

    Ok(())
  }

  fn get(&self, bucket: &str, url: &str) -> Result<Option<CacheEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(u16, Option<String>, Vec<u8>, String)> = conn
      .query_row(
        "SELECT status, content_type, body, cached_at FROM response_cache
         WHERE bucket = ? AND url = ?",
        params![bucket, url],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query response cache: {}", e))?;

    match row {
      Some((status, content_type, body, cached_at_str)) => {
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CacheEntry {
          response: CachedResponse {
            status,
            content_type,
            body,
          },
          cached_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn buckets(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT DISTINCT bucket FROM response_cache ORDER BY bucket")
      .map_err(|e| eyre!("Failed to prepare bucket query: {}", e))?;

    let buckets: Vec<String> = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list buckets: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(buckets)
  }

  fn delete_bucket(&self, bucket: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM response_cache WHERE bucket = ?",
        params![bucket],
      )
      .map_err(|e| eyre!("Failed to delete bucket: {}", e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn response(body: &str) -> CachedResponse {
    CachedResponse {
      status: 200,
      content_type: Some("application/json".to_string()),
      body: body.as_bytes().to_vec(),
    }
  }

  #[test]
  fn test_put_get_roundtrip() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .put("v1", "https://example.com/", &response("hello"))
      .unwrap();

    let entry = store.get("v1", "https://example.com/").unwrap().unwrap();
    assert_eq!(entry.response, response("hello"));
    assert!(entry.cached_at <= Utc::now());
  }

  #[test]
  fn test_get_misses_other_bucket() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .put("v1", "https://example.com/", &response("hello"))
      .unwrap();

    assert!(store.get("v2", "https://example.com/").unwrap().is_none());
  }

  #[test]
  fn test_put_replaces_previous_entry() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .put("v1", "https://example.com/", &response("old"))
      .unwrap();
    store
      .put("v1", "https://example.com/", &response("new"))
      .unwrap();

    let entry = store.get("v1", "https://example.com/").unwrap().unwrap();
    assert_eq!(entry.response.body, b"new".to_vec());
  }

  #[test]
  fn test_buckets_and_delete_bucket() {
    let store = SqliteStore::open_in_memory().unwrap();
    store
      .put("v1", "https://example.com/a", &response("a"))
      .unwrap();
    store
      .put("v2", "https://example.com/b", &response("b"))
      .unwrap();

    assert_eq!(store.buckets().unwrap(), vec!["v1", "v2"]);

    store.delete_bucket("v1").unwrap();

    assert_eq!(store.buckets().unwrap(), vec!["v2"]);
    assert!(store.get("v1", "https://example.com/a").unwrap().is_none());
  }
}
