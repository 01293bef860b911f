//! SQLite cache storage.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use super::traits::{CacheStorage, CachedEntity, CachedPage, Cacheable};

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the storage at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the storage at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("fetchwise").join("cache.db"))
  }

  fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    self
      .conn()?
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- Entities stored as serialized JSON, tagged with the page they arrived on
CREATE TABLE IF NOT EXISTS entity_cache (
    entity_type TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    data BLOB NOT NULL,
    page INTEGER,
    position INTEGER NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (entity_type, entity_key)
);

CREATE INDEX IF NOT EXISTS idx_entity_cache_page
    ON entity_cache(entity_type, page, position);
"#;

impl SqliteStorage {
  /// Upsert `entities` in one transaction, keyed on `page` or on their stamps.
  fn insert_rows<T: Cacheable>(&self, page: Option<u32>, entities: &[T]) -> Result<()> {
    let mut conn = self.conn()?;
    let entity_type = T::entity_type();

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    let next_position: i64 = tx
      .query_row(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM entity_cache WHERE entity_type = ?",
        params![entity_type],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to read positions: {}", e))?;

    for (offset, entity) in entities.iter().enumerate() {
      let data =
        serde_json::to_vec(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;
      let page = page.or_else(|| entity.paging().map(|paging| paging.current_page));

      tx.execute(
        "INSERT OR REPLACE INTO entity_cache (entity_type, entity_key, data, page, position, cached_at)
         VALUES (?, ?, ?, ?, ?, datetime('now'))",
        params![
          entity_type,
          entity.cache_key(),
          data,
          page,
          next_position + offset as i64
        ],
      )
      .map_err(|e| eyre!("Failed to store entity: {}", e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}

impl CacheStorage for SqliteStorage {
  fn store_list<T: Cacheable>(&self, entities: &[T]) -> Result<()> {
    self.insert_rows(None, entities)
  }

  fn store_page<T: Cacheable>(&self, page: u32, entities: &[T]) -> Result<()> {
    self.insert_rows(Some(page), entities)
  }

  fn clear<T: Cacheable>(&self) -> Result<()> {
    self
      .conn()?
      .execute(
        "DELETE FROM entity_cache WHERE entity_type = ?",
        params![T::entity_type()],
      )
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    Ok(())
  }

  fn get_page<T: Cacheable>(&self, page: u32) -> Result<Option<CachedPage<T>>> {
    let conn = self.conn()?;

    let mut stmt = conn
      .prepare(
        "SELECT data, cached_at FROM entity_cache
         WHERE entity_type = ? AND page = ?
         ORDER BY position",
      )
      .map_err(|e| eyre!("Failed to prepare page query: {}", e))?;

    let rows: Vec<(Vec<u8>, String)> = stmt
      .query_map(params![T::entity_type(), page], |row| {
        Ok((row.get(0)?, row.get(1)?))
      })
      .map_err(|e| eyre!("Failed to query page: {}", e))?
      .filter_map(|row| match row {
        Ok(row) => Some(row),
        Err(e) => {
          warn!(page, error = %e, "skipping unreadable cache row");
          None
        }
      })
      .collect();

    // Oldest write decides the age of the page
    let cached_at = match rows.iter().map(|(_, at)| at.as_str()).min() {
      Some(at) => parse_datetime(at)?,
      None => return Ok(None),
    };

    let entities: Vec<T> = rows
      .iter()
      .filter_map(|(data, _)| match serde_json::from_slice(data) {
        Ok(entity) => Some(entity),
        Err(e) => {
          warn!(page, error = %e, "skipping undecodable cache entry");
          None
        }
      })
      .collect();

    Ok(Some(CachedPage {
      entities,
      cached_at,
    }))
  }

  fn page_cached_at<T: Cacheable>(&self, page: u32) -> Result<Option<DateTime<Utc>>> {
    let conn = self.conn()?;

    let oldest: Option<String> = conn
      .query_row(
        "SELECT MIN(cached_at) FROM entity_cache WHERE entity_type = ? AND page = ?",
        params![T::entity_type(), page],
        |row| row.get(0),
      )
      .map_err(|e| eyre!("Failed to query page age: {}", e))?;

    oldest.as_deref().map(parse_datetime).transpose()
  }

  fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>> {
    let conn = self.conn()?;

    let result: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM entity_cache
         WHERE entity_type = ? AND entity_key = ?",
        params![T::entity_type(), entity_key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query entity {}: {}", entity_key, e))?;

    match result {
      Some((data, cached_at_str)) => {
        let entity: T = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize entity: {}", e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedEntity { entity, cached_at }))
      }
      None => Ok(None),
    }
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
