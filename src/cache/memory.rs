//! In-process cache storage.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use super::traits::{CacheStorage, CachedEntity, CachedPage, Cacheable};

struct Row {
  data: serde_json::Value,
  page: Option<u32>,
  position: u64,
  cached_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
  rows: HashMap<(&'static str, String), Row>,
  next_position: u64,
}

/// Storage kept in memory for the lifetime of the process.
///
/// Same contract as [`super::SqliteStorage`]; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
  tables: Mutex<Tables>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }

  fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
    self
      .tables
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  fn page_rows<'a, T: Cacheable>(tables: &'a Tables, page: u32) -> Vec<&'a Row> {
    let mut rows: Vec<&Row> = tables
      .rows
      .iter()
      .filter(|((entity_type, _), row)| *entity_type == T::entity_type() && row.page == Some(page))
      .map(|(_, row)| row)
      .collect();
    rows.sort_by_key(|row| row.position);
    rows
  }

  fn insert_rows<T: Cacheable>(&self, page: Option<u32>, entities: &[T]) -> Result<()> {
    let mut tables = self.tables()?;
    let now = Utc::now();

    for entity in entities {
      let data =
        serde_json::to_value(entity).map_err(|e| eyre!("Failed to serialize entity: {}", e))?;
      let position = tables.next_position;
      tables.next_position += 1;
      tables.rows.insert(
        (T::entity_type(), entity.cache_key()),
        Row {
          data,
          page: page.or_else(|| entity.paging().map(|paging| paging.current_page)),
          position,
          cached_at: now,
        },
      );
    }

    Ok(())
  }
}

impl CacheStorage for MemoryStorage {
  fn store_list<T: Cacheable>(&self, entities: &[T]) -> Result<()> {
    self.insert_rows(None, entities)
  }

  fn store_page<T: Cacheable>(&self, page: u32, entities: &[T]) -> Result<()> {
    self.insert_rows(Some(page), entities)
  }

  fn clear<T: Cacheable>(&self) -> Result<()> {
    self
      .tables()?
      .rows
      .retain(|(entity_type, _), _| *entity_type != T::entity_type());
    Ok(())
  }

  fn get_page<T: Cacheable>(&self, page: u32) -> Result<Option<CachedPage<T>>> {
    let tables = self.tables()?;
    let rows = Self::page_rows::<T>(&tables, page);

    let cached_at = match rows.iter().map(|row| row.cached_at).min() {
      Some(at) => at,
      None => return Ok(None),
    };

    let entities = rows
      .iter()
      .filter_map(|row| match serde_json::from_value(row.data.clone()) {
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
    let tables = self.tables()?;
    Ok(
      Self::page_rows::<T>(&tables, page)
        .iter()
        .map(|row| row.cached_at)
        .min(),
    )
  }

  fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>> {
    let tables = self.tables()?;

    match tables.rows.get(&(T::entity_type(), entity_key.to_string())) {
      Some(row) => {
        let entity: T = serde_json::from_value(row.data.clone())
          .map_err(|e| eyre!("Failed to deserialize entity: {}", e))?;
        Ok(Some(CachedEntity {
          entity,
          cached_at: row.cached_at,
        }))
      }
      None => Ok(None),
    }
  }
}
