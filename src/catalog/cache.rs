//! Caching implementations for catalogue types.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::warn;

use crate::cache::{CacheStorage, Cacheable};
use crate::paging::{ListResponse, Paging};
use crate::service::{CacheAvailability, CacheStore, Service};

use super::types::{Record, RecordId, RecordQuery};

// ============================================================================
// Cacheable implementations
// ============================================================================

impl Cacheable for Record {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn paging(&self) -> Option<Paging> {
    self.paging
  }

  fn entity_type() -> &'static str {
    "record"
  }
}

// ============================================================================
// Cache gateways
// ============================================================================

/// Cached record pages: cache gateway, availability predicate and store.
pub struct RecordPages<S> {
  storage: Arc<S>,
  /// How long before a cached page stops counting as available
  max_age: Option<Duration>,
}

impl<S: CacheStorage> RecordPages<S> {
  pub fn new(storage: Arc<S>, max_age: Option<Duration>) -> Self {
    Self { storage, max_age }
  }

  fn is_fresh(&self, cached_at: chrono::DateTime<Utc>) -> bool {
    match self.max_age {
      Some(max_age) => Utc::now() - cached_at <= max_age,
      None => true,
    }
  }
}

impl<S> Clone for RecordPages<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      max_age: self.max_age,
    }
  }
}

impl<S: CacheStorage> CacheAvailability for RecordPages<S> {
  type Request = RecordQuery;

  fn is_cache_available(&self, request: Option<&RecordQuery>) -> Option<bool> {
    let page = request?.page;
    match self.storage.page_cached_at::<Record>(page) {
      Ok(Some(cached_at)) => Some(self.is_fresh(cached_at)),
      Ok(None) => Some(false),
      Err(e) => {
        warn!(page, error = %e, "could not check cached page");
        None
      }
    }
  }
}

impl<S: CacheStorage> CacheStore for RecordPages<S> {
  type Item = Record;

  fn put_list(&self, items: &[Record]) -> Result<()> {
    self.storage.store_list(items)
  }

  /// Rows are keyed on the requested page so availability and reads find
  /// them even when the response carried no paging.
  fn put_page(&self, page: u32, items: &[Record]) -> Result<()> {
    self.storage.store_page(page, items)
  }

  fn remove_all(&self) -> Result<()> {
    self.storage.clear::<Record>()
  }
}

#[async_trait]
impl<S: CacheStorage> Service for RecordPages<S> {
  type Request = RecordQuery;
  type Response = ListResponse<Record>;

  async fn get(&self, request: Option<&RecordQuery>) -> Result<ListResponse<Record>> {
    let page = request.map(|query| query.page).unwrap_or_default();
    match self.storage.get_page::<Record>(page)? {
      Some(cached) => {
        let paging = cached.entities.first().and_then(|record| record.paging);
        Ok(ListResponse::new(cached.entities, paging))
      }
      None => Ok(ListResponse::new(Vec::new(), None)),
    }
  }
}

/// Cached single records.
pub struct RecordEntries<S> {
  storage: Arc<S>,
}

impl<S: CacheStorage> RecordEntries<S> {
  pub fn new(storage: Arc<S>) -> Self {
    Self { storage }
  }
}

impl<S> Clone for RecordEntries<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
    }
  }
}

impl<S: CacheStorage> CacheAvailability for RecordEntries<S> {
  type Request = RecordId;

  fn is_cache_available(&self, request: Option<&RecordId>) -> Option<bool> {
    let id = request?;
    match self.storage.get_entity::<Record>(&id.0) {
      Ok(entry) => Some(entry.is_some()),
      Err(e) => {
        warn!(%id, error = %e, "could not check cached record");
        None
      }
    }
  }
}

#[async_trait]
impl<S: CacheStorage> Service for RecordEntries<S> {
  type Request = RecordId;
  type Response = Record;

  async fn get(&self, request: Option<&RecordId>) -> Result<Record> {
    let id = request.ok_or_else(|| eyre!("A record id is required"))?;
    self
      .storage
      .get_entity::<Record>(&id.0)?
      .map(|cached| cached.entity)
      .ok_or_else(|| eyre!("Record {} is not cached", id))
  }
}
