//! Core traits and types for the cache storage backends.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{de::DeserializeOwned, Serialize};

use crate::paging::Paging;

/// Trait for entities that can be cached.
///
/// Entities are stored under `(entity_type, cache_key)`, so writing the same
/// entity twice replaces it instead of duplicating it.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity (e.g., record id)
  fn cache_key(&self) -> String;

  /// Page this entity arrived on, if it has been stamped.
  fn paging(&self) -> Option<Paging>;

  /// Entity type name for storage organization (e.g., "record")
  fn entity_type() -> &'static str;
}

/// A cached page in arrival order.
#[derive(Debug, Clone)]
pub struct CachedPage<T> {
  pub entities: Vec<T>,
  /// Oldest write among the page's entities
  pub cached_at: DateTime<Utc>,
}

/// A single cached entity.
#[derive(Debug, Clone)]
pub struct CachedEntity<T> {
  pub entity: T,
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Upsert entities, keeping their arrival order.
  fn store_list<T: Cacheable>(&self, entities: &[T]) -> Result<()>;

  /// Upsert entities under `page`, whatever page they are stamped with.
  fn store_page<T: Cacheable>(&self, page: u32, entities: &[T]) -> Result<()>;

  /// Remove every entity of type `T`.
  fn clear<T: Cacheable>(&self) -> Result<()>;

  /// Entities stamped with `page`, or `None` when nothing is stored for it.
  fn get_page<T: Cacheable>(&self, page: u32) -> Result<Option<CachedPage<T>>>;

  /// When `page` was cached, without decoding its entities.
  fn page_cached_at<T: Cacheable>(&self, page: u32) -> Result<Option<DateTime<Utc>>>;

  /// Get a single entity by key.
  fn get_entity<T: Cacheable>(&self, entity_key: &str) -> Result<Option<CachedEntity<T>>>;
}
