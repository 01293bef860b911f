//! Record catalogue served over HTTP and cached locally.

mod cache;
mod client;
mod types;

pub use cache::{RecordEntries, RecordPages};
pub use client::{CatalogClient, RemoteDetail, RemoteList, RemoteSearch};
pub use types::{Record, RecordId, RecordQuery};

use color_eyre::Result;
use std::sync::Arc;

use crate::activity::ActivityIndicator;
use crate::cache::CacheStorage;
use crate::config::Config;
use crate::paging::ListResponse;
use crate::service::NoCache;
use crate::usecase::{DetailUseCase, ListUseCase, SearchUseCase};

pub type RecordList<S> = ListUseCase<RemoteList, RecordPages<S>, RecordPages<S>>;
pub type RecordDetail<S> = DetailUseCase<RemoteDetail, RecordEntries<S>, RecordEntries<S>>;
pub type RecordSearch = SearchUseCase<RemoteSearch, NoCache<RecordQuery, ListResponse<Record>>>;

/// Every record orchestrator, sharing one storage and one activity signal.
pub struct Catalog<S> {
  pub list: RecordList<S>,
  pub detail: RecordDetail<S>,
  pub search: RecordSearch,
  activity: ActivityIndicator,
  per_page: u32,
}

impl<S: CacheStorage + 'static> Catalog<S> {
  pub fn open(config: &Config, storage: S) -> Result<Self> {
    let client = CatalogClient::new(&config.remote)?;
    let storage = Arc::new(storage);
    let activity = ActivityIndicator::new();

    let pages = RecordPages::new(Arc::clone(&storage), config.cache.max_age());
    let list = ListUseCase::new(
      RemoteList::new(client.clone()),
      pages.clone(),
      Arc::new(pages),
      Some(activity.clone()),
    )
    .with_insert_to_cache(config.cache.insert_to_cache)
    .with_force_reload_from_cache(config.cache.force_reload_from_cache);

    let entries = RecordEntries::new(storage);
    let detail = DetailUseCase::new(RemoteDetail::new(client.clone()), Some(activity.clone()))
      .with_cache(entries.clone(), entries)
      .with_force_reload(config.detail.force_reload);

    let search = SearchUseCase::new(RemoteSearch::new(client), Some(activity.clone()));

    Ok(Self {
      list,
      detail,
      search,
      activity,
      per_page: config.remote.per_page,
    })
  }

  pub fn activity(&self) -> &ActivityIndicator {
    &self.activity
  }

  /// List request for `page` with the configured page size.
  pub fn page(&self, page: u32, force_reload: bool) -> RecordQuery {
    RecordQuery {
      page,
      per_page: self.per_page,
      force_reload,
      text: None,
    }
  }

  /// Search request for `text` with the configured page size.
  pub fn search_query(&self, text: &str, page: u32) -> RecordQuery {
    RecordQuery {
      text: Some(text.to_string()),
      ..self.page(page, true)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::usecase::UseCase;

  fn offline_catalog() -> Catalog<MemoryStorage> {
    let config = Config::from_yaml(
      "remote:\n  base_url: http://127.0.0.1:9\n  per_page: 5\n  timeout_secs: 1\n",
    )
    .unwrap();
    Catalog::open(&config, MemoryStorage::new()).unwrap()
  }

  #[test]
  fn test_queries_carry_page_size() {
    let catalog = offline_catalog();
    assert_eq!(catalog.page(2, false).per_page, 5);

    let search = catalog.search_query("rust", 1);
    assert_eq!(search.text.as_deref(), Some("rust"));
    assert!(search.force_reload);
  }

  #[tokio::test]
  async fn test_unreachable_remote_reports_remote_failure() {
    let catalog = offline_catalog();

    let err = catalog
      .list
      .execute(Some(&catalog.page(1, false)))
      .await
      .unwrap_err();
    catalog.list.settle().await;

    assert!(err.is_remote());
    assert!(!catalog.activity().is_busy());
  }

  #[tokio::test]
  async fn test_empty_cache_peek() {
    let catalog = offline_catalog();

    let peeked = catalog
      .list
      .execute_cache(Some(&catalog.page(1, false)))
      .await
      .unwrap()
      .unwrap();
    assert!(peeked.data.unwrap().list.is_empty());
    assert!(catalog.search.execute_cache(None).await.is_none());
  }
}
