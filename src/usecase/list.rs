use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::UseCase;
use crate::activity::{maybe_track, ActivityIndicator};
use crate::error::{FetchError, FetchResult};
use crate::paging::{cursor_of, ListRequest, PageCursor, ResponseList};
use crate::service::{CacheStore, Service};

type ItemOf<S> = <<S as Service>::Response as ResponseList>::Item;

/// Cache-or-fetch for paginated lists, with page-aware invalidation.
///
/// A remote result for page 0 or 1 replaces everything in the store; later
/// pages are added on top. The store mutation runs on a blocking worker and
/// is not awaited by the caller, except when `force_reload_from_cache` asks
/// for the result to be re-read from the cache after the write.
///
/// Cache reads made through this orchestrator wait for the write-backs
/// dispatched before them, so they never observe a half-applied page.
pub struct ListUseCase<S, C, P> {
  service: S,
  cache_service: C,
  cache: Arc<P>,
  lane: Arc<WriteLane>,
  insert_to_cache: bool,
  force_reload_from_cache: bool,
  activity: Option<ActivityIndicator>,
}

/// Orders write-backs and lets readers wait for them.
///
/// Each write-back takes a ticket at dispatch and runs once every earlier
/// ticket has finished.
struct WriteLane {
  dispatched: AtomicU64,
  finished: watch::Sender<u64>,
}

impl WriteLane {
  fn new() -> Self {
    Self {
      dispatched: AtomicU64::new(0),
      finished: watch::channel(0).0,
    }
  }

  fn ticket(&self) -> u64 {
    self.dispatched.fetch_add(1, Ordering::SeqCst) + 1
  }

  async fn wait_finished(&self, ticket: u64) {
    let mut finished = self.finished.subscribe();
    // The sender lives in `self`, so the channel cannot close here
    let _ = finished.wait_for(|done| *done >= ticket).await;
  }

  /// Wait for every write-back dispatched so far.
  async fn drained(&self) {
    self.wait_finished(self.dispatched.load(Ordering::SeqCst)).await;
  }

  fn finish(&self, ticket: u64) {
    self.finished.send_modify(|done| *done = ticket);
  }
}

impl<S, C, P> ListUseCase<S, C, P>
where
  S: Service,
  S::Request: ListRequest,
  S::Response: ResponseList,
  C: Service<Request = S::Request, Response = S::Response>,
  P: CacheStore<Request = S::Request, Item = ItemOf<S>> + 'static,
{
  pub fn new(
    service: S,
    cache_service: C,
    cache: Arc<P>,
    activity: Option<ActivityIndicator>,
  ) -> Self {
    Self {
      service,
      cache_service,
      cache,
      lane: Arc::new(WriteLane::new()),
      insert_to_cache: true,
      force_reload_from_cache: false,
      activity,
    }
  }

  /// Write remote items into the store (default `true`).
  pub fn with_insert_to_cache(mut self, insert_to_cache: bool) -> Self {
    self.insert_to_cache = insert_to_cache;
    self
  }

  /// Answer remote fetches with a cache re-read after the write (default `false`).
  pub fn with_force_reload_from_cache(mut self, force_reload_from_cache: bool) -> Self {
    self.force_reload_from_cache = force_reload_from_cache;
    self
  }

  /// Wait until every write-back dispatched so far has finished.
  pub async fn settle(&self) {
    self.lane.drained().await;
  }

  /// Queue clear-then-insert behind earlier write-backs without waiting.
  ///
  /// Once dispatched the write-back runs to completion even if the caller
  /// goes away.
  fn write_back(&self, cursor: PageCursor, items: Vec<ItemOf<S>>) -> JoinHandle<Result<()>> {
    let lane = Arc::clone(&self.lane);
    let cache = Arc::clone(&self.cache);
    let ticket = lane.ticket();
    let clear = cursor.starts_listing();

    tokio::spawn(async move {
      lane.wait_finished(ticket - 1).await;

      let inserted = items.len();
      let result =
        tokio::task::spawn_blocking(move || apply_write_back(&*cache, cursor.page, clear, &items))
          .await
          .unwrap_or_else(|e| Err(eyre!("cache write-back aborted: {}", e)));
      match &result {
        Ok(()) => debug!(clear, inserted, "cache write-back done"),
        Err(e) => warn!(error = %e, "cache write-back failed"),
      }

      lane.finish(ticket);
      result
    })
  }
}

fn apply_write_back<P: CacheStore>(
  cache: &P,
  page: u32,
  clear: bool,
  items: &[P::Item],
) -> Result<()> {
  if clear {
    cache.remove_all()?;
  }
  if !items.is_empty() {
    cache.put_page(page, items)?;
  }
  Ok(())
}

#[async_trait]
impl<S, C, P> UseCase for ListUseCase<S, C, P>
where
  S: Service,
  S::Request: ListRequest,
  S::Response: ResponseList,
  C: Service<Request = S::Request, Response = S::Response>,
  P: CacheStore<Request = S::Request, Item = ItemOf<S>> + 'static,
{
  type Request = S::Request;
  type Response = S::Response;

  async fn execute_cache(&self, request: Option<&S::Request>) -> Option<FetchResult<S::Response>> {
    self.lane.drained().await;
    Some(
      self
        .cache_service
        .get(request)
        .await
        .map_err(FetchError::Cache),
    )
  }

  async fn execute(&self, request: Option<&S::Request>) -> FetchResult<S::Response> {
    let cursor = cursor_of(request);

    if !cursor.force_reload {
      self.lane.drained().await;
      if self.cache.is_cache_available(request) == Some(true) {
        debug!(page = cursor.page, "serving list page from cache");
        return self
          .cache_service
          .get(request)
          .await
          .map_err(FetchError::Cache);
      }
    }

    debug!(
      page = cursor.page,
      force_reload = cursor.force_reload,
      "fetching list page from remote"
    );
    let mut response = maybe_track(self.activity.as_ref(), self.service.get(request))
      .await
      .map_err(FetchError::Remote)?;
    response.stamp_paging();

    let items = if self.insert_to_cache {
      response.items().to_vec()
    } else {
      Vec::new()
    };
    let inserted = items.len();
    let pending = self.write_back(cursor, items);

    if !self.force_reload_from_cache {
      return Ok(response);
    }

    match pending.await {
      Ok(Ok(())) => {}
      Ok(Err(e)) => return Err(FetchError::Cache(e)),
      Err(e) => return Err(FetchError::Cache(eyre!("cache write-back aborted: {}", e))),
    }

    let cached = self
      .cache_service
      .get(request)
      .await
      .map_err(FetchError::Cache)?;
    if inserted > 0 && cached.items().is_empty() {
      return Err(FetchError::Cache(eyre!("inconsistent re-read")));
    }
    Ok(cached)
  }
}
