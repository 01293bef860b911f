//! In-crate collaborators for orchestrator tests.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::activity::ActivityIndicator;
use crate::paging::{ListRequest, ListResponse, PageCursor, Pageable, Paging};
use crate::service::{CacheAvailability, CacheStore, Service};

// ============================================================================
// Gateways
// ============================================================================

struct FakeInner<T> {
  outcome: Mutex<std::result::Result<T, String>>,
  hang: bool,
  calls: AtomicUsize,
  observed: Mutex<Option<ActivityIndicator>>,
  max_in_flight: AtomicUsize,
}

/// Gateway returning a fixed outcome and counting its calls.
pub(crate) struct FakeService<R, T> {
  inner: Arc<FakeInner<T>>,
  _marker: PhantomData<fn(R)>,
}

impl<R, T> Clone for FakeService<R, T> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
      _marker: PhantomData,
    }
  }
}

impl<R, T> FakeService<R, T> {
  fn build(outcome: std::result::Result<T, String>, hang: bool) -> Self {
    Self {
      inner: Arc::new(FakeInner {
        outcome: Mutex::new(outcome),
        hang,
        calls: AtomicUsize::new(0),
        observed: Mutex::new(None),
        max_in_flight: AtomicUsize::new(0),
      }),
      _marker: PhantomData,
    }
  }

  pub fn ok(value: T) -> Self {
    Self::build(Ok(value), false)
  }

  pub fn failing(message: &str) -> Self {
    Self::build(Err(message.to_string()), false)
  }

  /// Never completes.
  pub fn hanging(value: T) -> Self {
    Self::build(Ok(value), true)
  }

  /// Record the activity counter seen while each call runs.
  pub fn observing(self, activity: &ActivityIndicator) -> Self {
    *self.inner.observed.lock().unwrap() = Some(activity.clone());
    self
  }

  pub fn calls(&self) -> usize {
    self.inner.calls.load(Ordering::SeqCst)
  }

  pub fn max_in_flight_seen(&self) -> usize {
    self.inner.max_in_flight.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl<R, T> Service for FakeService<R, T>
where
  R: Send + Sync,
  T: Clone + Send + 'static,
{
  type Request = R;
  type Response = T;

  async fn get(&self, _request: Option<&R>) -> Result<T> {
    self.inner.calls.fetch_add(1, Ordering::SeqCst);
    let observed = self.inner.observed.lock().unwrap().clone();
    if let Some(activity) = observed {
      self
        .inner
        .max_in_flight
        .fetch_max(activity.in_flight(), Ordering::SeqCst);
    }
    if self.inner.hang {
      std::future::pending::<()>().await;
    }
    let outcome = self.inner.outcome.lock().unwrap().clone();
    outcome.map_err(|message| eyre!(message))
  }
}

/// Availability predicate with a fixed answer.
pub(crate) struct FixedAvailability<R> {
  answer: Option<bool>,
  _marker: PhantomData<fn(R)>,
}

impl<R> FixedAvailability<R> {
  pub fn new(answer: Option<bool>) -> Self {
    Self {
      answer,
      _marker: PhantomData,
    }
  }
}

impl<R> CacheAvailability for FixedAvailability<R> {
  type Request = R;

  fn is_cache_available(&self, _request: Option<&R>) -> Option<bool> {
    self.answer
  }
}

// ============================================================================
// List store
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TestItem {
  pub id: u32,
  pub paging: Option<Paging>,
}

impl Pageable for TestItem {
  fn set_paging(&mut self, paging: Paging) {
    self.paging = Some(paging);
  }
}

pub(crate) fn items(ids: &[u32]) -> Vec<TestItem> {
  ids
    .iter()
    .map(|&id| TestItem { id, paging: None })
    .collect()
}

pub(crate) fn paged(ids: &[u32], current_page: u32) -> ListResponse<TestItem> {
  ListResponse::new(
    items(ids),
    Some(Paging {
      current_page,
      limit_per_page: 10,
      total_page: 3,
    }),
  )
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TestRequest {
  pub cursor: Option<PageCursor>,
}

impl ListRequest for TestRequest {
  fn page_cursor(&self) -> Option<PageCursor> {
    self.cursor
  }
}

pub(crate) fn page(page: u32, force_reload: bool) -> TestRequest {
  TestRequest {
    cursor: Some(PageCursor::new(page, force_reload)),
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreOp {
  RemoveAll,
  PutList(Vec<u32>),
}

/// Store that logs every mutation in order.
#[derive(Default)]
pub(crate) struct RecordingStore {
  items: Mutex<Vec<TestItem>>,
  ops: Mutex<Vec<StoreOp>>,
  available: Mutex<Option<bool>>,
  fail_writes: AtomicBool,
  lose_writes: AtomicBool,
  write_delay: Mutex<Option<Duration>>,
}

impl RecordingStore {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn with_items(items: Vec<TestItem>) -> Arc<Self> {
    let store = Self::default();
    *store.items.lock().unwrap() = items;
    Arc::new(store)
  }

  pub fn set_available(&self, available: Option<bool>) {
    *self.available.lock().unwrap() = available;
  }

  /// Make every write fail.
  pub fn fail_writes(&self) {
    self.fail_writes.store(true, Ordering::SeqCst);
  }

  /// Accept writes without keeping them, as if another writer cleared the store.
  pub fn lose_writes(&self) {
    self.lose_writes.store(true, Ordering::SeqCst);
  }

  /// Block every `put_list` for `delay` before applying it.
  pub fn slow_writes(&self, delay: Duration) {
    *self.write_delay.lock().unwrap() = Some(delay);
  }

  pub fn ops(&self) -> Vec<StoreOp> {
    self.ops.lock().unwrap().clone()
  }

  pub fn items(&self) -> Vec<TestItem> {
    self.items.lock().unwrap().clone()
  }
}

impl CacheAvailability for RecordingStore {
  type Request = TestRequest;

  fn is_cache_available(&self, _request: Option<&TestRequest>) -> Option<bool> {
    *self.available.lock().unwrap()
  }
}

impl CacheStore for RecordingStore {
  type Item = TestItem;

  fn put_list(&self, items: &[TestItem]) -> Result<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(eyre!("disk full"));
    }
    let delay = *self.write_delay.lock().unwrap();
    if let Some(delay) = delay {
      std::thread::sleep(delay);
    }
    self
      .ops
      .lock()
      .unwrap()
      .push(StoreOp::PutList(items.iter().map(|item| item.id).collect()));
    if self.lose_writes.load(Ordering::SeqCst) {
      return Ok(());
    }
    let mut stored = self.items.lock().unwrap();
    for item in items {
      match stored.iter_mut().find(|existing| existing.id == item.id) {
        Some(existing) => *existing = item.clone(),
        None => stored.push(item.clone()),
      }
    }
    Ok(())
  }

  fn remove_all(&self) -> Result<()> {
    if self.fail_writes.load(Ordering::SeqCst) {
      return Err(eyre!("disk full"));
    }
    self.ops.lock().unwrap().push(StoreOp::RemoveAll);
    self.items.lock().unwrap().clear();
    Ok(())
  }
}

/// Cache gateway reading whatever the store currently holds for a page.
pub(crate) struct StoreCache {
  store: Arc<RecordingStore>,
  calls: Arc<AtomicUsize>,
}

impl StoreCache {
  pub fn new(store: &Arc<RecordingStore>) -> Self {
    Self {
      store: Arc::clone(store),
      calls: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn counter(&self) -> Arc<AtomicUsize> {
    Arc::clone(&self.calls)
  }
}

#[async_trait]
impl Service for StoreCache {
  type Request = TestRequest;
  type Response = ListResponse<TestItem>;

  async fn get(&self, request: Option<&TestRequest>) -> Result<ListResponse<TestItem>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    let page = request.and_then(|request| request.cursor).map(|c| c.page);
    let list: Vec<TestItem> = self
      .store
      .items()
      .into_iter()
      .filter(|item| match page {
        Some(page) => item.paging.map(|p| p.current_page) == Some(page),
        None => true,
      })
      .collect();
    let paging = list.first().and_then(|item| item.paging);
    Ok(ListResponse::new(list, paging))
  }
}
