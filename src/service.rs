//! Contracts for the collaborators an orchestrator composes.
//!
//! - [`Service`]: single-shot async retrieval. Both the remote gateway and
//!   the cache gateway implement it.
//! - [`CacheAvailability`]: whether the cache can answer a request.
//! - [`CacheStore`]: the bulk mutations list orchestrators perform.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::marker::PhantomData;
use std::sync::Arc;

/// Single-shot retrieval for an optional request.
///
/// Implementations must not retry internally on behalf of the caller.
#[async_trait]
pub trait Service: Send + Sync {
  type Request: Send + Sync;
  type Response: Send;

  async fn get(&self, request: Option<&Self::Request>) -> Result<Self::Response>;
}

/// Availability predicate consulted before serving a request from cache.
///
/// `None` means unknown, which never counts as a hit.
pub trait CacheAvailability: Send + Sync {
  type Request;

  fn is_cache_available(&self, request: Option<&Self::Request>) -> Option<bool>;
}

/// Bulk mutations on the cache backing a list.
///
/// Called from a blocking worker, never from the async caller.
pub trait CacheStore: CacheAvailability {
  type Item;

  /// Upsert `items`. Writing the same items twice leaves the store unchanged.
  fn put_list(&self, items: &[Self::Item]) -> Result<()>;

  /// Upsert `items` fetched for `page`.
  ///
  /// Stores that index items by page override this so lookups by the
  /// requested page find them even when the items carry no paging.
  fn put_page(&self, page: u32, items: &[Self::Item]) -> Result<()> {
    let _ = page;
    self.put_list(items)
  }

  /// Drop everything the store holds.
  fn remove_all(&self) -> Result<()>;
}

#[async_trait]
impl<S> Service for Arc<S>
where
  S: Service + ?Sized,
{
  type Request = S::Request;
  type Response = S::Response;

  async fn get(&self, request: Option<&Self::Request>) -> Result<Self::Response> {
    (**self).get(request).await
  }
}

impl<P> CacheAvailability for Arc<P>
where
  P: CacheAvailability + ?Sized,
{
  type Request = P::Request;

  fn is_cache_available(&self, request: Option<&Self::Request>) -> Option<bool> {
    (**self).is_cache_available(request)
  }
}

impl<P> CacheStore for Arc<P>
where
  P: CacheStore + ?Sized,
{
  type Item = P::Item;

  fn put_list(&self, items: &[Self::Item]) -> Result<()> {
    (**self).put_list(items)
  }

  fn put_page(&self, page: u32, items: &[Self::Item]) -> Result<()> {
    (**self).put_page(page, items)
  }

  fn remove_all(&self) -> Result<()> {
    (**self).remove_all()
  }
}

/// Placeholder for an absent cache collaborator.
///
/// Reports no availability and fails any retrieval, so it only fills the
/// type slot of an orchestrator built without a cache.
pub struct NoCache<R, T> {
  _marker: PhantomData<fn() -> (R, T)>,
}

impl<R, T> NoCache<R, T> {
  pub fn new() -> Self {
    Self {
      _marker: PhantomData,
    }
  }
}

impl<R, T> Default for NoCache<R, T> {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl<R, T> Service for NoCache<R, T>
where
  R: Send + Sync,
  T: Send,
{
  type Request = R;
  type Response = T;

  async fn get(&self, _request: Option<&R>) -> Result<T> {
    Err(eyre!("no cache configured"))
  }
}

impl<R, T> CacheAvailability for NoCache<R, T> {
  type Request = R;

  fn is_cache_available(&self, _request: Option<&R>) -> Option<bool> {
    None
  }
}
