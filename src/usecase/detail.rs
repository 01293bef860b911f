use async_trait::async_trait;
use tracing::debug;

use super::UseCase;
use crate::activity::{maybe_track, ActivityIndicator};
use crate::error::{FetchError, FetchResult};
use crate::service::{CacheAvailability, NoCache, Service};

/// Read-only cache-or-fetch for a request yielding exactly one entity.
///
/// The cache is only consulted when both the cache gateway and the
/// availability predicate are configured. Remote results are never written
/// back.
pub struct DetailUseCase<S, C, P> {
  service: S,
  cache_service: Option<C>,
  cache: Option<P>,
  force_reload: bool,
  activity: Option<ActivityIndicator>,
}

impl<S> DetailUseCase<S, NoCache<S::Request, S::Response>, NoCache<S::Request, S::Response>>
where
  S: Service,
{
  /// Orchestrator without a cache; every call goes to the remote.
  pub fn new(service: S, activity: Option<ActivityIndicator>) -> Self {
    Self {
      service,
      cache_service: None,
      cache: None,
      force_reload: false,
      activity,
    }
  }
}

impl<S, C, P> DetailUseCase<S, C, P>
where
  S: Service,
  C: Service<Request = S::Request, Response = S::Response>,
  P: CacheAvailability<Request = S::Request>,
{
  /// Attach a cache gateway and its availability predicate.
  pub fn with_cache<C2, P2>(self, cache_service: C2, cache: P2) -> DetailUseCase<S, C2, P2>
  where
    C2: Service<Request = S::Request, Response = S::Response>,
    P2: CacheAvailability<Request = S::Request>,
  {
    DetailUseCase {
      service: self.service,
      cache_service: Some(cache_service),
      cache: Some(cache),
      force_reload: self.force_reload,
      activity: self.activity,
    }
  }

  /// Always go to the remote, even when the cache could answer.
  pub fn with_force_reload(mut self, force_reload: bool) -> Self {
    self.force_reload = force_reload;
    self
  }

  fn cache_hit(&self, request: Option<&S::Request>) -> Option<&C> {
    if self.force_reload {
      return None;
    }
    let cache = self.cache.as_ref()?;
    let cache_service = self.cache_service.as_ref()?;
    (cache.is_cache_available(request) == Some(true)).then_some(cache_service)
  }
}

#[async_trait]
impl<S, C, P> UseCase for DetailUseCase<S, C, P>
where
  S: Service,
  C: Service<Request = S::Request, Response = S::Response>,
  P: CacheAvailability<Request = S::Request>,
{
  type Request = S::Request;
  type Response = S::Response;

  async fn execute_cache(&self, request: Option<&S::Request>) -> Option<FetchResult<S::Response>> {
    let cache_service = self.cache_service.as_ref()?;
    Some(cache_service.get(request).await.map_err(FetchError::Cache))
  }

  async fn execute(&self, request: Option<&S::Request>) -> FetchResult<S::Response> {
    if let Some(cache_service) = self.cache_hit(request) {
      debug!("serving detail from cache");
      return cache_service.get(request).await.map_err(FetchError::Cache);
    }

    debug!(force_reload = self.force_reload, "fetching detail from remote");
    maybe_track(self.activity.as_ref(), self.service.get(request))
      .await
      .map_err(FetchError::Remote)
  }
}
