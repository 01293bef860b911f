use async_trait::async_trait;
use tracing::debug;

use super::UseCase;
use crate::activity::{maybe_track, ActivityIndicator};
use crate::error::{FetchError, FetchResult};
use crate::service::{NoCache, Service};

/// Always-remote orchestrator for ephemeral query flows.
///
/// An optional cache gateway can still be peeked with `execute_cache`, but
/// `execute` never consults it and never writes to it.
pub struct SearchUseCase<S, C> {
  service: S,
  cache_service: Option<C>,
  activity: Option<ActivityIndicator>,
}

impl<S: Service> SearchUseCase<S, NoCache<S::Request, S::Response>> {
  pub fn new(service: S, activity: Option<ActivityIndicator>) -> Self {
    Self {
      service,
      cache_service: None,
      activity,
    }
  }
}

impl<S, C> SearchUseCase<S, C>
where
  S: Service,
  C: Service<Request = S::Request, Response = S::Response>,
{
  pub fn with_cache_service<C2>(self, cache_service: C2) -> SearchUseCase<S, C2>
  where
    C2: Service<Request = S::Request, Response = S::Response>,
  {
    SearchUseCase {
      service: self.service,
      cache_service: Some(cache_service),
      activity: self.activity,
    }
  }
}

#[async_trait]
impl<S, C> UseCase for SearchUseCase<S, C>
where
  S: Service,
  C: Service<Request = S::Request, Response = S::Response>,
{
  type Request = S::Request;
  type Response = S::Response;

  async fn execute_cache(&self, request: Option<&S::Request>) -> Option<FetchResult<S::Response>> {
    let cache_service = self.cache_service.as_ref()?;
    Some(cache_service.get(request).await.map_err(FetchError::Cache))
  }

  async fn execute(&self, request: Option<&S::Request>) -> FetchResult<S::Response> {
    debug!("searching remote");
    maybe_track(self.activity.as_ref(), self.service.get(request))
      .await
      .map_err(FetchError::Remote)
  }
}
