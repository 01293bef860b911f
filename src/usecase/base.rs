use async_trait::async_trait;
use tracing::debug;

use super::UseCase;
use crate::activity::{maybe_track, ActivityIndicator};
use crate::error::{FetchError, FetchResult};
use crate::service::Service;

/// Remote-only orchestrator with no cache at all.
pub struct BaseUseCase<S> {
  service: S,
  activity: Option<ActivityIndicator>,
}

impl<S: Service> BaseUseCase<S> {
  pub fn new(service: S, activity: Option<ActivityIndicator>) -> Self {
    Self { service, activity }
  }
}

#[async_trait]
impl<S: Service> UseCase for BaseUseCase<S> {
  type Request = S::Request;
  type Response = S::Response;

  async fn execute_cache(&self, _request: Option<&S::Request>) -> Option<FetchResult<S::Response>> {
    None
  }

  async fn execute(&self, request: Option<&S::Request>) -> FetchResult<S::Response> {
    debug!("fetching from remote");
    maybe_track(self.activity.as_ref(), self.service.get(request))
      .await
      .map_err(FetchError::Remote)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::usecase::fakes::FakeService;

  #[tokio::test]
  async fn test_execute_cache_is_empty() {
    let remote = FakeService::ok(5u32);
    let usecase = BaseUseCase::new(remote.clone(), None);

    assert!(usecase.execute_cache(Some(&1)).await.is_none());
    assert_eq!(remote.calls(), 0);
  }

  #[tokio::test]
  async fn test_execute_always_remote_and_tracked() {
    let activity = ActivityIndicator::new();
    let remote = FakeService::ok(5u32).observing(&activity);
    let usecase = BaseUseCase::new(remote.clone(), Some(activity.clone()));

    assert_eq!(usecase.execute(Some(&1)).await.unwrap(), 5);
    assert_eq!(usecase.execute(None).await.unwrap(), 5);
    assert_eq!(remote.calls(), 2);
    assert_eq!(remote.max_in_flight_seen(), 1);
    assert_eq!(activity.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_remote_failure_is_tagged() {
    let remote = FakeService::<u32, u32>::failing("timeout");
    let usecase = BaseUseCase::new(remote, None);

    let err = usecase.execute(None).await.unwrap_err();
    assert!(err.is_remote());
    assert_eq!(err.report().to_string(), "timeout");
  }
}
