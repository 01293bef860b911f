//! Orchestrators deciding between cache and remote for each request.
//!
//! All of them share the [`UseCase`] surface:
//! - `execute` runs the cache-or-fetch decision and yields exactly one result
//! - `execute_cache` peeks at the cache without any decision logic, yielding
//!   `None` when no cache collaborator is configured

mod base;
mod detail;
mod list;
mod search;

#[cfg(test)]
pub(crate) mod fakes;

pub use base::BaseUseCase;
pub use detail::DetailUseCase;
pub use list::ListUseCase;
pub use search::SearchUseCase;

use async_trait::async_trait;

use crate::error::FetchResult;

#[async_trait]
pub trait UseCase: Send + Sync {
  type Request: Send + Sync;
  type Response: Send;

  async fn execute_cache(
    &self,
    request: Option<&Self::Request>,
  ) -> Option<FetchResult<Self::Response>>;

  async fn execute(&self, request: Option<&Self::Request>) -> FetchResult<Self::Response>;
}
