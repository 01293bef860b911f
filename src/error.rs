//! Error envelope shared by every orchestrator.

use color_eyre::Report;
use thiserror::Error;

/// Outcome of a single orchestrated fetch.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Failure tagged with the path it came from.
///
/// The wrapped reports are opaque: orchestrators forward them without
/// inspecting or retrying.
#[derive(Debug, Error)]
pub enum FetchError {
  /// Anything surfaced by the remote gateway
  #[error("remote failure: {0}")]
  Remote(Report),

  /// Anything surfaced by the cache gateway or cache store
  #[error("cache failure: {0}")]
  Cache(Report),
}

impl FetchError {
  pub fn is_remote(&self) -> bool {
    matches!(self, FetchError::Remote(_))
  }

  pub fn is_cache(&self) -> bool {
    matches!(self, FetchError::Cache(_))
  }

  /// The underlying report, whichever path produced it.
  pub fn report(&self) -> &Report {
    match self {
      FetchError::Remote(report) | FetchError::Cache(report) => report,
    }
  }
}
