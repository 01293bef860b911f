//! Cache-or-fetch orchestration for remote data.
//!
//! Each orchestrator in [`usecase`] decides per request whether to answer
//! from a local cache or from a remote service:
//! - [`usecase::BaseUseCase`]: remote only
//! - [`usecase::DetailUseCase`]: single entity, read-only cache
//! - [`usecase::ListUseCase`]: paginated list with page-aware invalidation
//!   and write-back
//! - [`usecase::SearchUseCase`]: remote only, cache can be peeked
//!
//! Remote calls can be tracked by a shared [`activity::ActivityIndicator`].

pub mod activity;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod paging;
pub mod service;
pub mod usecase;

pub use error::{FetchError, FetchResult};
