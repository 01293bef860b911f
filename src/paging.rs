//! Pagination metadata carried by list requests and list responses.

use serde::{Deserialize, Serialize};

/// Page position reported by the remote for one list response.
///
/// Missing fields decode as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Paging {
  pub current_page: u32,
  pub limit_per_page: u32,
  pub total_page: u32,
}

/// Which page a list request asks for, and whether it must bypass the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
  pub page: u32,
  pub force_reload: bool,
}

impl PageCursor {
  pub fn new(page: u32, force_reload: bool) -> Self {
    Self { page, force_reload }
  }

  /// Page 0 and page 1 both start a fresh listing.
  pub fn starts_listing(&self) -> bool {
    self.page <= 1
  }
}

impl Default for PageCursor {
  /// Requests without pagination metadata always go to the remote.
  fn default() -> Self {
    Self {
      page: 0,
      force_reload: true,
    }
  }
}

/// Requests that may carry pagination metadata.
pub trait ListRequest {
  fn page_cursor(&self) -> Option<PageCursor>;
}

/// Resolve the cursor for an optional request, falling back to the default.
pub fn cursor_of<R: ListRequest>(request: Option<&R>) -> PageCursor {
  request
    .and_then(ListRequest::page_cursor)
    .unwrap_or_default()
}

/// Items that remember the page they arrived on.
pub trait Pageable {
  fn set_paging(&mut self, _paging: Paging) {}
}

/// A response that carries a list of items.
pub trait ResponseList: Send + 'static {
  type Item: Clone + Send + Sync + 'static;

  fn items(&self) -> &[Self::Item];

  /// Stamp every item with the paging of this response.
  fn stamp_paging(&mut self) {}
}

/// Body of a paged list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListData<T> {
  #[serde(default = "Vec::new")]
  pub list: Vec<T>,
  pub paging: Option<Paging>,
}

/// List response with an optional `data.list` / `data.paging` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
  pub data: Option<ListData<T>>,
}

impl<T> ListResponse<T> {
  pub fn new(list: Vec<T>, paging: Option<Paging>) -> Self {
    Self {
      data: Some(ListData { list, paging }),
    }
  }

  pub fn empty() -> Self {
    Self { data: None }
  }

  pub fn paging(&self) -> Option<Paging> {
    self.data.as_ref().and_then(|data| data.paging)
  }
}

impl<T> ResponseList for ListResponse<T>
where
  T: Pageable + Clone + Send + Sync + 'static,
{
  type Item = T;

  fn items(&self) -> &[T] {
    self
      .data
      .as_ref()
      .map(|data| data.list.as_slice())
      .unwrap_or(&[])
  }

  fn stamp_paging(&mut self) {
    if let Some(data) = self.data.as_mut() {
      let paging = data.paging.unwrap_or_default();
      for item in &mut data.list {
        item.set_paging(paging);
      }
    }
  }
}

/// Flat list response (`data` is the list itself, no paging).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatListResponse<T> {
  #[serde(default = "Vec::new")]
  pub data: Vec<T>,
}

impl<T> ResponseList for FlatListResponse<T>
where
  T: Clone + Send + Sync + 'static,
{
  type Item = T;

  fn items(&self) -> &[T] {
    &self.data
  }
}
