use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;
use url::Url;

use crate::config::RemoteConfig;
use crate::paging::ListResponse;
use crate::service::Service;

use super::types::{Record, RecordId, RecordQuery};

/// Single-record responses wrap the record in `data`.
#[derive(Debug, Deserialize)]
struct DetailEnvelope<T> {
  data: T,
}

/// Catalogue HTTP client wrapper
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base_url: String,
  list_path: String,
  detail_path: String,
  search_path: String,
}

impl CatalogClient {
  pub fn new(config: &RemoteConfig) -> Result<Self> {
    Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid base URL {}: {}", config.base_url, e))?;

    let http = reqwest::Client::builder()
      .timeout(config.timeout())
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      list_path: config.list_path.clone(),
      detail_path: config.detail_path.clone(),
      search_path: config.search_path.clone(),
    })
  }

  /// Get one page of records
  pub async fn list_records(&self, page: u32, per_page: u32) -> Result<ListResponse<Record>> {
    let mut url = self.endpoint(&self.list_path)?;
    append_paging(&mut url, page, per_page);
    self.get_json(url).await
  }

  /// Get a single record by id
  pub async fn get_record(&self, id: &RecordId) -> Result<Record> {
    let encoded: String = url::form_urlencoded::byte_serialize(id.0.as_bytes()).collect();
    let url = self.endpoint(&self.detail_path.replace("{id}", &encoded))?;

    let envelope: DetailEnvelope<Record> = self
      .get_json(url)
      .await
      .map_err(|e| eyre!("Failed to get record {}: {}", id, e))?;

    Ok(envelope.data)
  }

  /// Search records by free text
  pub async fn search_records(
    &self,
    text: &str,
    page: u32,
    per_page: u32,
  ) -> Result<ListResponse<Record>> {
    let mut url = self.endpoint(&self.search_path)?;
    url.query_pairs_mut().append_pair("q", text);
    append_paging(&mut url, page, per_page);
    self.get_json(url).await
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
    Url::parse(&joined).map_err(|e| eyre!("Invalid endpoint {}: {}", joined, e))
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
    debug!(%url, "GET");

    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response from {}: {}", url, e))?;

    serde_json::from_slice(&body).map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }
}

fn append_paging(url: &mut Url, page: u32, per_page: u32) {
  let mut pairs = url.query_pairs_mut();
  pairs.append_pair("page", &page.to_string());
  if per_page > 0 {
    pairs.append_pair("limit", &per_page.to_string());
  }
}

// ============================================================================
// Remote gateways
// ============================================================================

/// Paged record listing.
pub struct RemoteList {
  client: CatalogClient,
}

impl RemoteList {
  pub fn new(client: CatalogClient) -> Self {
    Self { client }
  }
}

#[async_trait]
impl Service for RemoteList {
  type Request = RecordQuery;
  type Response = ListResponse<Record>;

  async fn get(&self, request: Option<&RecordQuery>) -> Result<ListResponse<Record>> {
    let query = request.cloned().unwrap_or_default();
    self.client.list_records(query.page, query.per_page).await
  }
}

/// Single record by id.
pub struct RemoteDetail {
  client: CatalogClient,
}

impl RemoteDetail {
  pub fn new(client: CatalogClient) -> Self {
    Self { client }
  }
}

#[async_trait]
impl Service for RemoteDetail {
  type Request = RecordId;
  type Response = Record;

  async fn get(&self, request: Option<&RecordId>) -> Result<Record> {
    let id = request.ok_or_else(|| eyre!("A record id is required"))?;
    self.client.get_record(id).await
  }
}

/// Free-text search.
pub struct RemoteSearch {
  client: CatalogClient,
}

impl RemoteSearch {
  pub fn new(client: CatalogClient) -> Self {
    Self { client }
  }
}

#[async_trait]
impl Service for RemoteSearch {
  type Request = RecordQuery;
  type Response = ListResponse<Record>;

  async fn get(&self, request: Option<&RecordQuery>) -> Result<ListResponse<Record>> {
    let query = request.cloned().unwrap_or_default();
    let text = query.text.as_deref().unwrap_or_default();
    self
      .client
      .search_records(text, query.page, query.per_page)
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;

  fn client(base_url: &str) -> CatalogClient {
    let config = Config::from_yaml(&format!("remote:\n  base_url: {}\n", base_url)).unwrap();
    CatalogClient::new(&config.remote).unwrap()
  }

  #[test]
  fn test_endpoint_joins_without_double_slash() {
    let client = client("https://api.example.com/v1/");
    let url = client.endpoint("/records").unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/v1/records");
  }

  #[test]
  fn test_paging_query() {
    let client = client("https://api.example.com");
    let mut url = client.endpoint("/records").unwrap();
    append_paging(&mut url, 2, 20);
    assert_eq!(url.query(), Some("page=2&limit=20"));

    let mut url = client.endpoint("/records").unwrap();
    append_paging(&mut url, 1, 0);
    assert_eq!(url.query(), Some("page=1"));
  }

  #[test]
  fn test_invalid_base_url_is_rejected() {
    let config = Config::from_yaml("remote:\n  base_url: not a url\n").unwrap();
    assert!(CatalogClient::new(&config.remote).is_err());
  }

  #[tokio::test]
  async fn test_detail_requires_id() {
    let remote = RemoteDetail::new(client("https://api.example.com"));
    let err = remote.get(None).await.unwrap_err();
    assert!(err.to_string().contains("record id is required"));
  }

  #[tokio::test]
  async fn test_unreachable_remote_is_an_error() {
    let remote = RemoteList::new(client("http://127.0.0.1:9"));
    assert!(remote.get(Some(&RecordQuery::default())).await.is_err());
  }
}
