use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::paging::{ListRequest, PageCursor, Pageable, Paging};

/// A record served by the catalogue.
///
/// Only `id` is interpreted; every other field is carried through as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  #[serde(flatten)]
  pub fields: Map<String, Value>,
  /// Page this record arrived on
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub paging: Option<Paging>,
}

impl Pageable for Record {
  fn set_paging(&mut self, paging: Paging) {
    self.paging = Some(paging);
  }
}

/// Remote ids come as strings or numbers; both are kept as strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match Value::deserialize(deserializer)? {
    Value::String(s) => Ok(s),
    Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!(
      "expected string or number id, got {}",
      other
    ))),
  }
}

/// Identifier for a single-record request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// List or search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordQuery {
  pub page: u32,
  /// 0 leaves the page size to the remote
  pub per_page: u32,
  pub force_reload: bool,
  /// Free-text search; ignored by list requests
  pub text: Option<String>,
}

impl ListRequest for RecordQuery {
  fn page_cursor(&self) -> Option<PageCursor> {
    Some(PageCursor::new(self.page, self.force_reload))
  }
}
