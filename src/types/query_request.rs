//! The query submitted to the extraction service for one row.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One extraction query: which target to run plus its inputs.
///
/// `input` is a name/value map handed verbatim to the target; pagination
/// bounds are optional and left to the service's defaults when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
  pub target: Uuid,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub input: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub start_page: Option<u32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_pages: Option<u32>,
}

impl QueryRequest {
  pub fn new(target: Uuid) -> Self {
    Self {
      target,
      input: BTreeMap::new(),
      start_page: None,
      max_pages: None,
    }
  }

  pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.input.insert(name.into(), value.into());
    self
  }
}
