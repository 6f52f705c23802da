//! Strategy for running an extractor against a page URL.

use uuid::Uuid;

use crate::config::{BoundSource, UrlExtractConfig, ValueSource};
use crate::error::StepError;
use crate::types::{QueryRequest, Row, RowSchema};

use super::QueryStrategy;

/// Input parameter name the service expects the page URL under.
pub const PAGE_URL_PARAMETER: &str = "page/url";

/// Builds queries that point an extractor at a page URL.
///
/// Both the target and the URL may come from input fields; their indices
/// are resolved once at bind time and the cell values are read fresh for
/// every row. An empty URL sends no URL parameter at all, which runs the
/// extractor against its own start page.
pub struct UrlExtract {
  target: ValueSource,
  url: Option<ValueSource>,
  bound_target: Option<BoundSource>,
  bound_url: Option<BoundSource>,
}

impl UrlExtract {
  pub fn new(config: &UrlExtractConfig) -> Self {
    Self {
      target: config.harvest.target.clone(),
      url: config.url.clone(),
      bound_target: None,
      bound_url: None,
    }
  }
}

impl QueryStrategy for UrlExtract {
  fn bind(&mut self, input: Option<&RowSchema>) -> Result<(), StepError> {
    self.bound_target = Some(self.target.bind(input)?);
    self.bound_url = match &self.url {
      Some(url) => Some(url.bind(input)?),
      None => None,
    };
    Ok(())
  }

  fn request_for(&self, row: &Row) -> Result<QueryRequest, StepError> {
    let target = self
      .bound_target
      .as_ref()
      .ok_or_else(|| StepError::Config("strategy used before bind".to_string()))?;
    let target_value = target.value(row);
    let target = Uuid::parse_str(target_value).map_err(|source| StepError::InvalidTarget {
      value: target_value.to_string(),
      source,
    })?;

    let mut request = QueryRequest::new(target);
    if let Some(url) = &self.bound_url {
      let url_value = url.value(row);
      if !url_value.is_empty() {
        request = request.with_input(PAGE_URL_PARAMETER, url_value);
      }
    }
    Ok(request)
  }
}
