//! Strategy for parameterized extractor queries.

use uuid::Uuid;

use crate::config::{BoundSource, ParamQueryConfig, ValueSource};
use crate::error::StepError;
use crate::types::{QueryRequest, Row, RowSchema};

use super::QueryStrategy;

/// Builds queries that feed an extractor fixed name/value inputs plus
/// optional page bounds.
///
/// Pairs with an empty name or value are skipped at construction, the same
/// way blank grid lines in a job definition are. Page bounds that fail to
/// parse are skipped silently too.
pub struct ParamQuery {
  target: ValueSource,
  bound_target: Option<BoundSource>,
  inputs: Vec<(String, String)>,
  start_page: Option<u32>,
  max_pages: Option<u32>,
}

impl ParamQuery {
  pub fn new(config: &ParamQueryConfig) -> Self {
    let inputs = config
      .inputs
      .iter()
      .filter(|p| !p.name.is_empty() && !p.value.is_empty())
      .map(|p| (p.name.clone(), p.value.clone()))
      .collect();
    Self {
      target: config.harvest.target.clone(),
      bound_target: None,
      inputs,
      start_page: config.parsed_start_page(),
      max_pages: config.parsed_max_pages(),
    }
  }
}

impl QueryStrategy for ParamQuery {
  fn bind(&mut self, input: Option<&RowSchema>) -> Result<(), StepError> {
    self.bound_target = Some(self.target.bind(input)?);
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
    for (name, value) in &self.inputs {
      request = request.with_input(name.clone(), value.clone());
    }
    request.start_page = self.start_page;
    request.max_pages = self.max_pages;
    Ok(request)
  }
}
