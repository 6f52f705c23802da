//! Pipeline steps that query the extraction service per row.
//!
//! The shared machinery lives in [`HarvestRunner`]; what varies between
//! steps is only how a row becomes a [`QueryRequest`], captured by
//! [`QueryStrategy`].

use crate::error::StepError;
use crate::types::{QueryRequest, Row, RowSchema};

mod param_query;
mod pump;
mod runner;
mod url_extract;

pub(crate) use pump::{PumpEvent, RowPump};

pub use param_query::ParamQuery;
pub use runner::HarvestRunner;
pub use url_extract::{PAGE_URL_PARAMETER, UrlExtract};

/// How a step turns one row into one query.
pub trait QueryStrategy: Send {
  /// Resolves field names against the input schema, once, before the
  /// first request. `None` means the step runs as a generator with no
  /// input rows to read from.
  fn bind(&mut self, input: Option<&RowSchema>) -> Result<(), StepError>;

  /// The query to submit for `row`. Field-sourced parts read the row
  /// fresh on every call.
  fn request_for(&self, row: &Row) -> Result<QueryRequest, StepError>;
}

/// Counters reported by a finished step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
  pub rows_read: u64,
  pub rows_written: u64,
  /// Query attempts including retries. Zero for cache steps.
  pub attempts: u64,
  pub retries: u64,
}
