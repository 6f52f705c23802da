//! Step configuration.
//!
//! Numeric settings deliberately stay strings here, the way they arrive from
//! job definitions; each has a parse fallback so a stray value degrades to a
//! documented default instead of killing the run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::types::{Credentials, Row, RowSchema};

/// Attempt timeout applied when the configured value does not parse.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Retry budget applied when the configured value does not parse.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// A config value that is either a literal or the name of an input field to
/// read it from, row by row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
  Literal(String),
  FromField(String),
}

impl ValueSource {
  /// Binds this source against the input schema, once, at first-row time.
  ///
  /// A field-sourced value needs input rows to read from: with no upstream
  /// at all this is [`StepError::NoInputRows`], and with a schema that lacks
  /// the field it is [`StepError::FieldNotFound`]. Literals always bind.
  pub fn bind(&self, input: Option<&RowSchema>) -> Result<BoundSource, StepError> {
    match self {
      ValueSource::Literal(value) => Ok(BoundSource::Literal(value.clone())),
      ValueSource::FromField(name) => {
        let schema = input.ok_or_else(|| StepError::NoInputRows(name.clone()))?;
        let index = schema
          .index_of(name)
          .ok_or_else(|| StepError::FieldNotFound(name.clone()))?;
        Ok(BoundSource::Field(index))
      }
    }
  }
}

/// A [`ValueSource`] after field-name resolution.
///
/// Field lookups keep only the cell index; the value itself is read fresh
/// from every row.
#[derive(Debug, Clone)]
pub enum BoundSource {
  Literal(String),
  Field(usize),
}

impl BoundSource {
  /// The value this source yields for `row`. A field index past the end of
  /// a short row reads as empty rather than panicking.
  pub fn value<'a>(&'a self, row: &'a Row) -> &'a str {
    match self {
      BoundSource::Literal(value) => value,
      BoundSource::Field(index) => row.get(*index).map(String::as_str).unwrap_or(""),
    }
  }
}

/// One output column appended by a harvest step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputField {
  /// Column name in the outgoing schema.
  pub name: String,
  /// Field name to read from each extracted record.
  pub service_field: String,
}

/// Settings shared by every step that queries the extraction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
  pub credentials: Credentials,
  /// The extractor to run, literal or taken from an input field per row.
  pub target: ValueSource,
  #[serde(default = "default_timeout")]
  pub timeout_secs: String,
  #[serde(default = "default_retries")]
  pub max_retries: String,
  #[serde(default)]
  pub output_fields: Vec<OutputField>,
}

fn default_timeout() -> String {
  DEFAULT_TIMEOUT_SECS.to_string()
}

fn default_retries() -> String {
  DEFAULT_MAX_RETRIES.to_string()
}

impl HarvestConfig {
  /// Attempt timeout, falling back to [`DEFAULT_TIMEOUT_SECS`] when the
  /// configured string does not parse.
  pub fn timeout(&self) -> Duration {
    let secs = self
      .timeout_secs
      .trim()
      .parse::<u64>()
      .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
  }

  /// Retries allowed after the first attempt, falling back to
  /// [`DEFAULT_MAX_RETRIES`] when the configured string does not parse.
  pub fn retry_budget(&self) -> u32 {
    self
      .max_retries
      .trim()
      .parse::<u32>()
      .unwrap_or(DEFAULT_MAX_RETRIES)
  }

  /// Outgoing schema: the input fields (none for a generator) plus one
  /// string column per configured output field.
  pub fn output_schema(&self, input: Option<&RowSchema>) -> RowSchema {
    let base = input.cloned().unwrap_or_else(RowSchema::empty);
    base.extended(self.output_fields.iter().map(|f| f.name.clone()))
  }
}

/// Config for the URL-extraction step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlExtractConfig {
  #[serde(flatten)]
  pub harvest: HarvestConfig,
  /// Page URL passed to the extractor. `None` runs the extractor against
  /// its own configured start URL.
  #[serde(default)]
  pub url: Option<ValueSource>,
}

/// One name/value input parameter for a parameterized query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputParam {
  pub name: String,
  pub value: String,
}

/// Config for the parameterized-query step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamQueryConfig {
  #[serde(flatten)]
  pub harvest: HarvestConfig,
  #[serde(default)]
  pub start_page: String,
  #[serde(default)]
  pub max_pages: String,
  #[serde(default)]
  pub inputs: Vec<InputParam>,
}

impl ParamQueryConfig {
  /// Parsed page bound; unparseable or empty strings are skipped silently
  /// and leave pagination to the service default.
  pub fn parsed_start_page(&self) -> Option<u32> {
    self.start_page.trim().parse().ok()
  }

  pub fn parsed_max_pages(&self) -> Option<u32> {
    self.max_pages.trim().parse().ok()
  }
}

/// Config for the cache-read step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheInputConfig {
  pub host: String,
  pub port: String,
  /// Cache database index, empty for the server default.
  #[serde(default)]
  pub base: String,
  pub key: ValueSource,
  /// Column the fetched value lands in: replaced in place when the input
  /// schema already has it, appended otherwise.
  pub value_field: String,
}

/// Config for the cache-write step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOutputConfig {
  pub host: String,
  pub port: String,
  #[serde(default)]
  pub base: String,
  pub key: ValueSource,
  pub value: ValueSource,
  /// Writes are batched into pipelines of this size; "1" writes through.
  #[serde(default = "default_pipeline_size")]
  pub pipeline_size: String,
}

fn default_pipeline_size() -> String {
  "1".to_string()
}

/// A complete step definition as loaded from a job file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepSpec {
  UrlExtract(UrlExtractConfig),
  ParamQuery(ParamQueryConfig),
  CacheInput(CacheInputConfig),
  CacheOutput(CacheOutputConfig),
}
