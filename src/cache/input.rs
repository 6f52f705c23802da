//! Cache-read step: look up one key per row, put the value in a column.

use tracing::{debug, info, instrument};

use crate::config::CacheInputConfig;
use crate::error::StepError;
use crate::io::{RowSink, RowSource};
use crate::steps::{PumpEvent, RowPump, StepReport};
use crate::types::{Row, RowSchema};

use super::KvBackend;
use super::parse_db_index;

/// Reads the configured key from the cache for every row and lands the
/// value in `value_field`: replaced in place when the input schema already
/// carries that column, appended on the right otherwise.
///
/// A key with no entry yields an empty cell; the row still flows. Cache
/// command failures stop the step.
pub struct CacheInputStep<B: KvBackend> {
  config: CacheInputConfig,
  backend: B,
}

impl<B: KvBackend> CacheInputStep<B> {
  pub fn new(config: CacheInputConfig, backend: B) -> Result<Self, StepError> {
    if config.value_field.trim().is_empty() {
      return Err(StepError::Config(
        "cache input needs a value field name".to_string(),
      ));
    }
    Ok(Self { config, backend })
  }

  /// Outgoing schema for a given input schema.
  pub fn output_schema(&self, input: Option<&RowSchema>) -> RowSchema {
    match input {
      Some(schema) if schema.index_of(&self.config.value_field).is_some() => schema.clone(),
      Some(schema) => schema.extended([self.config.value_field.clone()]),
      None => RowSchema::new(vec![self.config.value_field.clone()]),
    }
  }

  #[instrument(level = "trace", skip_all)]
  pub async fn run<Src, Snk>(
    mut self,
    source: &mut Src,
    sink: &mut Snk,
  ) -> Result<StepReport, StepError>
  where
    Src: RowSource,
    Snk: RowSink,
  {
    let db = parse_db_index(&self.config.base)?;
    let mut pump = RowPump::new();
    let mut report = StepReport::default();

    let PumpEvent::First(first_row) = pump.next(source).await else {
      return Ok(report);
    };
    let input_schema = if pump.generator_mode() {
      None
    } else {
      Some(source.schema().clone())
    };
    let key = self.config.key.bind(input_schema.as_ref())?;
    let value_slot = input_schema
      .as_ref()
      .and_then(|schema| schema.index_of(&self.config.value_field));
    debug!(
      replace = value_slot.is_some(),
      generator = pump.generator_mode(),
      "cache input initialized at first row"
    );

    let mut row = first_row;
    loop {
      report.rows_read += 1;
      let key_text = key.value(&row).to_string();
      let fetched = self.backend.get(db, &key_text).await?;
      sink
        .push(place_value(row, value_slot, fetched.unwrap_or_default()))
        .await?;
      report.rows_written += 1;

      if pump.generator_mode() {
        break;
      }
      match pump.next(source).await {
        PumpEvent::Row(next) => row = next,
        _ => break,
      }
    }

    info!(
      rows_read = report.rows_read,
      rows_written = report.rows_written,
      "cache input finished"
    );
    Ok(report)
  }
}

/// Replaces the slot cell when there is one in range, appends otherwise.
fn place_value(mut row: Row, slot: Option<usize>, value: String) -> Row {
  match slot {
    Some(index) if index < row.len() => row[index] = value,
    _ => row.push(value),
  }
  row
}
