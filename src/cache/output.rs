//! Cache-write step: store one key/value pair per row, pass rows through.

use tracing::{debug, info, instrument};

use crate::config::CacheOutputConfig;
use crate::error::StepError;
use crate::io::{RowSink, RowSource};
use crate::steps::{PumpEvent, RowPump, StepReport};

use super::KvBackend;
use super::parse_db_index;

/// Writes the configured key/value pair to the cache for every row and
/// forwards the row unchanged.
///
/// With `pipeline_size` above one, writes accumulate and go out in
/// pipelined batches; the remainder is flushed when upstream ends, so a
/// clean finish never loses writes.
pub struct CacheOutputStep<B: KvBackend> {
  config: CacheOutputConfig,
  backend: B,
  batch_size: usize,
}

impl<B: KvBackend> CacheOutputStep<B> {
  pub fn new(config: CacheOutputConfig, backend: B) -> Result<Self, StepError> {
    let raw = config.pipeline_size.trim();
    let batch_size = if raw.is_empty() {
      1
    } else {
      raw.parse::<usize>().map_err(|_| {
        StepError::Config(format!("pipeline size `{raw}` is not a number"))
      })?
    };
    if batch_size == 0 {
      return Err(StepError::Config(
        "pipeline size must be at least 1".to_string(),
      ));
    }
    Ok(Self {
      config,
      backend,
      batch_size,
    })
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
    let value = self.config.value.bind(input_schema.as_ref())?;
    debug!(
      batch_size = self.batch_size,
      generator = pump.generator_mode(),
      "cache output initialized at first row"
    );

    let mut batch: Vec<(String, String)> = Vec::new();
    let mut row = first_row;
    loop {
      report.rows_read += 1;
      let pair = (key.value(&row).to_string(), value.value(&row).to_string());
      if self.batch_size > 1 {
        batch.push(pair);
        if batch.len() >= self.batch_size {
          self.backend.set_many(db, &batch).await?;
          batch.clear();
        }
      } else {
        self.backend.set(db, &pair.0, &pair.1).await?;
      }
      sink.push(row).await?;
      report.rows_written += 1;

      if pump.generator_mode() {
        break;
      }
      match pump.next(source).await {
        PumpEvent::Row(next) => row = next,
        _ => break,
      }
    }

    if !batch.is_empty() {
      debug!(pending = batch.len(), "flushing final batch");
      self.backend.set_many(db, &batch).await?;
    }

    info!(
      rows_read = report.rows_read,
      rows_written = report.rows_written,
      "cache output finished"
    );
    Ok(report)
  }
}
