//! The shared per-row harvest loop.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::config::{HarvestConfig, OutputField, ParamQueryConfig, UrlExtractConfig};
use crate::error::StepError;
use crate::executor::{AttemptOutcome, QueryExecutor};
use crate::io::{RowSink, RowSource};
use crate::transport::TransportClient;
use crate::types::{QueryRequest, Record, Row, field_as_string};

use super::{ParamQuery, PumpEvent, QueryStrategy, RowPump, StepReport, UrlExtract};

/// Progress log cadence, in rows.
const FEEDBACK_ROWS: u64 = 1000;

/// Drives one harvest step: pull a row, build its query, run it with
/// retries, flatten the records into output rows.
///
/// The retry budget is per row. A row whose attempt times out, loses its
/// channel, or cannot connect is retried up to `max_retries` more times;
/// whatever the final attempt produced is what gets emitted. Failures
/// past the budget degrade to an empty record batch rather than aborting
/// the run.
pub struct HarvestRunner<S: QueryStrategy> {
  config: HarvestConfig,
  strategy: S,
  executor: QueryExecutor,
}

impl HarvestRunner<UrlExtract> {
  pub fn url_extract(config: UrlExtractConfig, transport: Arc<dyn TransportClient>) -> Self {
    Self::new(config.harvest.clone(), UrlExtract::new(&config), transport)
  }
}

impl HarvestRunner<ParamQuery> {
  pub fn param_query(config: ParamQueryConfig, transport: Arc<dyn TransportClient>) -> Self {
    Self::new(config.harvest.clone(), ParamQuery::new(&config), transport)
  }
}

impl<S: QueryStrategy> HarvestRunner<S> {
  pub fn new(config: HarvestConfig, strategy: S, transport: Arc<dyn TransportClient>) -> Self {
    Self {
      config,
      strategy,
      executor: QueryExecutor::new(transport),
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
    let mut pump = RowPump::new();
    let mut report = StepReport::default();

    loop {
      let row = match pump.next(source).await {
        PumpEvent::First(row) => {
          let input_schema = if pump.generator_mode() {
            None
          } else {
            Some(source.schema().clone())
          };
          self.strategy.bind(input_schema.as_ref())?;
          debug!(
            generator = pump.generator_mode(),
            output_fields = self.config.output_fields.len(),
            "harvest step initialized at first row"
          );
          row
        }
        PumpEvent::Row(row) => row,
        PumpEvent::End => break,
      };
      report.rows_read += 1;

      let request = self.strategy.request_for(&row)?;
      let outcome = self.run_with_retries(&request, &mut report).await;

      let records = outcome.record_slice();
      if records.is_empty() && !pump.generator_mode() {
        // The input row survives even when the query produced nothing.
        sink.push(output_row(&row, &self.config.output_fields, None)).await?;
        report.rows_written += 1;
      } else {
        for record in records {
          sink
            .push(output_row(&row, &self.config.output_fields, Some(record)))
            .await?;
          report.rows_written += 1;
        }
      }

      if report.rows_read % FEEDBACK_ROWS == 0 {
        info!(rows = report.rows_read, "rows processed");
      }
      if pump.generator_mode() {
        break;
      }
    }

    info!(
      rows_read = report.rows_read,
      rows_written = report.rows_written,
      attempts = report.attempts,
      retries = report.retries,
      "harvest step finished"
    );
    Ok(report)
  }

  async fn run_with_retries(
    &self,
    request: &QueryRequest,
    report: &mut StepReport,
  ) -> AttemptOutcome {
    let budget = self.config.retry_budget();
    let mut outcome = self.executor.execute_once(&self.config, request).await;
    report.attempts += 1;
    let mut retries_used = 0u32;

    while outcome.needs_retry() && retries_used < budget {
      log_retry_causes(&outcome, retries_used + 1);
      retries_used += 1;
      report.retries += 1;
      outcome = self.executor.execute_once(&self.config, request).await;
      report.attempts += 1;
    }
    if outcome.needs_retry() {
      warn!(
        attempts = retries_used + 1,
        "giving up on the row; emitting whatever arrived"
      );
    }
    outcome
  }
}

fn log_retry_causes(outcome: &AttemptOutcome, attempt: u32) {
  if outcome.connect_failed {
    warn!(attempt, "retrying after failed connection");
  }
  if outcome.timed_out {
    warn!(attempt, "retrying after query timeout");
  }
  if outcome.disconnected {
    warn!(attempt, "retrying after dropped channel");
  }
}

/// One output row: the input cells followed by one cell per configured
/// output field. With no record every appended cell is empty.
pub(crate) fn output_row(input: &Row, outputs: &[OutputField], record: Option<&Record>) -> Row {
  let mut row = Vec::with_capacity(input.len() + outputs.len());
  row.extend(input.iter().cloned());
  for field in outputs {
    let value = record
      .map(|r| field_as_string(r, &field.service_field))
      .unwrap_or_default();
    row.push(value);
  }
  row
}
