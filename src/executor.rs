//! One blocking query attempt against the extraction service.

use std::sync::Arc;

use tracing::{error, instrument};

use crate::collector::QueryCollector;
use crate::config::HarvestConfig;
use crate::transport::TransportClient;
use crate::types::{QueryRequest, Record};

/// Everything the retry loop needs to know about one finished attempt.
#[derive(Debug, Default)]
pub struct AttemptOutcome {
  /// Records collected before the attempt ended. `None` when no data
  /// message arrived at all.
  pub records: Option<Vec<Record>>,
  /// The streaming channel dropped mid-attempt.
  pub disconnected: bool,
  /// The completion gate never opened within the configured timeout.
  pub timed_out: bool,
  /// No session could be opened; nothing was submitted.
  pub connect_failed: bool,
}

impl AttemptOutcome {
  fn no_session() -> Self {
    Self {
      connect_failed: true,
      ..Self::default()
    }
  }

  /// Whether this attempt failed in a way worth retrying.
  pub fn needs_retry(&self) -> bool {
    self.timed_out || self.disconnected || self.connect_failed
  }

  /// The records to emit for this attempt, empty when none arrived.
  pub fn record_slice(&self) -> &[Record] {
    self.records.as_deref().unwrap_or(&[])
  }
}

/// Runs single query attempts: connect, submit, wait out the attempt,
/// close. The executor owns no retry policy; it reports what happened and
/// the step's loop decides whether to go again.
#[derive(Clone)]
pub struct QueryExecutor {
  transport: Arc<dyn TransportClient>,
}

impl QueryExecutor {
  pub fn new(transport: Arc<dyn TransportClient>) -> Self {
    Self { transport }
  }

  /// One complete attempt for `request`.
  ///
  /// A connect failure is terminal for the attempt. A submit failure is
  /// not: the query may be running server-side despite the error, so the
  /// attempt still waits out its timeout and keeps whatever arrives. The
  /// session is closed on every path out, whatever the attempt produced.
  #[instrument(level = "trace", skip(self, config, request), fields(target = %request.target))]
  pub async fn execute_once(
    &self,
    config: &HarvestConfig,
    request: &QueryRequest,
  ) -> AttemptOutcome {
    let mut connection = match self.transport.connect(&config.credentials).await {
      Ok(connection) => connection,
      Err(e) => {
        error!(error = %e, "could not reach the extraction service");
        return AttemptOutcome::no_session();
      }
    };

    let collector = Arc::new(QueryCollector::new());
    if let Err(e) = connection.submit(request, Arc::clone(&collector)).await {
      error!(error = %e, "query submission failed; waiting out the attempt anyway");
    }

    let timed_out = collector.wait(config.timeout()).await;
    connection.close().await;

    AttemptOutcome {
      records: collector.take_records(),
      disconnected: collector.disconnected(),
      timed_out,
      connect_failed: false,
    }
  }
}
