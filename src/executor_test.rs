//! Tests for single-attempt execution.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use crate::config::{HarvestConfig, ValueSource};
use crate::executor::{AttemptOutcome, QueryExecutor};
use crate::transport::{AttemptScript, ScriptedTransport};
use crate::types::{Credentials, QueryRequest, Record, ServerMessage};

fn config(timeout_secs: &str) -> HarvestConfig {
  HarvestConfig {
    credentials: Credentials {
      user_id: Uuid::nil(),
      api_key: "key".to_string(),
    },
    target: ValueSource::Literal(Uuid::nil().to_string()),
    timeout_secs: timeout_secs.to_string(),
    max_retries: "1".to_string(),
    output_fields: vec![],
  }
}

fn record(key: &str, value: &str) -> Record {
  let mut record = Record::new();
  record.insert(key.to_string(), json!(value));
  record
}

fn request() -> QueryRequest {
  QueryRequest::new(Uuid::nil())
}

#[tokio::test(start_paused = true)]
async fn successful_attempt_returns_records_and_closes() {
  let transport =
    ScriptedTransport::sequence(vec![AttemptScript::success(vec![record("price", "9.99")])]);
  let executor = QueryExecutor::new(Arc::new(transport.clone()));

  let outcome = executor.execute_once(&config("5"), &request()).await;
  assert!(!outcome.needs_retry());
  assert_eq!(outcome.record_slice().len(), 1);
  assert_eq!(transport.connect_count(), 1);
  assert_eq!(transport.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_attempt_still_closes_the_session() {
  let transport = ScriptedTransport::sequence(vec![AttemptScript::silence()]);
  let executor = QueryExecutor::new(Arc::new(transport.clone()));

  let outcome = executor.execute_once(&config("5"), &request()).await;
  assert!(outcome.timed_out);
  assert!(outcome.needs_retry());
  assert_eq!(outcome.records, None);
  assert_eq!(transport.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn disconnect_without_finish_times_out_with_flag() {
  let transport = ScriptedTransport::sequence(vec![AttemptScript::dropped_channel()]);
  let executor = QueryExecutor::new(Arc::new(transport.clone()));

  let outcome = executor.execute_once(&config("5"), &request()).await;
  assert!(outcome.disconnected);
  assert!(outcome.timed_out);
  assert!(outcome.needs_retry());
  assert_eq!(transport.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn connect_failure_reports_without_submitting() {
  let transport = ScriptedTransport::sequence(vec![AttemptScript::refuse_connect()]);
  let executor = QueryExecutor::new(Arc::new(transport.clone()));

  let outcome = executor.execute_once(&config("5"), &request()).await;
  assert!(outcome.connect_failed);
  assert!(outcome.needs_retry());
  assert!(transport.submitted().is_empty());
  // No session was opened, so there is nothing to close.
  assert_eq!(transport.connect_count(), 0);
  assert_eq!(transport.close_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_submit_still_waits_and_keeps_late_records() {
  let script = AttemptScript::refuse_submit().then_message(
    Duration::from_secs(2),
    ServerMessage::data(vec![record("n", "1")], true),
  );
  let transport = ScriptedTransport::sequence(vec![script]);
  let executor = QueryExecutor::new(Arc::new(transport.clone()));

  let outcome = executor.execute_once(&config("10"), &request()).await;
  assert!(!outcome.timed_out);
  assert_eq!(outcome.record_slice().len(), 1);
  assert_eq!(transport.close_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn partial_records_survive_a_timeout() {
  let script = AttemptScript::silence().then_message(
    Duration::from_secs(1),
    ServerMessage::data(vec![record("n", "1"), record("n", "2")], false),
  );
  let transport = ScriptedTransport::sequence(vec![script]);
  let executor = QueryExecutor::new(Arc::new(transport.clone()));

  let outcome = executor.execute_once(&config("5"), &request()).await;
  assert!(outcome.timed_out);
  assert_eq!(outcome.record_slice().len(), 2);
}

#[test]
fn default_outcome_does_not_retry() {
  let outcome = AttemptOutcome::default();
  assert!(!outcome.needs_retry());
  assert!(outcome.record_slice().is_empty());
}
