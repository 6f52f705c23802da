//! Live-Redis round trips for the cache steps. These need a Redis server on
//! 127.0.0.1:6379 and are ignored by default; run them with
//! `cargo test -- --ignored`. Keys are namespaced per run so repeated runs
//! and parallel tests cannot collide.

use rowharvest::cache::{CacheInputStep, CacheOutputStep, CachePool, PooledBackend};
use rowharvest::config::{CacheInputConfig, CacheOutputConfig};
use rowharvest::io::{CollectRowSink, StreamRowSource};
use rowharvest::types::{Row, RowSchema};
use rowharvest::ValueSource;
use uuid::Uuid;

const HOST: &str = "127.0.0.1";
const PORT: &str = "6379";

fn backend() -> PooledBackend {
  PooledBackend::new(CachePool::acquire(HOST, PORT).expect("acquire pool"))
}

fn keyed_rows(run_id: &str, pairs: &[(&str, &str)]) -> (RowSchema, Vec<Row>) {
  let schema = RowSchema::new(vec!["key".to_string(), "payload".to_string()]);
  let rows = pairs
    .iter()
    .map(|(suffix, payload)| {
      vec![
        format!("rowharvest:test:{run_id}:{suffix}"),
        (*payload).to_string(),
      ]
    })
    .collect();
  (schema, rows)
}

fn output_config(pipeline_size: &str) -> CacheOutputConfig {
  CacheOutputConfig {
    host: HOST.to_string(),
    port: PORT.to_string(),
    base: String::new(),
    key: ValueSource::FromField("key".to_string()),
    value: ValueSource::FromField("payload".to_string()),
    pipeline_size: pipeline_size.to_string(),
  }
}

fn input_config() -> CacheInputConfig {
  CacheInputConfig {
    host: HOST.to_string(),
    port: PORT.to_string(),
    base: String::new(),
    key: ValueSource::FromField("key".to_string()),
    value_field: "fetched".to_string(),
  }
}

#[tokio::test]
#[ignore]
async fn pipelined_writes_read_back_row_for_row() {
  let run_id = Uuid::new_v4().to_string();
  let pairs = [("a", "alpha"), ("b", "beta"), ("c", "gamma")];

  // Batch of two plus a remainder, so the end-of-stream flush is exercised.
  let (schema, rows) = keyed_rows(&run_id, &pairs);
  let mut source = StreamRowSource::from_rows(schema.clone(), rows);
  let mut sink = CollectRowSink::new();
  let report = CacheOutputStep::new(output_config("2"), backend())
    .expect("output step")
    .run(&mut source, &mut sink)
    .await
    .expect("write run");
  assert_eq!(report.rows_read, 3);
  assert_eq!(report.rows_written, 3, "cache output passes rows through");

  let (schema, rows) = keyed_rows(&run_id, &pairs);
  let mut source = StreamRowSource::from_rows(schema, rows);
  let mut sink = CollectRowSink::new();
  let step = CacheInputStep::new(input_config(), backend()).expect("input step");
  step
    .run(&mut source, &mut sink)
    .await
    .expect("read run");

  let fetched: Vec<&str> = sink
    .rows
    .iter()
    .map(|row| row.last().map(String::as_str).unwrap_or(""))
    .collect();
  assert_eq!(fetched, vec!["alpha", "beta", "gamma"]);
}

#[tokio::test]
#[ignore]
async fn unwritten_keys_read_back_as_empty_cells() {
  let run_id = Uuid::new_v4().to_string();
  let (schema, rows) = keyed_rows(&run_id, &[("never-written", "unused")]);
  let mut source = StreamRowSource::from_rows(schema, rows);
  let mut sink = CollectRowSink::new();

  let step = CacheInputStep::new(input_config(), backend()).expect("input step");
  step
    .run(&mut source, &mut sink)
    .await
    .expect("read run");

  assert_eq!(sink.rows.len(), 1);
  assert_eq!(sink.rows[0].last().map(String::as_str), Some(""));
}
