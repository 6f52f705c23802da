//! Tests for step configuration parsing and binding.

use serde_json::json;

use crate::config::{
  BoundSource, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS, HarvestConfig, OutputField,
  ParamQueryConfig, StepSpec, ValueSource,
};
use crate::error::StepError;
use crate::types::{Credentials, RowSchema};

fn harvest_config(timeout: &str, retries: &str) -> HarvestConfig {
  HarvestConfig {
    credentials: Credentials {
      user_id: uuid::Uuid::nil(),
      api_key: "k".to_string(),
    },
    target: ValueSource::Literal("9f0b4cc0-12c5-4217-a2d4-5c3a8fd4f1aa".to_string()),
    timeout_secs: timeout.to_string(),
    max_retries: retries.to_string(),
    output_fields: vec![],
  }
}

#[test]
fn timeout_falls_back_on_garbage() {
  assert_eq!(harvest_config("5", "1").timeout().as_secs(), 5);
  assert_eq!(
    harvest_config("not-a-number", "1").timeout().as_secs(),
    DEFAULT_TIMEOUT_SECS
  );
  assert_eq!(harvest_config("", "1").timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
}

#[test]
fn retry_budget_falls_back_on_garbage() {
  assert_eq!(harvest_config("5", "3").retry_budget(), 3);
  assert_eq!(harvest_config("5", "-2").retry_budget(), DEFAULT_MAX_RETRIES);
  assert_eq!(harvest_config("5", "").retry_budget(), DEFAULT_MAX_RETRIES);
}

#[test]
fn literal_source_binds_without_schema() {
  let source = ValueSource::Literal("fixed".to_string());
  let bound = source.bind(None).unwrap();
  assert_eq!(bound.value(&vec![]), "fixed");
}

#[test]
fn field_source_binds_to_cell_index() {
  let schema = RowSchema::new(vec!["id".to_string(), "guid".to_string()]);
  let source = ValueSource::FromField("guid".to_string());
  let bound = source.bind(Some(&schema)).unwrap();
  let row = vec!["7".to_string(), "abc".to_string()];
  assert_eq!(bound.value(&row), "abc");
}

#[test]
fn field_source_reads_fresh_per_row() {
  let schema = RowSchema::new(vec!["guid".to_string()]);
  let bound = ValueSource::FromField("guid".to_string())
    .bind(Some(&schema))
    .unwrap();
  assert_eq!(bound.value(&vec!["first".to_string()]), "first");
  assert_eq!(bound.value(&vec!["second".to_string()]), "second");
}

#[test]
fn field_source_without_schema_is_no_input_rows() {
  let source = ValueSource::FromField("guid".to_string());
  match source.bind(None) {
    Err(StepError::NoInputRows(name)) => assert_eq!(name, "guid"),
    other => panic!("expected NoInputRows, got {other:?}"),
  }
}

#[test]
fn field_source_missing_from_schema_is_fatal() {
  let schema = RowSchema::new(vec!["id".to_string()]);
  let source = ValueSource::FromField("guid".to_string());
  match source.bind(Some(&schema)) {
    Err(StepError::FieldNotFound(name)) => assert_eq!(name, "guid"),
    other => panic!("expected FieldNotFound, got {other:?}"),
  }
}

#[test]
fn short_row_reads_as_empty() {
  let schema = RowSchema::new(vec!["a".to_string(), "b".to_string()]);
  let bound = ValueSource::FromField("b".to_string())
    .bind(Some(&schema))
    .unwrap();
  assert_eq!(bound.value(&vec!["only-a".to_string()]), "");
}

#[test]
fn page_bounds_skip_silently_on_garbage() {
  let config: ParamQueryConfig = serde_json::from_value(json!({
    "credentials": {"user_id": "00000000-0000-0000-0000-000000000000", "api_key": "k"},
    "target": {"literal": "t"},
    "start_page": "2",
    "max_pages": "many"
  }))
  .unwrap();
  assert_eq!(config.parsed_start_page(), Some(2));
  assert_eq!(config.parsed_max_pages(), None);
}

#[test]
fn step_spec_dispatches_on_kind() {
  let spec: StepSpec = serde_json::from_value(json!({
    "kind": "url_extract",
    "credentials": {"user_id": "00000000-0000-0000-0000-000000000000", "api_key": "k"},
    "target": {"from_field": "guid"},
    "url": {"from_field": "page"},
    "output_fields": [{"name": "price", "service_field": "unit_price"}]
  }))
  .unwrap();
  match spec {
    StepSpec::UrlExtract(config) => {
      assert_eq!(
        config.harvest.target,
        ValueSource::FromField("guid".to_string())
      );
      assert_eq!(config.url, Some(ValueSource::FromField("page".to_string())));
      assert_eq!(config.harvest.output_fields.len(), 1);
      // Defaults land when the job file omits the strings.
      assert_eq!(config.harvest.timeout().as_secs(), DEFAULT_TIMEOUT_SECS);
      assert_eq!(config.harvest.retry_budget(), DEFAULT_MAX_RETRIES);
    }
    other => panic!("expected url_extract, got {other:?}"),
  }
}

#[test]
fn output_schema_appends_after_input_fields() {
  let mut config = harvest_config("20", "1");
  config.output_fields = vec![
    OutputField {
      name: "price".to_string(),
      service_field: "unit_price".to_string(),
    },
    OutputField {
      name: "title".to_string(),
      service_field: "title".to_string(),
    },
  ];
  let input = RowSchema::new(vec!["url".to_string()]);
  let out = config.output_schema(Some(&input));
  assert_eq!(out.fields(), ["url", "price", "title"]);
  let generator_out = config.output_schema(None);
  assert_eq!(generator_out.fields(), ["price", "title"]);
}

#[test]
fn bound_literal_ignores_rows() {
  let bound = BoundSource::Literal("same".to_string());
  assert_eq!(bound.value(&vec!["x".to_string()]), "same");
  assert_eq!(bound.value(&vec![]), "same");
}
