//! Tests for record field extraction.

use serde_json::json;

use super::{Record, field_as_string};

fn record_from(value: serde_json::Value) -> Record {
  match value {
    serde_json::Value::Object(map) => map,
    other => panic!("expected object, got {other}"),
  }
}

#[test]
fn string_fields_pass_through_unquoted() {
  let record = record_from(json!({"title": "Blue Kettle"}));
  assert_eq!(field_as_string(&record, "title"), "Blue Kettle");
}

#[test]
fn numeric_and_bool_fields_keep_json_rendering() {
  let record = record_from(json!({"price": 9.99, "in_stock": true}));
  assert_eq!(field_as_string(&record, "price"), "9.99");
  assert_eq!(field_as_string(&record, "in_stock"), "true");
}

#[test]
fn missing_and_null_fields_become_empty() {
  let record = record_from(json!({"gone": null}));
  assert_eq!(field_as_string(&record, "gone"), "");
  assert_eq!(field_as_string(&record, "never_there"), "");
}
