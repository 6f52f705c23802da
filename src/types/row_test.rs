//! Tests for `RowSchema`.

use super::RowSchema;

#[test]
fn index_of_finds_fields_by_name() {
  let schema = RowSchema::new(vec!["id".to_string(), "url".to_string()]);
  assert_eq!(schema.index_of("id"), Some(0));
  assert_eq!(schema.index_of("url"), Some(1));
  assert_eq!(schema.index_of("missing"), None);
}

#[test]
fn empty_schema_has_zero_width() {
  let schema = RowSchema::empty();
  assert_eq!(schema.width(), 0);
  assert_eq!(schema.index_of("anything"), None);
}

#[test]
fn extended_appends_on_the_right() {
  let schema = RowSchema::new(vec!["id".to_string()]);
  let wider = schema.extended(vec!["price".to_string(), "title".to_string()]);
  assert_eq!(wider.width(), 3);
  assert_eq!(wider.index_of("id"), Some(0));
  assert_eq!(wider.index_of("price"), Some(1));
  assert_eq!(wider.index_of("title"), Some(2));
  // The source schema is untouched.
  assert_eq!(schema.width(), 1);
}

#[test]
fn schema_roundtrip_serde() {
  let schema = RowSchema::new(vec!["a".to_string(), "b".to_string()]);
  let json = serde_json::to_string(&schema).unwrap();
  let back: RowSchema = serde_json::from_str(&json).unwrap();
  assert_eq!(back, schema);
}
