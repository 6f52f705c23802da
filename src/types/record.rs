//! Records returned by the extraction service.

use serde_json::Value;

/// One extracted record: a JSON object keyed by service-side field names.
pub type Record = serde_json::Map<String, Value>;

/// Cell text for `record[name]`.
///
/// Strings pass through unquoted, other scalars keep their JSON rendering,
/// and a missing or null field becomes the empty string so downstream rows
/// never carry holes.
pub fn field_as_string(record: &Record, name: &str) -> String {
  match record.get(name) {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => other.to_string(),
  }
}
