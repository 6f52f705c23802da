//! Rows and the field schema that names their positions.

use serde::{Deserialize, Serialize};

/// One pipeline row: an ordered list of string cells.
pub type Row = Vec<String>;

/// Ordered field names for the rows moving through a step.
///
/// Cell positions are meaningless without this; steps resolve field names to
/// indices once, at first-row time, and read cells by index afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSchema {
  fields: Vec<String>,
}

impl RowSchema {
  pub fn new(fields: Vec<String>) -> Self {
    Self { fields }
  }

  /// Schema of a row stream with no fields at all (generator steps).
  pub fn empty() -> Self {
    Self { fields: vec![] }
  }

  pub fn width(&self) -> usize {
    self.fields.len()
  }

  pub fn fields(&self) -> &[String] {
    &self.fields
  }

  /// Position of `name`, or `None` when the field is not part of the schema.
  pub fn index_of(&self, name: &str) -> Option<usize> {
    self.fields.iter().position(|f| f == name)
  }

  /// A copy of this schema with `extra` field names appended on the right.
  pub fn extended<I>(&self, extra: I) -> RowSchema
  where
    I: IntoIterator<Item = String>,
  {
    let mut fields = self.fields.clone();
    fields.extend(extra);
    Self { fields }
  }
}
