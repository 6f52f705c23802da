//! CSV row files for the command-line runner (JSON would waste width here).

use std::io::Write;
use std::path::Path;

use tracing::instrument;

use crate::types::{Row, RowSchema};

/// Reads a headered CSV file into a schema plus rows.
#[instrument(level = "trace", skip(path))]
pub fn read_rows(path: &Path) -> Result<(RowSchema, Vec<Row>), std::io::Error> {
  let mut reader = csv::Reader::from_path(path).map_err(invalid_data)?;
  let headers: Vec<String> = reader
    .headers()
    .map_err(invalid_data)?
    .iter()
    .map(str::to_string)
    .collect();
  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record.map_err(invalid_data)?;
    rows.push(record.iter().map(str::to_string).collect());
  }
  Ok((RowSchema::new(headers), rows))
}

/// Writes schema fields as the header row, then every row.
#[instrument(level = "trace", skip(path, schema, rows))]
pub fn write_rows(path: &Path, schema: &RowSchema, rows: &[Row]) -> Result<(), std::io::Error> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  let file = std::fs::File::create(path)?;
  write_rows_to(file, schema, rows)
}

/// Same as [`write_rows`] but to any writer, stdout included.
pub fn write_rows_to<W: Write>(
  writer: W,
  schema: &RowSchema,
  rows: &[Row],
) -> Result<(), std::io::Error> {
  let mut writer = csv::Writer::from_writer(writer);
  writer.write_record(schema.fields()).map_err(invalid_data)?;
  for row in rows {
    writer.write_record(row).map_err(invalid_data)?;
  }
  writer.flush()
}

fn invalid_data(e: csv::Error) -> std::io::Error {
  std::io::Error::new(std::io::ErrorKind::InvalidData, e)
}
