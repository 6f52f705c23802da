//! Data model shared by every rowharvest step.
//!
//! Rows are flat string cells named by a [`RowSchema`]; records come back
//! from the extraction service as JSON objects and get flattened into row
//! cells on the way out.

mod credentials;
mod message;
mod query_request;
mod record;
#[cfg(test)]
mod record_test;
mod row;
#[cfg(test)]
mod row_test;

pub use credentials::Credentials;
pub use message::{MessagePayload, ServerMessage};
pub use query_request::QueryRequest;
pub use record::{Record, field_as_string};
pub use row::{Row, RowSchema};
