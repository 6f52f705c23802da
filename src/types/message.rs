//! Wire messages streamed back for an in-flight query.

use serde::{Deserialize, Serialize};

use super::Record;

/// One message pushed by the extraction service while a query runs.
///
/// The `finished` flag rides alongside any payload kind; the service sets it
/// on whichever message completes the query, including error and disconnect
/// notices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMessage {
  #[serde(flatten)]
  pub payload: MessagePayload,
  #[serde(default)]
  pub finished: bool,
}

/// Payload kinds carried by [`ServerMessage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePayload {
  /// A batch of extracted records, possibly empty.
  Data { records: Vec<Record> },
  /// The service hit an error while extracting. Informational only; the
  /// query is over when a message arrives with `finished` set.
  RemoteError { error_type: String, message: String },
  /// The streaming channel dropped server-side.
  Disconnect,
}

impl ServerMessage {
  pub fn data(records: Vec<Record>, finished: bool) -> Self {
    Self {
      payload: MessagePayload::Data { records },
      finished,
    }
  }

  pub fn remote_error(
    error_type: impl Into<String>,
    message: impl Into<String>,
    finished: bool,
  ) -> Self {
    Self {
      payload: MessagePayload::RemoteError {
        error_type: error_type.into(),
        message: message.into(),
      },
      finished,
    }
  }

  pub fn disconnect(finished: bool) -> Self {
    Self {
      payload: MessagePayload::Disconnect,
      finished,
    }
  }
}
