//! Transports to the extraction service.
//!
//! A [`TransportClient`] opens one [`TransportConnection`] per query attempt;
//! the connection pushes whatever the service streams back into the
//! attempt's [`QueryCollector`](crate::collector::QueryCollector) from its
//! own tasks. Steps never talk to a transport directly, the executor does.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::collector::QueryCollector;
use crate::error::TransportError;
use crate::types::{Credentials, QueryRequest};

mod http;
mod scripted;

pub use http::HttpTransport;
pub use scripted::{AttemptScript, ScriptedTransport};

/// Which side of an extractor's field list to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Input,
  Output,
}

impl FieldKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      FieldKind::Input => "input",
      FieldKind::Output => "output",
    }
  }
}

/// Entry point to the extraction service.
#[async_trait]
pub trait TransportClient: Send + Sync {
  /// Opens a fresh session. Each query attempt gets its own connection.
  async fn connect(
    &self,
    credentials: &Credentials,
  ) -> Result<Box<dyn TransportConnection>, TransportError>;

  /// Names of the fields a target consumes or produces, for schema
  /// tooling. Not part of the per-row query path.
  async fn list_fields(
    &self,
    credentials: &Credentials,
    target: Uuid,
    kind: FieldKind,
  ) -> Result<Vec<String>, TransportError>;
}

/// One live session with the service.
#[async_trait]
pub trait TransportConnection: Send {
  /// Submits a query and registers `collector` for its streamed replies.
  ///
  /// An error here does not guarantee the query is dead server-side;
  /// replies may still arrive afterwards, so the caller is expected to
  /// wait out the attempt either way.
  async fn submit(
    &mut self,
    request: &QueryRequest,
    collector: Arc<QueryCollector>,
  ) -> Result<(), TransportError>;

  /// Tears the session down. Infallible by contract: failures are logged
  /// and swallowed so callers can always release the connection.
  async fn close(self: Box<Self>);
}
