//! Error taxonomies for transports, steps, and the shared cache.

use thiserror::Error;

/// Failures raised by a transport while talking to the extraction service.
///
/// These never abort a step on their own: the executor folds them into the
/// attempt outcome and the retry loop decides what happens next.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error("could not open a session: {0}")]
  Connect(String),
  #[error("query submission failed: {0}")]
  Submit(String),
  #[error("field listing failed: {0}")]
  Introspect(String),
  #[error("unexpected reply from the service: {0}")]
  Protocol(String),
}

/// Fatal step failures. Anything surfaced here stops the run.
#[derive(Debug, Error)]
pub enum StepError {
  #[error("field `{0}` is not part of the input row schema")]
  FieldNotFound(String),
  #[error("`{0}` is sourced from an input field but the step has no input rows")]
  NoInputRows(String),
  #[error("`{value}` is not a valid target identifier: {source}")]
  InvalidTarget {
    value: String,
    #[source]
    source: uuid::Error,
  },
  #[error("invalid step configuration: {0}")]
  Config(String),
  #[error("downstream closed while rows were still being pushed")]
  SinkClosed,
  #[error(transparent)]
  Cache(#[from] CacheError),
}

/// Failures from the shared key-value cache.
#[derive(Debug, Error)]
pub enum CacheError {
  #[error("invalid cache configuration: {0}")]
  Config(String),
  #[error("cache command failed: {0}")]
  Redis(#[from] redis::RedisError),
}
