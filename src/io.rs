//! Row movement at the edges of a step.
//!
//! Steps read rows one at a time from a [`RowSource`] and push result rows
//! into a [`RowSink`]. Both are deliberately minimal so steps can be driven
//! from channels, in-memory fixtures, or file readers without caring which.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::StepError;
use crate::types::{Row, RowSchema};

/// Upstream of a step: a schema plus an ordered sequence of rows.
#[async_trait]
pub trait RowSource: Send {
  /// Schema of the rows this source yields. Meaningful only when the
  /// source actually has rows; a step that never receives one ignores it.
  fn schema(&self) -> &RowSchema;

  /// Next row, or `None` once the upstream is exhausted. Must keep
  /// returning `None` after the first `None`.
  async fn pull(&mut self) -> Option<Row>;
}

/// Downstream of a step.
#[async_trait]
pub trait RowSink: Send {
  /// Hands one finished row downstream.
  async fn push(&mut self, row: Row) -> Result<(), StepError>;
}

/// A [`RowSource`] over any stream of rows.
pub struct StreamRowSource {
  schema: RowSchema,
  rows: Pin<Box<dyn Stream<Item = Row> + Send>>,
}

impl StreamRowSource {
  pub fn new<S>(schema: RowSchema, rows: S) -> Self
  where
    S: Stream<Item = Row> + Send + 'static,
  {
    Self {
      schema,
      rows: Box::pin(rows),
    }
  }

  /// Fixed in-memory rows, mostly for tests and small jobs.
  pub fn from_rows(schema: RowSchema, rows: Vec<Row>) -> Self {
    Self::new(schema, futures::stream::iter(rows))
  }

  /// Rows arriving over an mpsc channel from another task.
  pub fn from_receiver(schema: RowSchema, receiver: mpsc::Receiver<Row>) -> Self {
    Self::new(schema, ReceiverStream::new(receiver))
  }

  /// A source with no schema and no rows: drives a step in generator mode.
  pub fn generator() -> Self {
    Self::from_rows(RowSchema::empty(), vec![])
  }
}

#[async_trait]
impl RowSource for StreamRowSource {
  fn schema(&self) -> &RowSchema {
    &self.schema
  }

  async fn pull(&mut self) -> Option<Row> {
    self.rows.next().await
  }
}

/// A [`RowSink`] that forwards rows into an mpsc channel.
pub struct ChannelRowSink {
  sender: mpsc::Sender<Row>,
}

impl ChannelRowSink {
  pub fn new(sender: mpsc::Sender<Row>) -> Self {
    Self { sender }
  }
}

#[async_trait]
impl RowSink for ChannelRowSink {
  async fn push(&mut self, row: Row) -> Result<(), StepError> {
    self.sender.send(row).await.map_err(|_| StepError::SinkClosed)
  }
}

/// A [`RowSink`] that buffers everything in memory.
#[derive(Debug, Default)]
pub struct CollectRowSink {
  pub rows: Vec<Row>,
}

impl CollectRowSink {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl RowSink for CollectRowSink {
  async fn push(&mut self, row: Row) -> Result<(), StepError> {
    self.rows.push(row);
    Ok(())
  }
}
