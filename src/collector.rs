//! Completion gate and record sink for one query attempt.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, instrument, warn};

use crate::types::{MessagePayload, Record, ServerMessage};

/// Collects the messages streamed back for a single query attempt and gates
/// the waiting executor until the service marks the query finished.
///
/// One collector serves exactly one attempt: a retried row gets a fresh one.
/// Message delivery happens on transport tasks while [`wait`] blocks the
/// step task, so all mutation goes through the internal lock and the
/// finished gate releases its waiter at most once no matter how many
/// finished-flagged messages arrive.
///
/// [`wait`]: QueryCollector::wait
#[derive(Debug, Default)]
pub struct QueryCollector {
  state: Mutex<CollectorState>,
  finished: AtomicBool,
  timed_out: AtomicBool,
  notify: Notify,
}

#[derive(Debug, Default)]
struct CollectorState {
  /// `None` until the first data message arrives, so "no data message at
  /// all" stays distinguishable from "data message with zero records".
  records: Option<Vec<Record>>,
  disconnected: bool,
}

impl QueryCollector {
  pub fn new() -> Self {
    Self::default()
  }

  /// Feeds one message from the service into the attempt.
  ///
  /// Records append in arrival order; error payloads are logged and
  /// otherwise ignored; a disconnect raises the disconnected flag. Whatever
  /// the payload, a message flagged finished opens the gate, and appending
  /// happens before the gate opens so the waiter always observes the final
  /// record batch.
  pub fn on_message(&self, message: &ServerMessage) {
    match &message.payload {
      MessagePayload::Data { records } => {
        let mut state = self.lock_state();
        state
          .records
          .get_or_insert_with(Vec::new)
          .extend(records.iter().cloned());
      }
      MessagePayload::RemoteError {
        error_type,
        message,
      } => {
        error!(
          error_type = %error_type,
          message = %message,
          "extraction service reported a query error"
        );
      }
      MessagePayload::Disconnect => {
        warn!("extraction service dropped the streaming channel");
        self.lock_state().disconnected = true;
      }
    }
    if message.finished {
      self.signal_finished();
    }
  }

  /// Blocks until the finished gate opens or `timeout` elapses, whichever
  /// comes first, and records which one happened.
  ///
  /// Returns `true` on timeout. Single-use: call once per attempt, after
  /// submission.
  #[instrument(level = "trace", skip(self))]
  pub async fn wait(&self, timeout: Duration) -> bool {
    let timed_out = tokio::time::timeout(timeout, self.notify.notified())
      .await
      .is_err();
    self.timed_out.store(timed_out, Ordering::SeqCst);
    timed_out
  }

  /// Whether the service has marked the query finished.
  pub fn is_finished(&self) -> bool {
    self.finished.load(Ordering::SeqCst)
  }

  /// Whether [`wait`](QueryCollector::wait) gave up before the gate opened.
  pub fn timed_out(&self) -> bool {
    self.timed_out.load(Ordering::SeqCst)
  }

  /// Whether the streaming channel dropped during the attempt.
  pub fn disconnected(&self) -> bool {
    self.lock_state().disconnected
  }

  /// Takes the collected records. `None` means no data message ever
  /// arrived, as opposed to `Some` with an empty batch.
  pub fn take_records(&self) -> Option<Vec<Record>> {
    self.lock_state().records.take()
  }

  fn signal_finished(&self) {
    // The swap makes the gate one-shot: only the first finished-flagged
    // message stores the wakeup permit.
    if !self.finished.swap(true, Ordering::SeqCst) {
      self.notify.notify_one();
    }
  }

  fn lock_state(&self) -> std::sync::MutexGuard<'_, CollectorState> {
    self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}
