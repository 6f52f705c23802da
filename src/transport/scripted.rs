//! A scripted in-process transport for tests and offline demos.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::collector::QueryCollector;
use crate::error::TransportError;
use crate::types::{Credentials, QueryRequest, Record, ServerMessage};

use super::{FieldKind, TransportClient, TransportConnection};

/// What one connection attempt should do: refuse outright, or deliver a
/// timed message sequence after submission.
#[derive(Debug, Clone, Default)]
pub struct AttemptScript {
  refuse_connect: bool,
  refuse_submit: bool,
  messages: Vec<(Duration, ServerMessage)>,
}

impl AttemptScript {
  /// Delivers `records` in one batch and finishes shortly after submit.
  pub fn success(records: Vec<Record>) -> Self {
    Self::default().then_message(Duration::from_millis(10), ServerMessage::data(records, true))
  }

  /// Accepts the query but never sends anything, so the attempt times out.
  pub fn silence() -> Self {
    Self::default()
  }

  /// Drops the channel mid-query without ever finishing.
  pub fn dropped_channel() -> Self {
    Self::default().then_message(Duration::from_millis(10), ServerMessage::disconnect(false))
  }

  /// Refuses the session outright.
  pub fn refuse_connect() -> Self {
    Self {
      refuse_connect: true,
      ..Self::default()
    }
  }

  /// Errors the submission. Any scripted messages still fire, which models
  /// a submit that failed client-side while the query ran anyway.
  pub fn refuse_submit() -> Self {
    Self {
      refuse_submit: true,
      ..Self::default()
    }
  }

  /// Appends a message scheduled `delay` after submission.
  pub fn then_message(mut self, delay: Duration, message: ServerMessage) -> Self {
    self.messages.push((delay, message));
    self
  }
}

#[derive(Debug)]
enum ScriptSupply {
  Sequence(VecDeque<AttemptScript>),
  Repeat(AttemptScript),
}

#[derive(Debug)]
struct ScriptedInner {
  supply: Mutex<ScriptSupply>,
  fields: Mutex<Vec<String>>,
  attempts: AtomicUsize,
  connects: AtomicUsize,
  closes: AtomicUsize,
  submitted: Mutex<Vec<QueryRequest>>,
}

/// A [`TransportClient`] that replays pre-written attempt scripts.
///
/// Clones share one script supply and one set of counters, so a test can
/// keep a handle for assertions while the step owns another.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
  inner: Arc<ScriptedInner>,
}

impl ScriptedTransport {
  /// Plays `scripts` once, in order. Connecting past the end refuses.
  pub fn sequence(scripts: Vec<AttemptScript>) -> Self {
    Self::with_supply(ScriptSupply::Sequence(scripts.into()))
  }

  /// Plays `script` for every attempt, forever.
  pub fn repeating(script: AttemptScript) -> Self {
    Self::with_supply(ScriptSupply::Repeat(script))
  }

  fn with_supply(supply: ScriptSupply) -> Self {
    Self {
      inner: Arc::new(ScriptedInner {
        supply: Mutex::new(supply),
        fields: Mutex::new(vec![]),
        attempts: AtomicUsize::new(0),
        connects: AtomicUsize::new(0),
        closes: AtomicUsize::new(0),
        submitted: Mutex::new(vec![]),
      }),
    }
  }

  /// Field names served to every `list_fields` call.
  pub fn with_fields(self, fields: Vec<String>) -> Self {
    *lock(&self.inner.fields) = fields;
    self
  }

  /// Connection attempts so far, including refused ones.
  pub fn attempt_count(&self) -> usize {
    self.inner.attempts.load(Ordering::SeqCst)
  }

  /// Sessions actually opened.
  pub fn connect_count(&self) -> usize {
    self.inner.connects.load(Ordering::SeqCst)
  }

  /// Sessions closed again.
  pub fn close_count(&self) -> usize {
    self.inner.closes.load(Ordering::SeqCst)
  }

  /// Every request submitted, in submission order.
  pub fn submitted(&self) -> Vec<QueryRequest> {
    lock(&self.inner.submitted).clone()
  }

  fn next_script(&self) -> Option<AttemptScript> {
    match &mut *lock(&self.inner.supply) {
      ScriptSupply::Sequence(scripts) => scripts.pop_front(),
      ScriptSupply::Repeat(script) => Some(script.clone()),
    }
  }
}

#[async_trait]
impl TransportClient for ScriptedTransport {
  async fn connect(
    &self,
    _credentials: &Credentials,
  ) -> Result<Box<dyn TransportConnection>, TransportError> {
    self.inner.attempts.fetch_add(1, Ordering::SeqCst);
    let script = self
      .next_script()
      .ok_or_else(|| TransportError::Connect("script exhausted".to_string()))?;
    if script.refuse_connect {
      return Err(TransportError::Connect("scripted refusal".to_string()));
    }
    self.inner.connects.fetch_add(1, Ordering::SeqCst);
    Ok(Box::new(ScriptedConnection {
      inner: Arc::clone(&self.inner),
      refuse_submit: script.refuse_submit,
      messages: script.messages,
      delivery: None,
    }))
  }

  async fn list_fields(
    &self,
    _credentials: &Credentials,
    _target: Uuid,
    _kind: FieldKind,
  ) -> Result<Vec<String>, TransportError> {
    Ok(lock(&self.inner.fields).clone())
  }
}

struct ScriptedConnection {
  inner: Arc<ScriptedInner>,
  refuse_submit: bool,
  messages: Vec<(Duration, ServerMessage)>,
  delivery: Option<JoinHandle<()>>,
}

#[async_trait]
impl TransportConnection for ScriptedConnection {
  async fn submit(
    &mut self,
    request: &QueryRequest,
    collector: Arc<QueryCollector>,
  ) -> Result<(), TransportError> {
    lock(&self.inner.submitted).push(request.clone());
    let messages = std::mem::take(&mut self.messages);
    self.delivery = Some(tokio::spawn(async move {
      for (delay, message) in messages {
        tokio::time::sleep(delay).await;
        collector.on_message(&message);
      }
    }));
    if self.refuse_submit {
      return Err(TransportError::Submit("scripted refusal".to_string()));
    }
    Ok(())
  }

  async fn close(self: Box<Self>) {
    // Messages stop flowing the moment the session goes away.
    if let Some(delivery) = self.delivery {
      delivery.abort();
    }
    self.inner.closes.fetch_add(1, Ordering::SeqCst);
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
