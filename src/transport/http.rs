//! HTTP transport: sessions, query submission, and long-polled messages.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::collector::QueryCollector;
use crate::error::TransportError;
use crate::types::{Credentials, QueryRequest, ServerMessage};

use super::{FieldKind, TransportClient, TransportConnection};

/// Ceiling for plain request/response calls (session open, submit, close).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Ceiling for one long-poll round trip. The server parks the request until
/// messages exist or its own poll window lapses, so this sits well above it.
const POLL_TIMEOUT: Duration = Duration::from_secs(40);

/// Pause before re-polling after a failed poll round trip.
const POLL_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct SessionReply {
  session: String,
}

#[derive(Debug, Serialize)]
struct QuerySubmission<'a> {
  request_id: Uuid,
  #[serde(flatten)]
  request: &'a QueryRequest,
}

#[derive(Debug, Deserialize)]
struct FieldsReply {
  fields: Vec<String>,
}

/// [`TransportClient`] over the service's HTTP API.
///
/// Each connection is one server-side session: opened with `POST /session`,
/// fed by a background task long-polling `GET /session/{id}/messages`, and
/// torn down with `DELETE /session/{id}`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  base_url: String,
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(base_url: impl Into<String>) -> Self {
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Self {
      base_url,
      client: reqwest::Client::new(),
    }
  }

  fn auth_value(credentials: &Credentials) -> String {
    let token = BASE64.encode(format!("{}:{}", credentials.user_id, credentials.api_key));
    format!("Basic {token}")
  }
}

#[async_trait]
impl TransportClient for HttpTransport {
  #[instrument(level = "trace", skip(self, credentials))]
  async fn connect(
    &self,
    credentials: &Credentials,
  ) -> Result<Box<dyn TransportConnection>, TransportError> {
    let auth = Self::auth_value(credentials);
    let reply = self
      .client
      .post(format!("{}/session", self.base_url))
      .header(AUTHORIZATION, &auth)
      .timeout(REQUEST_TIMEOUT)
      .send()
      .await
      .map_err(|e| TransportError::Connect(e.to_string()))?;
    if !reply.status().is_success() {
      return Err(TransportError::Connect(format!(
        "session request returned {}",
        reply.status()
      )));
    }
    let session = reply
      .json::<SessionReply>()
      .await
      .map_err(|e| TransportError::Protocol(e.to_string()))?
      .session;
    debug!(session = %session, "opened extraction session");

    let collector_slot: Arc<Mutex<Option<Arc<QueryCollector>>>> = Arc::new(Mutex::new(None));
    let poll_task = spawn_poll_loop(
      self.client.clone(),
      format!("{}/session/{}/messages", self.base_url, session),
      auth.clone(),
      Arc::clone(&collector_slot),
    );

    Ok(Box::new(HttpConnection {
      client: self.client.clone(),
      session_url: format!("{}/session/{}", self.base_url, session),
      query_url: format!("{}/session/{}/query", self.base_url, session),
      auth,
      collector_slot,
      poll_task,
    }))
  }

  #[instrument(level = "trace", skip(self, credentials))]
  async fn list_fields(
    &self,
    credentials: &Credentials,
    target: Uuid,
    kind: FieldKind,
  ) -> Result<Vec<String>, TransportError> {
    let reply = self
      .client
      .get(format!("{}/targets/{}/fields", self.base_url, target))
      .query(&[("kind", kind.as_str())])
      .header(AUTHORIZATION, Self::auth_value(credentials))
      .timeout(REQUEST_TIMEOUT)
      .send()
      .await
      .map_err(|e| TransportError::Introspect(e.to_string()))?;
    if !reply.status().is_success() {
      return Err(TransportError::Introspect(format!(
        "field listing returned {}",
        reply.status()
      )));
    }
    reply
      .json::<FieldsReply>()
      .await
      .map(|r| r.fields)
      .map_err(|e| TransportError::Protocol(e.to_string()))
  }
}

/// Long-polls the session's message feed and fans each batch into whichever
/// collector is registered. Exits when the session disappears server-side;
/// otherwise runs until aborted by `close`.
fn spawn_poll_loop(
  client: reqwest::Client,
  messages_url: String,
  auth: String,
  collector_slot: Arc<Mutex<Option<Arc<QueryCollector>>>>,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    loop {
      let reply = client
        .get(&messages_url)
        .header(AUTHORIZATION, &auth)
        .timeout(POLL_TIMEOUT)
        .send()
        .await;
      match reply {
        Ok(reply) if reply.status() == StatusCode::NOT_FOUND => {
          debug!("session gone, message poll loop exiting");
          return;
        }
        Ok(reply) if reply.status().is_success() => {
          match reply.json::<Vec<ServerMessage>>().await {
            Ok(batch) => {
              let collector = lock(&collector_slot).clone();
              if let Some(collector) = collector {
                for message in &batch {
                  collector.on_message(message);
                }
              } else if !batch.is_empty() {
                warn!(count = batch.len(), "dropping messages with no query in flight");
              }
            }
            Err(e) => {
              warn!(error = %e, "undecodable message batch");
              tokio::time::sleep(POLL_BACKOFF).await;
            }
          }
        }
        Ok(reply) => {
          warn!(status = %reply.status(), "message poll rejected");
          tokio::time::sleep(POLL_BACKOFF).await;
        }
        Err(e) => {
          warn!(error = %e, "message poll failed");
          tokio::time::sleep(POLL_BACKOFF).await;
        }
      }
    }
  })
}

struct HttpConnection {
  client: reqwest::Client,
  session_url: String,
  query_url: String,
  auth: String,
  collector_slot: Arc<Mutex<Option<Arc<QueryCollector>>>>,
  poll_task: JoinHandle<()>,
}

#[async_trait]
impl TransportConnection for HttpConnection {
  #[instrument(level = "trace", skip(self, request, collector), fields(target = %request.target))]
  async fn submit(
    &mut self,
    request: &QueryRequest,
    collector: Arc<QueryCollector>,
  ) -> Result<(), TransportError> {
    // Register before submitting so no reply can race past the collector.
    *lock(&self.collector_slot) = Some(collector);
    let submission = QuerySubmission {
      request_id: Uuid::new_v4(),
      request,
    };
    let reply = self
      .client
      .post(&self.query_url)
      .header(AUTHORIZATION, &self.auth)
      .timeout(REQUEST_TIMEOUT)
      .json(&submission)
      .send()
      .await
      .map_err(|e| TransportError::Submit(e.to_string()))?;
    if !reply.status().is_success() {
      return Err(TransportError::Submit(format!(
        "query submission returned {}",
        reply.status()
      )));
    }
    Ok(())
  }

  async fn close(self: Box<Self>) {
    self.poll_task.abort();
    let result = self
      .client
      .delete(&self.session_url)
      .header(AUTHORIZATION, &self.auth)
      .timeout(REQUEST_TIMEOUT)
      .send()
      .await;
    match result {
      Ok(reply) if reply.status().is_success() => {
        debug!("extraction session closed");
      }
      Ok(reply) => {
        warn!(status = %reply.status(), "session delete rejected");
      }
      Err(e) => {
        warn!(error = %e, "session delete failed");
      }
    }
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
