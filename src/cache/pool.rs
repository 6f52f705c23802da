//! Process-wide shared cache pool with reference counting.

use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use tracing::{debug, instrument};

use crate::error::CacheError;

static SHARED_POOL: Lazy<Mutex<Option<PoolEntry>>> = Lazy::new(|| Mutex::new(None));

struct PoolEntry {
  refs: usize,
  inner: Arc<PoolInner>,
}

struct PoolInner {
  url: String,
  client: redis::Client,
  manager: tokio::sync::OnceCell<ConnectionManager>,
}

impl PoolInner {
  /// The shared multiplexed connection, created lazily on first use.
  async fn manager(&self) -> Result<ConnectionManager, CacheError> {
    let manager = self
      .manager
      .get_or_try_init(|| self.client.get_connection_manager())
      .await?;
    Ok(manager.clone())
  }
}

/// A counted handle on the process-wide cache pool.
///
/// All cache steps in a process share one pool: the first `acquire` builds
/// it, later ones bump the count, and dropping the last handle tears it
/// down so the next acquire starts fresh. Acquiring does no I/O; the
/// connection itself is established lazily by the first command.
pub struct CachePool {
  inner: Arc<PoolInner>,
}

impl CachePool {
  /// Joins the shared pool, creating it on first use.
  ///
  /// `port` arrives as text from step config and must parse; a second
  /// acquire with a different address still joins the existing pool, it
  /// does not open a second one.
  #[instrument(level = "debug", skip_all, fields(host = %host))]
  pub fn acquire(host: &str, port: &str) -> Result<CachePool, CacheError> {
    let port: u16 = port
      .trim()
      .parse()
      .map_err(|_| CacheError::Config(format!("port `{port}` is not a number")))?;
    let url = format!("redis://{host}:{port}/");

    let mut slot = lock_pool();
    if let Some(entry) = slot.as_mut() {
      if entry.inner.url != url {
        debug!(
          existing = %entry.inner.url,
          requested = %url,
          "joining existing cache pool with a different address"
        );
      }
      entry.refs += 1;
      return Ok(CachePool {
        inner: Arc::clone(&entry.inner),
      });
    }

    let client = redis::Client::open(url.as_str())?;
    let inner = Arc::new(PoolInner {
      url,
      client,
      manager: tokio::sync::OnceCell::new(),
    });
    *slot = Some(PoolEntry {
      refs: 1,
      inner: Arc::clone(&inner),
    });
    debug!("cache pool created");
    Ok(CachePool { inner })
  }

  pub(crate) async fn manager(&self) -> Result<ConnectionManager, CacheError> {
    self.inner.manager().await
  }

  /// Live handle count, for teardown checks.
  #[cfg(test)]
  pub(crate) fn active_refs() -> usize {
    lock_pool().as_ref().map(|entry| entry.refs).unwrap_or(0)
  }
}

impl Drop for CachePool {
  fn drop(&mut self) {
    let mut slot = lock_pool();
    if let Some(entry) = slot.as_mut() {
      entry.refs -= 1;
      if entry.refs == 0 {
        *slot = None;
        debug!("last handle dropped, cache pool destroyed");
      }
    }
  }
}

fn lock_pool() -> MutexGuard<'static, Option<PoolEntry>> {
  SHARED_POOL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
