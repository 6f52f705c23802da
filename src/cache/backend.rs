//! Key-value commands issued by the cache steps.

use async_trait::async_trait;

use crate::error::CacheError;

use super::pool::CachePool;

/// The few commands cache steps need, behind a seam so step logic can be
/// tested without a live server.
#[async_trait]
pub trait KvBackend: Send {
  async fn get(&mut self, db: Option<i64>, key: &str) -> Result<Option<String>, CacheError>;

  async fn set(&mut self, db: Option<i64>, key: &str, value: &str) -> Result<(), CacheError>;

  /// Writes `pairs` in one pipelined round trip.
  async fn set_many(
    &mut self,
    db: Option<i64>,
    pairs: &[(String, String)],
  ) -> Result<(), CacheError>;
}

/// [`KvBackend`] over the shared [`CachePool`].
///
/// A configured database index is selected before every command. Commands
/// without one run on whatever the shared connection last selected.
pub struct PooledBackend {
  pool: CachePool,
}

impl PooledBackend {
  pub fn new(pool: CachePool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl KvBackend for PooledBackend {
  async fn get(&mut self, db: Option<i64>, key: &str) -> Result<Option<String>, CacheError> {
    let mut manager = self.pool.manager().await?;
    if let Some(db) = db {
      redis::cmd("SELECT").arg(db).query_async::<()>(&mut manager).await?;
    }
    let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut manager).await?;
    Ok(value)
  }

  async fn set(&mut self, db: Option<i64>, key: &str, value: &str) -> Result<(), CacheError> {
    let mut manager = self.pool.manager().await?;
    if let Some(db) = db {
      redis::cmd("SELECT").arg(db).query_async::<()>(&mut manager).await?;
    }
    redis::cmd("SET")
      .arg(key)
      .arg(value)
      .query_async::<()>(&mut manager)
      .await?;
    Ok(())
  }

  async fn set_many(
    &mut self,
    db: Option<i64>,
    pairs: &[(String, String)],
  ) -> Result<(), CacheError> {
    if pairs.is_empty() {
      return Ok(());
    }
    let mut manager = self.pool.manager().await?;
    let mut pipe = redis::pipe();
    if let Some(db) = db {
      pipe.cmd("SELECT").arg(db).ignore();
    }
    for (key, value) in pairs {
      pipe.cmd("SET").arg(key).arg(value).ignore();
    }
    pipe.query_async::<()>(&mut manager).await?;
    Ok(())
  }
}
