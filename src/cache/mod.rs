//! Cache steps over a process-wide shared connection pool.

use crate::error::CacheError;

mod backend;
mod input;
mod output;
mod pool;

pub use backend::{KvBackend, PooledBackend};
pub use input::CacheInputStep;
pub use output::CacheOutputStep;
pub use pool::CachePool;

/// Database index from step config: empty means the server default.
pub(crate) fn parse_db_index(base: &str) -> Result<Option<i64>, CacheError> {
  let trimmed = base.trim();
  if trimmed.is_empty() {
    return Ok(None);
  }
  trimmed
    .parse()
    .map(Some)
    .map_err(|_| CacheError::Config(format!("base `{trimmed}` must be an integer or empty")))
}
