//! Account credentials for the extraction service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account identity presented when opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
  pub user_id: Uuid,
  pub api_key: String,
}
