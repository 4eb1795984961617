//! Authentication token model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API token for a user. Each user holds at most one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    /// Opaque token key sent in the `Authorization` header
    pub key: String,
    /// Owning user ID
    pub user_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// Issue a fresh token for a user
    pub fn generate(user_id: i64) -> Self {
        Self {
            key: Uuid::new_v4().simple().to_string(),
            user_id,
            created_at: Utc::now(),
        }
    }
}
