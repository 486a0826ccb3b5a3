//! Password reset request model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minutes a reset code stays valid
pub const RESET_CODE_TTL_MINUTES: i64 = 10;

/// Minutes a verified reset token stays valid
pub const RESET_TOKEN_TTL_MINUTES: i64 = 5;

/// A phone-based password reset request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub id: Uuid,
    pub phone: String,
    pub code: String,
    pub user_id: Uuid,
    pub is_used: bool,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    pub fn new(phone: String, code: String, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phone,
            code,
            user_id,
            is_used: false,
            reset_token: None,
            reset_token_expiry: None,
            expires_at: now + Duration::minutes(RESET_CODE_TTL_MINUTES),
            created_at: now,
        }
    }

    pub fn code_is_valid(&self) -> bool {
        !self.is_used && Utc::now() < self.expires_at
    }

    pub fn token_is_valid(&self) -> bool {
        !self.is_used && self.reset_token_expiry.is_some_and(|t| Utc::now() < t)
    }
}
