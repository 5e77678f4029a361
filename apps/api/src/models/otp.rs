// snapcart/apps/api/src/models/otp.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Pending OTP login for one phone. Only the code's hash is stored.
#[derive(Debug, Clone, FromRow)]
pub struct OtpSession {
  pub id: Uuid,
  pub phone: String,
  pub code_hash: String,
  pub attempts: i32,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}
