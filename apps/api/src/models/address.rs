// snapcart/apps/api/src/models/address.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Address {
  pub id: Uuid,
  pub user_id: Uuid,
  pub full_name: String,
  pub phone: String,
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
}

impl Address {
  /// Single-line rendering stored on orders, so later edits don't rewrite history.
  pub fn to_shipping_label(&self) -> String {
    let mut parts = vec![self.full_name.clone(), self.line1.clone()];
    if let Some(line2) = self.line2.as_ref().filter(|l| !l.trim().is_empty()) {
      parts.push(line2.clone());
    }
    parts.push(format!("{}, {} {}", self.city, self.state, self.postal_code));
    parts.push(self.phone.clone());
    parts.join(", ")
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAddress {
  pub full_name: String,
  pub phone: String,
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub postal_code: String,
}
