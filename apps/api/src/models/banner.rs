// snapcart/apps/api/src/models/banner.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Banner {
  pub id: Uuid,
  pub title: String,
  pub image_url: String,
  pub link_url: Option<String>,
  pub position: i32,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBanner {
  pub title: String,
  pub image_url: String,
  pub link_url: Option<String>,
  #[serde(default)]
  pub position: i32,
}
