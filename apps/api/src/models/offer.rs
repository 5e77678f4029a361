// snapcart/apps/api/src/models/offer.rs

use super::coupon::DiscountType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Automatic discount. Targets a product, else a category, else the whole catalog.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Offer {
  pub id: Uuid,
  pub title: String,
  pub discount_type: DiscountType,
  pub value: i64,
  pub max_discount_paise: Option<i64>,
  pub product_id: Option<Uuid>,
  pub category_id: Option<Uuid>,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl Offer {
  pub fn is_live(&self, now: DateTime<Utc>) -> bool {
    self.is_active && self.starts_at <= now && now <= self.ends_at
  }

  pub fn targets(&self, product_id: Uuid, category_id: Uuid) -> bool {
    match (self.product_id, self.category_id) {
      (Some(p), _) => p == product_id,
      (None, Some(c)) => c == category_id,
      (None, None) => true,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOffer {
  pub title: String,
  pub discount_type: DiscountType,
  pub value: i64,
  pub max_discount_paise: Option<i64>,
  pub product_id: Option<Uuid>,
  pub category_id: Option<Uuid>,
  pub starts_at: DateTime<Utc>,
  pub ends_at: DateTime<Utc>,
}
