// snapcart/apps/api/src/models/coupon.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Shared by coupons and offers. `Percentage` values are whole percent (1..=100),
/// `Flat` values are paise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "discount_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
  Percentage,
  Flat,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Coupon {
  pub id: Uuid,
  pub code: String,
  pub description: Option<String>,
  pub discount_type: DiscountType,
  pub value: i64,
  pub max_discount_paise: Option<i64>,
  pub min_order_paise: i64,
  pub usage_limit: Option<i32>,
  pub per_user_limit: Option<i32>,
  pub used_count: i32,
  pub starts_at: Option<DateTime<Utc>>,
  pub ends_at: Option<DateTime<Utc>>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

/// Normalised form used for storage and lookup.
pub fn normalize_code(code: &str) -> String {
  code.trim().to_ascii_uppercase()
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCoupon {
  pub code: String,
  pub description: Option<String>,
  pub discount_type: DiscountType,
  pub value: i64,
  pub max_discount_paise: Option<i64>,
  #[serde(default)]
  pub min_order_paise: i64,
  pub usage_limit: Option<i32>,
  pub per_user_limit: Option<i32>,
  pub starts_at: Option<DateTime<Utc>>,
  pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CouponUsage {
  pub id: Uuid,
  pub coupon_id: Uuid,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub used_at: DateTime<Utc>,
}
