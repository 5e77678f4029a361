// snapcart/apps/api/src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Priced snapshot of a cart line at checkout time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub seller_id: Uuid,
  pub name: String,
  pub unit_price_paise: i64,
  pub quantity: i32,
  pub offer_discount_paise: i64,
  pub line_total_paise: i64,
}
