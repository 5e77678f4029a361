// snapcart/apps/api/src/models/order.rs

use super::order_item::OrderItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
  ];

  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
      (self, next),
      (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Shipped) | (Confirmed, Cancelled) | (Shipped, Delivered)
    )
  }

  /// Statuses a customer may cancel from.
  pub fn is_cancellable(self) -> bool {
    self.can_transition_to(OrderStatus::Cancelled)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Cod,
  Razorpay,
}

impl FromStr for PaymentMethod {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "cod" => Ok(PaymentMethod::Cod),
      "razorpay" | "online" => Ok(PaymentMethod::Razorpay),
      other => Err(format!("unsupported payment method '{}'", other)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
  Refunded,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub address_id: Uuid,
  pub shipping_address: String,
  pub status: OrderStatus,
  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub subtotal_paise: i64,
  pub offer_discount_paise: i64,
  pub coupon_discount_paise: i64,
  pub shipping_paise: i64,
  pub total_paise: i64,
  pub currency: String,
  pub coupon_id: Option<Uuid>,
  pub coupon_code: Option<String>,
  pub gateway_order_id: Option<String>,
  pub gateway_payment_id: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  /// Counted as revenue: paid online orders and COD orders that were not cancelled.
  pub fn counts_as_revenue(&self) -> bool {
    self.status != OrderStatus::Cancelled
      && (self.payment_status == PaymentStatus::Paid || self.payment_method == PaymentMethod::Cod)
  }

  /// Payment status once the order moves to `next`: cancelling a paid order
  /// refunds it and delivering a COD order means the cash was collected.
  pub fn payment_status_after(&self, next: OrderStatus) -> PaymentStatus {
    match next {
      OrderStatus::Cancelled if self.payment_status == PaymentStatus::Paid => PaymentStatus::Refunded,
      OrderStatus::Delivered if self.payment_method == PaymentMethod::Cod => PaymentStatus::Paid,
      _ => self.payment_status,
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
  #[serde(flatten)]
  pub order: Order,
  pub items: Vec<OrderItem>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_machine_allows_only_forward_moves() {
    use OrderStatus::*;
    assert!(Pending.can_transition_to(Confirmed));
    assert!(Pending.can_transition_to(Cancelled));
    assert!(Confirmed.can_transition_to(Shipped));
    assert!(Confirmed.can_transition_to(Cancelled));
    assert!(Shipped.can_transition_to(Delivered));

    assert!(!Shipped.can_transition_to(Cancelled));
    assert!(!Delivered.can_transition_to(Cancelled));
    assert!(!Cancelled.can_transition_to(Confirmed));
    assert!(!Pending.can_transition_to(Shipped));
    for status in OrderStatus::ALL {
      assert!(!status.can_transition_to(status), "{} -> itself", status);
    }
  }

  #[test]
  fn payment_method_parses_aliases() {
    assert_eq!("COD".parse::<PaymentMethod>(), Ok(PaymentMethod::Cod));
    assert_eq!("online".parse::<PaymentMethod>(), Ok(PaymentMethod::Razorpay));
    assert!("upi".parse::<PaymentMethod>().is_err());
  }
}
