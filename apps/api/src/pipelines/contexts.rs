// snapcart/apps/api/src/pipelines/contexts.rs

//! Data carried through each pipeline run. Handlers receive these wrapped in
//! `flow::ContextData` and write their results back into them.

use crate::models::{
  Address, CartItem, Coupon, Offer, Order, OrderStatus, OrderWithItems, OtpSession, PaymentMethod, ProductWithVariants,
  Role, User,
};
use crate::pricing::{PricedLine, Quote, UnavailableLine};
use crate::services::payment_gateway::GatewayOrder;
use crate::services::token_service::TokenPair;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use uuid::Uuid;

// --- Accounts ---

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub role: Role,
  pub name: String,
  pub email: String,
  pub password: String,
  pub store_name: Option<String>,
  pub user: Option<User>,
  pub tokens: Option<TokenPair>,
  pub welcome_email_sent: bool,
}

impl SignupCtxData {
  pub fn new(app_state: AppState, role: Role, name: String, email: String, password: String, store_name: Option<String>) -> Self {
    Self {
      app_state,
      role,
      name,
      email,
      password,
      store_name,
      user: None,
      tokens: None,
      welcome_email_sent: false,
    }
  }
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub email: String,
  pub password: String,
  pub user: Option<User>,
  pub tokens: Option<TokenPair>,
}

#[derive(Clone)]
pub struct OtpRequestCtxData {
  pub app_state: AppState,
  pub phone: String,
  pub code: Option<String>,
  pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct OtpVerifyCtxData {
  pub app_state: AppState,
  pub phone: String,
  pub code: String,
  pub session: Option<OtpSession>,
  pub user: Option<User>,
  pub account_created: bool,
  pub tokens: Option<TokenPair>,
}

// --- Cart ---

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  pub quantity: i32,
  pub product: Option<ProductWithVariants>,
  /// Quantity the line will hold once this add is applied.
  pub merged_quantity: i32,
  pub cart_item: Option<CartItem>,
}

// --- Checkout ---

/// What a checkout run is for. Only `Place` has side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
  /// `GET /api/cart`: an empty cart stops the run instead of failing it.
  CartView,
  Preview,
  Place,
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub mode: CheckoutMode,
  pub user_id: Uuid,
  pub coupon_code: Option<String>,
  pub address_id: Option<Uuid>,
  pub payment_method: PaymentMethod,
  pub now: DateTime<Utc>,

  pub cart_items: Vec<CartItem>,
  pub address: Option<Address>,
  pub lines: Vec<PricedLine>,
  pub unavailable: Vec<UnavailableLine>,
  pub offers: Vec<Offer>,
  pub coupon: Option<Coupon>,
  pub quote: Option<Quote>,
  pub order_id: Uuid,
  pub gateway_order: Option<GatewayOrder>,
  pub order: Option<OrderWithItems>,
  pub confirmation_email_sent: bool,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, mode: CheckoutMode, user_id: Uuid) -> Self {
    Self {
      app_state,
      mode,
      user_id,
      coupon_code: None,
      address_id: None,
      payment_method: PaymentMethod::Cod,
      now: Utc::now(),
      cart_items: Vec::new(),
      address: None,
      lines: Vec::new(),
      unavailable: Vec::new(),
      offers: Vec::new(),
      coupon: None,
      quote: None,
      order_id: Uuid::new_v4(),
      gateway_order: None,
      order: None,
      confirmation_email_sent: false,
    }
  }

  pub fn has_coupon(&self) -> bool {
    self.coupon_code.as_deref().is_some_and(|c| !c.trim().is_empty())
  }
}

// --- Payments and orders ---

#[derive(Clone)]
pub struct VerifyPaymentCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub gateway_order_id: String,
  pub gateway_payment_id: String,
  pub signature: String,
  pub order: Option<Order>,
  pub signature_valid: bool,
  pub already_paid: bool,
}

#[derive(Clone)]
pub struct OrderTransitionCtxData {
  pub app_state: AppState,
  pub actor_id: Uuid,
  pub actor_role: Role,
  pub order_id: Uuid,
  pub next_status: OrderStatus,
  pub order: Option<Order>,
  pub updated: Option<Order>,
  pub customer_notified: bool,
}

// --- Notifications ---

#[derive(Clone)]
pub struct WelcomeEmailCtxData {
  pub app_state: AppState,
  pub recipient_email: String,
  pub recipient_name: String,
}

#[derive(Clone)]
pub struct OrderEmailCtxData {
  pub app_state: AppState,
  pub recipient_email: String,
  pub recipient_name: String,
  pub order_id: Uuid,
  pub subject: String,
  pub headline: String,
}
