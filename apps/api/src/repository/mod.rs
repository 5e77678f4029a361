// snapcart/apps/api/src/repository/mod.rs

//! Persistence seams. Handlers only see these traits; `PgStore` and
//! `MemoryStore` implement all of them.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::Result;
use crate::models::address::NewAddress;
use crate::models::banner::NewBanner;
use crate::models::coupon::NewCoupon;
use crate::models::offer::NewOffer;
use crate::models::product::{NewProduct, ProductFilter, ProductUpdate};
use crate::models::user::{NewUser, ProfileUpdate};
use crate::models::{
  Address, Banner, CartItem, Category, Coupon, Offer, Order, OrderStatus, OrderWithItems, OtpSession, PaymentMethod,
  Product, ProductWithVariants, Role, User,
};
use crate::pricing::Quote;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
  /// Fails with `Conflict` when the email or phone is taken.
  async fn create_user(&self, new_user: NewUser) -> Result<User>;
  async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
  /// Case-insensitive.
  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
  async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>>;
  async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User>;
  async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User>;
  async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>>;

  async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>>;
  async fn find_address(&self, id: Uuid) -> Result<Option<Address>>;
  /// The first address of a user becomes the default.
  async fn add_address(&self, user_id: Uuid, address: NewAddress) -> Result<Address>;
  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
  /// Stores `session`, dropping any earlier session for the same phone.
  async fn replace_otp_session(&self, session: OtpSession) -> Result<()>;
  async fn find_otp_session(&self, phone: &str) -> Result<Option<OtpSession>>;
  /// Returns the attempt count after the increment.
  async fn record_failed_otp_attempt(&self, id: Uuid) -> Result<i32>;
  async fn delete_otp_session(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
  /// Fails with `Conflict` when the slug is taken.
  async fn create_category(&self, name: &str, slug: &str, description: Option<String>) -> Result<Category>;
  async fn update_category(&self, id: Uuid, name: &str, slug: &str, description: Option<String>) -> Result<Category>;
  /// Fails with `Conflict` while products still reference the category.
  async fn delete_category(&self, id: Uuid) -> Result<bool>;
  async fn list_categories(&self) -> Result<Vec<Category>>;
  async fn find_category(&self, id: Uuid) -> Result<Option<Category>>;

  async fn create_product(&self, product: NewProduct) -> Result<ProductWithVariants>;
  async fn find_product(&self, id: Uuid) -> Result<Option<ProductWithVariants>>;
  /// Loads several products keyed by id. Missing ids are simply absent.
  async fn find_products(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ProductWithVariants>>;
  /// Active products matching `filter`, newest first.
  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
  async fn update_product(&self, id: Uuid, update: ProductUpdate) -> Result<Product>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
  async fn list_cart(&self, user_id: Uuid) -> Result<Vec<CartItem>>;
  async fn find_cart_line(&self, user_id: Uuid, product_id: Uuid, variant_id: Option<Uuid>) -> Result<Option<CartItem>>;
  async fn find_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>>;
  /// Sets the quantity of the user's line for this product/variant, creating it if needed.
  async fn upsert_cart_line(
    &self,
    user_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
  ) -> Result<CartItem>;
  async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool>;
  async fn clear_cart(&self, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait PromotionRepository: Send + Sync {
  /// Fails with `Conflict` when the (normalised) code exists.
  async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon>;
  async fn list_coupons(&self) -> Result<Vec<Coupon>>;
  async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>>;
  async fn set_coupon_active(&self, id: Uuid, active: bool) -> Result<Coupon>;
  async fn count_coupon_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<i64>;

  async fn create_offer(&self, offer: NewOffer) -> Result<Offer>;
  /// With `live_at`, only offers live at that instant.
  async fn list_offers(&self, live_at: Option<DateTime<Utc>>) -> Result<Vec<Offer>>;
  async fn set_offer_active(&self, id: Uuid, active: bool) -> Result<Offer>;

  async fn create_banner(&self, banner: NewBanner) -> Result<Banner>;
  async fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>>;
  async fn delete_banner(&self, id: Uuid) -> Result<bool>;
}

/// Everything the checkout commits in one go.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
  pub order_id: Uuid,
  pub user_id: Uuid,
  pub address: Address,
  pub payment_method: PaymentMethod,
  pub quote: Quote,
  pub coupon_id: Option<Uuid>,
  pub gateway_order_id: Option<String>,
}

impl PlaceOrder {
  /// COD orders are confirmed on placement; online orders wait for payment.
  pub fn initial_status(&self) -> OrderStatus {
    match self.payment_method {
      PaymentMethod::Cod => OrderStatus::Confirmed,
      PaymentMethod::Razorpay => OrderStatus::Pending,
    }
  }
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
  /// Atomically: inserts the order and items, decrements stock (failing when
  /// stock ran out meanwhile), records coupon usage and clears the cart.
  async fn place_order(&self, order: PlaceOrder) -> Result<OrderWithItems>;
  async fn find_order(&self, id: Uuid) -> Result<Option<OrderWithItems>>;
  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>>;
  async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>>;
  /// Orders containing the seller's items, with only those items attached.
  async fn list_orders_for_seller(&self, seller_id: Uuid) -> Result<Vec<OrderWithItems>>;
  /// Moves the order along the status machine. Cancelling restores stock and
  /// marks paid orders refunded; delivering a COD order marks it paid.
  async fn transition_order(&self, id: Uuid, next: OrderStatus) -> Result<Order>;
  /// Records a gateway payment outcome. Success also confirms a pending order.
  async fn record_payment(&self, id: Uuid, gateway_payment_id: &str, success: bool) -> Result<Order>;
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq, sqlx::FromRow)]
pub struct TopProduct {
  pub product_id: Uuid,
  pub name: String,
  pub units_sold: i64,
  pub revenue_paise: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminAnalytics {
  pub revenue_paise: i64,
  pub order_count: i64,
  pub orders_by_status: HashMap<OrderStatus, i64>,
  pub customer_count: i64,
  pub seller_count: i64,
  pub average_order_value_paise: i64,
  pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SellerAnalytics {
  pub revenue_paise: i64,
  pub units_sold: i64,
  pub order_count: i64,
  pub top_products: Vec<TopProduct>,
}

#[async_trait]
pub trait AnalyticsRepository: Send + Sync {
  async fn admin_analytics(&self) -> Result<AdminAnalytics>;
  async fn seller_analytics(&self, seller_id: Uuid) -> Result<SellerAnalytics>;
}

/// Number of entries in `top_products`.
pub const TOP_PRODUCTS: usize = 5;

/// Handles to every repository, shared through `AppState`.
#[derive(Clone)]
pub struct Repositories {
  pub users: Arc<dyn UserRepository>,
  pub otp: Arc<dyn OtpRepository>,
  pub catalog: Arc<dyn CatalogRepository>,
  pub carts: Arc<dyn CartRepository>,
  pub promotions: Arc<dyn PromotionRepository>,
  pub orders: Arc<dyn OrderRepository>,
  pub analytics: Arc<dyn AnalyticsRepository>,
}

impl Repositories {
  pub fn from_store<S>(store: Arc<S>) -> Self
  where
    S: UserRepository
      + OtpRepository
      + CatalogRepository
      + CartRepository
      + PromotionRepository
      + OrderRepository
      + AnalyticsRepository
      + 'static,
  {
    Self {
      users: store.clone(),
      otp: store.clone(),
      catalog: store.clone(),
      carts: store.clone(),
      promotions: store.clone(),
      orders: store.clone(),
      analytics: store,
    }
  }
}
