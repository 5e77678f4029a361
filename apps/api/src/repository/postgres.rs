// snapcart/apps/api/src/repository/postgres.rs

use super::{
  AdminAnalytics, AnalyticsRepository, CartRepository, CatalogRepository, OrderRepository, OtpRepository, PlaceOrder,
  PromotionRepository, SellerAnalytics, TopProduct, UserRepository, TOP_PRODUCTS,
};
use crate::errors::{AppError, Result};
use crate::models::address::NewAddress;
use crate::models::banner::NewBanner;
use crate::models::coupon::{normalize_code, NewCoupon};
use crate::models::offer::NewOffer;
use crate::models::product::{NewProduct, ProductFilter, ProductUpdate};
use crate::models::user::{NewUser, ProfileUpdate};
use crate::models::{
  Address, Banner, CartItem, Category, Coupon, Offer, Order, OrderItem, OrderStatus, OrderWithItems, OtpSession,
  Product, ProductVariant, ProductWithVariants, Role, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// Orders that count towards revenue, as a SQL predicate over alias `o`.
const REVENUE_PREDICATE: &str = "o.status <> 'cancelled' AND (o.payment_status = 'paid' OR o.payment_method = 'cod')";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  /// Connects and applies the bundled migrations.
  #[instrument(name = "PgStore::connect", skip(database_url), err(Display))]
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    sqlx::migrate!("./migrations")
      .run(&pool)
      .await
      .map_err(|e| AppError::Internal(format!("Database migration failed: {}", e)))?;
    info!("Database connected and migrations applied.");
    Ok(Self::new(pool))
  }

  async fn variants_for(&self, product_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<ProductVariant>>> {
    let rows = sqlx::query_as::<_, ProductVariant>(
      "SELECT * FROM product_variants WHERE product_id = ANY($1) ORDER BY sku",
    )
    .bind(product_ids.to_vec())
    .fetch_all(&self.pool)
    .await?;
    let mut grouped: HashMap<Uuid, Vec<ProductVariant>> = HashMap::new();
    for variant in rows {
      grouped.entry(variant.product_id).or_default().push(variant);
    }
    Ok(grouped)
  }

  async fn adjust_stock(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    delta: i32,
  ) -> Result<bool> {
    let result = match variant_id {
      Some(vid) => {
        sqlx::query("UPDATE product_variants SET stock = stock + $1 WHERE id = $2 AND stock + $1 >= 0")
          .bind(delta)
          .bind(vid)
          .execute(&mut **tx)
          .await?
      }
      None => {
        sqlx::query("UPDATE products SET stock = stock + $1, updated_at = now() WHERE id = $2 AND stock + $1 >= 0")
          .bind(delta)
          .bind(product_id)
          .execute(&mut **tx)
          .await?
      }
    };
    Ok(result.rows_affected() == 1)
  }

  async fn top_products(&self, seller_id: Option<Uuid>) -> Result<Vec<TopProduct>> {
    let sql = format!(
      "SELECT oi.product_id, MIN(oi.name) AS name, SUM(oi.quantity)::BIGINT AS units_sold, \
       SUM(oi.line_total_paise)::BIGINT AS revenue_paise \
       FROM order_items oi JOIN orders o ON o.id = oi.order_id \
       WHERE {} AND ($1::uuid IS NULL OR oi.seller_id = $1) \
       GROUP BY oi.product_id ORDER BY units_sold DESC, name LIMIT $2",
      REVENUE_PREDICATE
    );
    Ok(
      sqlx::query_as::<_, TopProduct>(&sql)
        .bind(seller_id)
        .bind(TOP_PRODUCTS as i64)
        .fetch_all(&self.pool)
        .await?,
    )
  }
}

#[async_trait]
impl UserRepository for PgStore {
  async fn create_user(&self, new_user: NewUser) -> Result<User> {
    let user = new_user.into_user();
    sqlx::query_as::<_, User>(
      "INSERT INTO users (id, role, name, email, phone, password_hash, store_name, is_active, created_at, updated_at) \
       VALUES ($1, $2, $3, lower($4), $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(user.id)
    .bind(user.role)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(&user.password_hash)
    .bind(&user.store_name)
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.updated_at)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, "An account with this email or phone already exists."))
  }

  async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = lower(trim($1))")
        .bind(email)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
    Ok(
      sqlx::query_as::<_, User>("SELECT * FROM users WHERE phone = $1")
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User> {
    sqlx::query_as::<_, User>(
      "UPDATE users SET name = COALESCE($2, name), phone = COALESCE($3, phone), \
       store_name = COALESCE($4, store_name), updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(update.name)
    .bind(update.phone)
    .bind(update.store_name)
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, "An account with this phone already exists."))?
    .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
  }

  async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User> {
    sqlx::query_as::<_, User>("UPDATE users SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING *")
      .bind(id)
      .bind(active)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
  }

  async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
    Ok(
      sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE ($1::user_role IS NULL OR role = $1) ORDER BY created_at DESC",
      )
      .bind(role)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
    Ok(
      sqlx::query_as::<_, Address>(
        "SELECT * FROM addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at",
      )
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn find_address(&self, id: Uuid) -> Result<Option<Address>> {
    Ok(
      sqlx::query_as::<_, Address>("SELECT * FROM addresses WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn add_address(&self, user_id: Uuid, address: NewAddress) -> Result<Address> {
    Ok(
      sqlx::query_as::<_, Address>(
        "INSERT INTO addresses (id, user_id, full_name, phone, line1, line2, city, state, postal_code, is_default) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOT EXISTS (SELECT 1 FROM addresses WHERE user_id = $2)) \
         RETURNING *",
      )
      .bind(Uuid::new_v4())
      .bind(user_id)
      .bind(address.full_name)
      .bind(address.phone)
      .bind(address.line1)
      .bind(address.line2)
      .bind(address.city)
      .bind(address.state)
      .bind(address.postal_code)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
    let mut tx = self.pool.begin().await?;
    let removed: Option<bool> =
      sqlx::query_scalar("DELETE FROM addresses WHERE id = $1 AND user_id = $2 RETURNING is_default")
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    if removed == Some(true) {
      sqlx::query(
        "UPDATE addresses SET is_default = TRUE WHERE id = \
         (SELECT id FROM addresses WHERE user_id = $1 ORDER BY created_at LIMIT 1)",
      )
      .bind(user_id)
      .execute(&mut *tx)
      .await?;
    }
    tx.commit().await?;
    Ok(removed.is_some())
  }
}

#[async_trait]
impl OtpRepository for PgStore {
  async fn replace_otp_session(&self, session: OtpSession) -> Result<()> {
    sqlx::query(
      "INSERT INTO otp_sessions (id, phone, code_hash, attempts, expires_at, created_at) \
       VALUES ($1, $2, $3, $4, $5, $6) \
       ON CONFLICT (phone) DO UPDATE SET id = EXCLUDED.id, code_hash = EXCLUDED.code_hash, \
       attempts = EXCLUDED.attempts, expires_at = EXCLUDED.expires_at, created_at = EXCLUDED.created_at",
    )
    .bind(session.id)
    .bind(&session.phone)
    .bind(&session.code_hash)
    .bind(session.attempts)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn find_otp_session(&self, phone: &str) -> Result<Option<OtpSession>> {
    Ok(
      sqlx::query_as::<_, OtpSession>("SELECT * FROM otp_sessions WHERE phone = $1")
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn record_failed_otp_attempt(&self, id: Uuid) -> Result<i32> {
    sqlx::query_scalar::<_, i32>("UPDATE otp_sessions SET attempts = attempts + 1 WHERE id = $1 RETURNING attempts")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound("OTP session not found".to_string()))
  }

  async fn delete_otp_session(&self, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM otp_sessions WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl CatalogRepository for PgStore {
  async fn create_category(&self, name: &str, slug: &str, description: Option<String>) -> Result<Category> {
    sqlx::query_as::<_, Category>(
      "INSERT INTO categories (id, name, slug, description) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(slug)
    .bind(description)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, &format!("Category '{}' already exists", slug)))
  }

  async fn update_category(&self, id: Uuid, name: &str, slug: &str, description: Option<String>) -> Result<Category> {
    sqlx::query_as::<_, Category>(
      "UPDATE categories SET name = $2, slug = $3, description = $4 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(name)
    .bind(slug)
    .bind(description)
    .fetch_optional(&self.pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, &format!("Category '{}' already exists", slug)))?
    .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
  }

  async fn delete_category(&self, id: Uuid) -> Result<bool> {
    let in_use: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE category_id = $1)")
      .bind(id)
      .fetch_one(&self.pool)
      .await?;
    if in_use {
      return Err(AppError::Conflict("Category still has products".to_string()));
    }
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
    Ok(
      sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn create_product(&self, new_product: NewProduct) -> Result<ProductWithVariants> {
    let mut tx = self.pool.begin().await?;
    let product = sqlx::query_as::<_, Product>(
      "INSERT INTO products (id, seller_id, category_id, name, description, price_paise, stock, image_url) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(new_product.seller_id)
    .bind(new_product.category_id)
    .bind(&new_product.name)
    .bind(&new_product.description)
    .bind(new_product.price_paise)
    .bind(new_product.stock)
    .bind(&new_product.image_url)
    .fetch_one(&mut *tx)
    .await?;

    let mut variants = Vec::with_capacity(new_product.variants.len());
    for variant in new_product.variants {
      let row = sqlx::query_as::<_, ProductVariant>(
        "INSERT INTO product_variants (id, product_id, sku, label, price_paise, stock) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
      )
      .bind(Uuid::new_v4())
      .bind(product.id)
      .bind(&variant.sku)
      .bind(&variant.label)
      .bind(variant.price_paise)
      .bind(variant.stock)
      .fetch_one(&mut *tx)
      .await
      .map_err(|e| AppError::from_unique_violation(e, &format!("SKU '{}' already exists", variant.sku)))?;
      variants.push(row);
    }
    tx.commit().await?;
    Ok(ProductWithVariants { product, variants })
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<ProductWithVariants>> {
    Ok(self.find_products(&[id]).await?.remove(&id))
  }

  async fn find_products(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ProductWithVariants>> {
    if ids.is_empty() {
      return Ok(HashMap::new());
    }
    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
      .bind(ids.to_vec())
      .fetch_all(&self.pool)
      .await?;
    let mut variants = self.variants_for(ids).await?;
    Ok(
      products
        .into_iter()
        .map(|product| {
          let variants = variants.remove(&product.id).unwrap_or_default();
          (product.id, ProductWithVariants { product, variants })
        })
        .collect(),
    )
  }

  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let term = filter
      .q
      .as_deref()
      .map(str::trim)
      .filter(|q| !q.is_empty())
      .map(|q| format!("%{}%", q.replace('%', "\\%").replace('_', "\\_")));
    Ok(
      sqlx::query_as::<_, Product>(
        "SELECT * FROM products WHERE is_active \
         AND ($1::uuid IS NULL OR category_id = $1) \
         AND ($2::uuid IS NULL OR seller_id = $2) \
         AND ($3::text IS NULL OR name ILIKE $3 OR description ILIKE $3) \
         AND ($4::bigint IS NULL OR price_paise >= $4) \
         AND ($5::bigint IS NULL OR price_paise <= $5) \
         ORDER BY created_at DESC LIMIT $6 OFFSET $7",
      )
      .bind(filter.category_id)
      .bind(filter.seller_id)
      .bind(term)
      .bind(filter.min_price_paise)
      .bind(filter.max_price_paise)
      .bind(filter.limit())
      .bind(filter.offset())
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn update_product(&self, id: Uuid, update: ProductUpdate) -> Result<Product> {
    sqlx::query_as::<_, Product>(
      "UPDATE products SET name = COALESCE($2, name), description = COALESCE($3, description), \
       category_id = COALESCE($4, category_id), price_paise = COALESCE($5, price_paise), \
       stock = COALESCE($6, stock), image_url = COALESCE($7, image_url), is_active = COALESCE($8, is_active), \
       updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(update.name)
    .bind(update.description)
    .bind(update.category_id)
    .bind(update.price_paise)
    .bind(update.stock)
    .bind(update.image_url)
    .bind(update.is_active)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
  }
}

#[async_trait]
impl CartRepository for PgStore {
  async fn list_cart(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
    Ok(
      sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE user_id = $1 ORDER BY created_at")
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn find_cart_line(&self, user_id: Uuid, product_id: Uuid, variant_id: Option<Uuid>) -> Result<Option<CartItem>> {
    Ok(
      sqlx::query_as::<_, CartItem>(
        "SELECT * FROM cart_items WHERE user_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3",
      )
      .bind(user_id)
      .bind(product_id)
      .bind(variant_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn find_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>> {
    Ok(
      sqlx::query_as::<_, CartItem>("SELECT * FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn upsert_cart_line(
    &self,
    user_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
  ) -> Result<CartItem> {
    let updated = sqlx::query_as::<_, CartItem>(
      "UPDATE cart_items SET quantity = $4, updated_at = now() \
       WHERE user_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3 RETURNING *",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await?;
    if let Some(item) = updated {
      return Ok(item);
    }
    sqlx::query_as::<_, CartItem>(
      "INSERT INTO cart_items (id, user_id, product_id, variant_id, quantity) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(quantity)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, "Cart line was modified concurrently, retry."))
  }

  async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
      .bind(item_id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl PromotionRepository for PgStore {
  async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon> {
    let code = normalize_code(&coupon.code);
    sqlx::query_as::<_, Coupon>(
      "INSERT INTO coupons (id, code, description, discount_type, value, max_discount_paise, min_order_paise, \
       usage_limit, per_user_limit, starts_at, ends_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&code)
    .bind(coupon.description)
    .bind(coupon.discount_type)
    .bind(coupon.value)
    .bind(coupon.max_discount_paise)
    .bind(coupon.min_order_paise)
    .bind(coupon.usage_limit)
    .bind(coupon.per_user_limit)
    .bind(coupon.starts_at)
    .bind(coupon.ends_at)
    .fetch_one(&self.pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, &format!("Coupon '{}' already exists", code)))
  }

  async fn list_coupons(&self) -> Result<Vec<Coupon>> {
    Ok(
      sqlx::query_as::<_, Coupon>("SELECT * FROM coupons ORDER BY created_at DESC")
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
    Ok(
      sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = $1")
        .bind(normalize_code(code))
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn set_coupon_active(&self, id: Uuid, active: bool) -> Result<Coupon> {
    sqlx::query_as::<_, Coupon>("UPDATE coupons SET is_active = $2 WHERE id = $1 RETURNING *")
      .bind(id)
      .bind(active)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Coupon {} not found", id)))
  }

  async fn count_coupon_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<i64> {
    Ok(
      sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2")
        .bind(coupon_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn create_offer(&self, offer: NewOffer) -> Result<Offer> {
    Ok(
      sqlx::query_as::<_, Offer>(
        "INSERT INTO offers (id, title, discount_type, value, max_discount_paise, product_id, category_id, \
         starts_at, ends_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
      )
      .bind(Uuid::new_v4())
      .bind(offer.title)
      .bind(offer.discount_type)
      .bind(offer.value)
      .bind(offer.max_discount_paise)
      .bind(offer.product_id)
      .bind(offer.category_id)
      .bind(offer.starts_at)
      .bind(offer.ends_at)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn list_offers(&self, live_at: Option<DateTime<Utc>>) -> Result<Vec<Offer>> {
    Ok(
      sqlx::query_as::<_, Offer>(
        "SELECT * FROM offers WHERE ($1::timestamptz IS NULL OR (is_active AND starts_at <= $1 AND ends_at >= $1)) \
         ORDER BY created_at DESC",
      )
      .bind(live_at)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn set_offer_active(&self, id: Uuid, active: bool) -> Result<Offer> {
    sqlx::query_as::<_, Offer>("UPDATE offers SET is_active = $2 WHERE id = $1 RETURNING *")
      .bind(id)
      .bind(active)
      .fetch_optional(&self.pool)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Offer {} not found", id)))
  }

  async fn create_banner(&self, banner: NewBanner) -> Result<Banner> {
    Ok(
      sqlx::query_as::<_, Banner>(
        "INSERT INTO banners (id, title, image_url, link_url, position) VALUES ($1, $2, $3, $4, $5) RETURNING *",
      )
      .bind(Uuid::new_v4())
      .bind(banner.title)
      .bind(banner.image_url)
      .bind(banner.link_url)
      .bind(banner.position)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>> {
    Ok(
      sqlx::query_as::<_, Banner>(
        "SELECT * FROM banners WHERE (NOT $1 OR is_active) ORDER BY position, created_at",
      )
      .bind(active_only)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn delete_banner(&self, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM banners WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }
}

#[async_trait]
impl OrderRepository for PgStore {
  #[instrument(name = "PgStore::place_order", skip(self, request), fields(order_id = %request.order_id), err(Display))]
  async fn place_order(&self, request: PlaceOrder) -> Result<OrderWithItems> {
    let mut tx = self.pool.begin().await?;
    let quote = &request.quote;

    for line in &quote.lines {
      if !Self::adjust_stock(&mut tx, line.product_id, line.variant_id, -line.quantity).await? {
        return Err(AppError::Conflict(format!("'{}' ran out of stock", line.name)));
      }
    }

    if let Some(coupon_id) = request.coupon_id {
      // The row lock serialises checkouts redeeming the same coupon.
      let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE id = $1 FOR UPDATE")
        .bind(coupon_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Coupon {} not found", coupon_id)))?;
      if let Some(limit) = coupon.per_user_limit {
        let used_by_caller =
          sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2")
            .bind(coupon_id)
            .bind(request.user_id)
            .fetch_one(&mut *tx)
            .await?;
        if used_by_caller >= i64::from(limit) {
          return Err(AppError::Conflict(format!("You have already used coupon '{}'", coupon.code)));
        }
      }
      let claimed = sqlx::query(
        "UPDATE coupons SET used_count = used_count + 1 \
         WHERE id = $1 AND (usage_limit IS NULL OR used_count < usage_limit)",
      )
      .bind(coupon_id)
      .execute(&mut *tx)
      .await?;
      if claimed.rows_affected() != 1 {
        return Err(AppError::Conflict("Coupon has reached its usage limit".to_string()));
      }
    }

    let order = sqlx::query_as::<_, Order>(
      "INSERT INTO orders (id, user_id, address_id, shipping_address, status, payment_method, subtotal_paise, \
       offer_discount_paise, coupon_discount_paise, shipping_paise, total_paise, currency, coupon_id, coupon_code, \
       gateway_order_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING *",
    )
    .bind(request.order_id)
    .bind(request.user_id)
    .bind(request.address.id)
    .bind(request.address.to_shipping_label())
    .bind(request.initial_status())
    .bind(request.payment_method)
    .bind(quote.subtotal_paise)
    .bind(quote.offer_discount_paise)
    .bind(quote.coupon_discount_paise)
    .bind(quote.shipping_paise)
    .bind(quote.total_paise)
    .bind(&quote.currency)
    .bind(request.coupon_id)
    .bind(&quote.coupon_code)
    .bind(&request.gateway_order_id)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(quote.lines.len());
    for line in &quote.lines {
      let item = sqlx::query_as::<_, OrderItem>(
        "INSERT INTO order_items (id, order_id, product_id, variant_id, seller_id, name, unit_price_paise, quantity, \
         offer_discount_paise, line_total_paise) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
      )
      .bind(Uuid::new_v4())
      .bind(order.id)
      .bind(line.product_id)
      .bind(line.variant_id)
      .bind(line.seller_id)
      .bind(&line.name)
      .bind(line.unit_price_paise)
      .bind(line.quantity)
      .bind(line.offer_discount_paise)
      .bind(line.line_total_paise)
      .fetch_one(&mut *tx)
      .await?;
      items.push(item);
    }

    if let Some(coupon_id) = request.coupon_id {
      sqlx::query("INSERT INTO coupon_usages (id, coupon_id, user_id, order_id) VALUES ($1, $2, $3, $4)")
        .bind(Uuid::new_v4())
        .bind(coupon_id)
        .bind(request.user_id)
        .bind(order.id)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(request.user_id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    Ok(OrderWithItems { order, items })
  }

  async fn find_order(&self, id: Uuid) -> Result<Option<OrderWithItems>> {
    let Some(order) = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await?
    else {
      return Ok(None);
    };
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY name")
      .bind(id)
      .fetch_all(&self.pool)
      .await?;
    Ok(Some(OrderWithItems { order, items }))
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    Ok(
      sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    Ok(
      sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE ($1::order_status IS NULL OR status = $1) ORDER BY created_at DESC",
      )
      .bind(status)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn list_orders_for_seller(&self, seller_id: Uuid) -> Result<Vec<OrderWithItems>> {
    let orders = sqlx::query_as::<_, Order>(
      "SELECT o.* FROM orders o WHERE EXISTS \
       (SELECT 1 FROM order_items oi WHERE oi.order_id = o.id AND oi.seller_id = $1) \
       ORDER BY o.created_at DESC",
    )
    .bind(seller_id)
    .fetch_all(&self.pool)
    .await?;
    let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE seller_id = $1")
      .bind(seller_id)
      .fetch_all(&self.pool)
      .await?;
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in items {
      by_order.entry(item.order_id).or_default().push(item);
    }
    Ok(
      orders
        .into_iter()
        .map(|order| {
          let items = by_order.remove(&order.id).unwrap_or_default();
          OrderWithItems { order, items }
        })
        .collect(),
    )
  }

  #[instrument(name = "PgStore::transition_order", skip(self), err(Display))]
  async fn transition_order(&self, id: Uuid, next: OrderStatus) -> Result<Order> {
    let mut tx = self.pool.begin().await?;
    let current = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
      .bind(id)
      .fetch_optional(&mut *tx)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;
    if !current.status.can_transition_to(next) {
      return Err(AppError::Conflict(format!(
        "Order cannot move from {} to {}",
        current.status, next
      )));
    }

    if next == OrderStatus::Cancelled {
      let items = sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = $1")
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
      for item in items {
        Self::adjust_stock(&mut tx, item.product_id, item.variant_id, item.quantity).await?;
      }
    }

    let order = sqlx::query_as::<_, Order>(
      "UPDATE orders SET status = $2, payment_status = $3, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(next)
    .bind(current.payment_status_after(next))
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(order)
  }

  async fn record_payment(&self, id: Uuid, gateway_payment_id: &str, success: bool) -> Result<Order> {
    sqlx::query_as::<_, Order>(
      "UPDATE orders SET \
       payment_status = CASE WHEN $3 THEN 'paid'::payment_status ELSE 'failed'::payment_status END, \
       gateway_payment_id = CASE WHEN $3 THEN $2 ELSE gateway_payment_id END, \
       status = CASE WHEN $3 AND status = 'pending' THEN 'confirmed'::order_status ELSE status END, \
       updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(gateway_payment_id)
    .bind(success)
    .fetch_optional(&self.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))
  }
}

#[async_trait]
impl AnalyticsRepository for PgStore {
  async fn admin_analytics(&self) -> Result<AdminAnalytics> {
    let (revenue_paise, revenue_orders): (i64, i64) = sqlx::query_as(&format!(
      "SELECT COALESCE(SUM(o.total_paise), 0)::BIGINT, COUNT(*) FROM orders o WHERE {}",
      REVENUE_PREDICATE
    ))
    .fetch_one(&self.pool)
    .await?;

    let by_status: Vec<(OrderStatus, i64)> = sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
      .fetch_all(&self.pool)
      .await?;
    let by_role: Vec<(Role, i64)> = sqlx::query_as("SELECT role, COUNT(*) FROM users GROUP BY role")
      .fetch_all(&self.pool)
      .await?;
    let role_count = |role: Role| by_role.iter().find(|(r, _)| *r == role).map_or(0, |(_, n)| *n);

    Ok(AdminAnalytics {
      revenue_paise,
      order_count: by_status.iter().map(|(_, n)| n).sum(),
      orders_by_status: by_status.iter().copied().collect(),
      customer_count: role_count(Role::Customer),
      seller_count: role_count(Role::Seller),
      average_order_value_paise: if revenue_orders > 0 { revenue_paise / revenue_orders } else { 0 },
      top_products: self.top_products(None).await?,
    })
  }

  async fn seller_analytics(&self, seller_id: Uuid) -> Result<SellerAnalytics> {
    let (revenue_paise, units_sold, order_count): (i64, i64, i64) = sqlx::query_as(&format!(
      "SELECT COALESCE(SUM(oi.line_total_paise), 0)::BIGINT, COALESCE(SUM(oi.quantity), 0)::BIGINT, \
       COUNT(DISTINCT oi.order_id) FROM order_items oi JOIN orders o ON o.id = oi.order_id \
       WHERE oi.seller_id = $1 AND {}",
      REVENUE_PREDICATE
    ))
    .bind(seller_id)
    .fetch_one(&self.pool)
    .await?;

    Ok(SellerAnalytics {
      revenue_paise,
      units_sold,
      order_count,
      top_products: self.top_products(Some(seller_id)).await?,
    })
  }
}
