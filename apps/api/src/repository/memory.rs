// snapcart/apps/api/src/repository/memory.rs

//! In-process store behind one `parking_lot` lock. Every trait method takes the
//! lock once, so multi-record operations such as `place_order` are atomic.

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
  Address, Banner, CartItem, Category, Coupon, CouponUsage, Offer, Order, OrderItem, OrderStatus, OrderWithItems,
  OtpSession, PaymentStatus, Product, ProductVariant, ProductWithVariants, Role, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  users: HashMap<Uuid, User>,
  addresses: HashMap<Uuid, Address>,
  otp_sessions: HashMap<Uuid, OtpSession>,
  categories: HashMap<Uuid, Category>,
  products: HashMap<Uuid, Product>,
  variants: HashMap<Uuid, ProductVariant>,
  cart_items: HashMap<Uuid, CartItem>,
  coupons: HashMap<Uuid, Coupon>,
  coupon_usages: Vec<CouponUsage>,
  offers: HashMap<Uuid, Offer>,
  banners: HashMap<Uuid, Banner>,
  orders: HashMap<Uuid, Order>,
  order_items: Vec<OrderItem>,
}

impl Tables {
  fn with_variants(&self, product: &Product) -> ProductWithVariants {
    let mut variants: Vec<ProductVariant> = self
      .variants
      .values()
      .filter(|v| v.product_id == product.id)
      .cloned()
      .collect();
    variants.sort_by(|a, b| a.sku.cmp(&b.sku));
    ProductWithVariants {
      product: product.clone(),
      variants,
    }
  }

  fn items_of(&self, order_id: Uuid) -> Vec<OrderItem> {
    self.order_items.iter().filter(|i| i.order_id == order_id).cloned().collect()
  }

  /// Adds `delta` to the stock of the variant, or of the product when no variant is given.
  fn adjust_stock(&mut self, product_id: Uuid, variant_id: Option<Uuid>, delta: i32) -> Result<()> {
    let (stock, name) = match variant_id {
      Some(vid) => {
        let variant = self
          .variants
          .get_mut(&vid)
          .ok_or_else(|| AppError::NotFound(format!("Variant {} not found", vid)))?;
        (&mut variant.stock, variant.label.clone())
      }
      None => {
        let product = self
          .products
          .get_mut(&product_id)
          .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
        (&mut product.stock, product.name.clone())
      }
    };
    if *stock + delta < 0 {
      return Err(AppError::Conflict(format!("'{}' ran out of stock", name)));
    }
    *stock += delta;
    Ok(())
  }
}

#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

fn sorted_newest_first<T: Clone>(items: impl Iterator<Item = T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
  let mut items: Vec<T> = items.collect();
  items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
  items
}

#[async_trait]
impl UserRepository for MemoryStore {
  async fn create_user(&self, new_user: NewUser) -> Result<User> {
    let mut tables = self.tables.write();
    let email = new_user.email.as_ref().map(|e| e.to_lowercase());
    if let Some(email) = &email {
      if tables.users.values().any(|u| u.email.as_deref() == Some(email.as_str())) {
        return Err(AppError::Conflict("An account with this email already exists.".to_string()));
      }
    }
    if let Some(phone) = &new_user.phone {
      if tables.users.values().any(|u| u.phone.as_deref() == Some(phone.as_str())) {
        return Err(AppError::Conflict("An account with this phone already exists.".to_string()));
      }
    }
    let user = NewUser { email, ..new_user }.into_user();
    tables.users.insert(user.id, user.clone());
    Ok(user)
  }

  async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
    Ok(self.tables.read().users.get(&id).cloned())
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    Ok(
      self
        .tables
        .read()
        .users
        .values()
        .find(|u| u.email.as_deref() == Some(email.as_str()))
        .cloned(),
    )
  }

  async fn find_user_by_phone(&self, phone: &str) -> Result<Option<User>> {
    Ok(self.tables.read().users.values().find(|u| u.phone.as_deref() == Some(phone)).cloned())
  }

  async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User> {
    let mut tables = self.tables.write();
    if let Some(phone) = &update.phone {
      if tables.users.values().any(|u| u.id != id && u.phone.as_deref() == Some(phone.as_str())) {
        return Err(AppError::Conflict("An account with this phone already exists.".to_string()));
      }
    }
    let user = tables
      .users
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    if let Some(name) = update.name {
      user.name = name;
    }
    if let Some(phone) = update.phone {
      user.phone = Some(phone);
    }
    if let Some(store_name) = update.store_name {
      user.store_name = Some(store_name);
    }
    user.updated_at = Utc::now();
    Ok(user.clone())
  }

  async fn set_user_active(&self, id: Uuid, active: bool) -> Result<User> {
    let mut tables = self.tables.write();
    let user = tables
      .users
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    user.is_active = active;
    user.updated_at = Utc::now();
    Ok(user.clone())
  }

  async fn list_users(&self, role: Option<Role>) -> Result<Vec<User>> {
    let tables = self.tables.read();
    Ok(sorted_newest_first(
      tables.users.values().filter(|u| role.map_or(true, |r| u.role == r)).cloned(),
      |u| u.created_at,
    ))
  }

  async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
    let tables = self.tables.read();
    let mut addresses: Vec<Address> = tables.addresses.values().filter(|a| a.user_id == user_id).cloned().collect();
    addresses.sort_by_key(|a| (!a.is_default, a.created_at));
    Ok(addresses)
  }

  async fn find_address(&self, id: Uuid) -> Result<Option<Address>> {
    Ok(self.tables.read().addresses.get(&id).cloned())
  }

  async fn add_address(&self, user_id: Uuid, address: NewAddress) -> Result<Address> {
    let mut tables = self.tables.write();
    let is_default = !tables.addresses.values().any(|a| a.user_id == user_id);
    let record = Address {
      id: Uuid::new_v4(),
      user_id,
      full_name: address.full_name,
      phone: address.phone,
      line1: address.line1,
      line2: address.line2,
      city: address.city,
      state: address.state,
      postal_code: address.postal_code,
      is_default,
      created_at: Utc::now(),
    };
    tables.addresses.insert(record.id, record.clone());
    Ok(record)
  }

  async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    match tables.addresses.get(&id) {
      Some(a) if a.user_id == user_id => {
        let removed = tables.addresses.remove(&id);
        if removed.is_some_and(|a| a.is_default) {
          let next = tables
            .addresses
            .values_mut()
            .filter(|a| a.user_id == user_id)
            .min_by_key(|a| a.created_at);
          if let Some(next) = next {
            next.is_default = true;
          }
        }
        Ok(true)
      }
      _ => Ok(false),
    }
  }
}

#[async_trait]
impl OtpRepository for MemoryStore {
  async fn replace_otp_session(&self, session: OtpSession) -> Result<()> {
    let mut tables = self.tables.write();
    tables.otp_sessions.retain(|_, s| s.phone != session.phone);
    tables.otp_sessions.insert(session.id, session);
    Ok(())
  }

  async fn find_otp_session(&self, phone: &str) -> Result<Option<OtpSession>> {
    Ok(self.tables.read().otp_sessions.values().find(|s| s.phone == phone).cloned())
  }

  async fn record_failed_otp_attempt(&self, id: Uuid) -> Result<i32> {
    let mut tables = self.tables.write();
    let session = tables
      .otp_sessions
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound("OTP session not found".to_string()))?;
    session.attempts += 1;
    Ok(session.attempts)
  }

  async fn delete_otp_session(&self, id: Uuid) -> Result<()> {
    self.tables.write().otp_sessions.remove(&id);
    Ok(())
  }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
  async fn create_category(&self, name: &str, slug: &str, description: Option<String>) -> Result<Category> {
    let mut tables = self.tables.write();
    if tables.categories.values().any(|c| c.slug == slug) {
      return Err(AppError::Conflict(format!("Category '{}' already exists", slug)));
    }
    let category = Category {
      id: Uuid::new_v4(),
      name: name.to_string(),
      slug: slug.to_string(),
      description,
      created_at: Utc::now(),
    };
    tables.categories.insert(category.id, category.clone());
    Ok(category)
  }

  async fn update_category(&self, id: Uuid, name: &str, slug: &str, description: Option<String>) -> Result<Category> {
    let mut tables = self.tables.write();
    if tables.categories.values().any(|c| c.id != id && c.slug == slug) {
      return Err(AppError::Conflict(format!("Category '{}' already exists", slug)));
    }
    let category = tables
      .categories
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;
    category.name = name.to_string();
    category.slug = slug.to_string();
    category.description = description;
    Ok(category.clone())
  }

  async fn delete_category(&self, id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    if tables.products.values().any(|p| p.category_id == id) {
      return Err(AppError::Conflict("Category still has products".to_string()));
    }
    Ok(tables.categories.remove(&id).is_some())
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let mut categories: Vec<Category> = self.tables.read().categories.values().cloned().collect();
    categories.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(categories)
  }

  async fn find_category(&self, id: Uuid) -> Result<Option<Category>> {
    Ok(self.tables.read().categories.get(&id).cloned())
  }

  async fn create_product(&self, new_product: NewProduct) -> Result<ProductWithVariants> {
    let mut tables = self.tables.write();
    for variant in &new_product.variants {
      if tables.variants.values().any(|v| v.sku == variant.sku) {
        return Err(AppError::Conflict(format!("SKU '{}' already exists", variant.sku)));
      }
    }
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      seller_id: new_product.seller_id,
      category_id: new_product.category_id,
      name: new_product.name,
      description: new_product.description,
      price_paise: new_product.price_paise,
      stock: new_product.stock,
      image_url: new_product.image_url,
      is_active: true,
      created_at: now,
      updated_at: now,
    };
    for variant in new_product.variants {
      let record = ProductVariant {
        id: Uuid::new_v4(),
        product_id: product.id,
        sku: variant.sku,
        label: variant.label,
        price_paise: variant.price_paise,
        stock: variant.stock,
      };
      tables.variants.insert(record.id, record);
    }
    tables.products.insert(product.id, product.clone());
    Ok(tables.with_variants(&product))
  }

  async fn find_product(&self, id: Uuid) -> Result<Option<ProductWithVariants>> {
    let tables = self.tables.read();
    Ok(tables.products.get(&id).map(|p| tables.with_variants(p)))
  }

  async fn find_products(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, ProductWithVariants>> {
    let tables = self.tables.read();
    Ok(
      ids
        .iter()
        .filter_map(|id| tables.products.get(id))
        .map(|p| (p.id, tables.with_variants(p)))
        .collect(),
    )
  }

  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let tables = self.tables.read();
    let matching = sorted_newest_first(tables.products.values().filter(|p| filter.matches(p)).cloned(), |p| {
      p.created_at
    });
    Ok(
      matching
        .into_iter()
        .skip(filter.offset() as usize)
        .take(filter.limit() as usize)
        .collect(),
    )
  }

  async fn update_product(&self, id: Uuid, update: ProductUpdate) -> Result<Product> {
    let mut tables = self.tables.write();
    let product = tables
      .products
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))?;
    if let Some(name) = update.name {
      product.name = name;
    }
    if let Some(description) = update.description {
      product.description = Some(description);
    }
    if let Some(category_id) = update.category_id {
      product.category_id = category_id;
    }
    if let Some(price) = update.price_paise {
      product.price_paise = price;
    }
    if let Some(stock) = update.stock {
      product.stock = stock;
    }
    if let Some(image_url) = update.image_url {
      product.image_url = Some(image_url);
    }
    if let Some(active) = update.is_active {
      product.is_active = active;
    }
    product.updated_at = Utc::now();
    Ok(product.clone())
  }
}

#[async_trait]
impl CartRepository for MemoryStore {
  async fn list_cart(&self, user_id: Uuid) -> Result<Vec<CartItem>> {
    let tables = self.tables.read();
    let mut items: Vec<CartItem> = tables.cart_items.values().filter(|i| i.user_id == user_id).cloned().collect();
    items.sort_by_key(|i| i.created_at);
    Ok(items)
  }

  async fn find_cart_line(&self, user_id: Uuid, product_id: Uuid, variant_id: Option<Uuid>) -> Result<Option<CartItem>> {
    Ok(
      self
        .tables
        .read()
        .cart_items
        .values()
        .find(|i| i.user_id == user_id && i.product_id == product_id && i.variant_id == variant_id)
        .cloned(),
    )
  }

  async fn find_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<CartItem>> {
    Ok(
      self
        .tables
        .read()
        .cart_items
        .get(&item_id)
        .filter(|i| i.user_id == user_id)
        .cloned(),
    )
  }

  async fn upsert_cart_line(
    &self,
    user_id: Uuid,
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
  ) -> Result<CartItem> {
    let mut tables = self.tables.write();
    let now = Utc::now();
    let existing = tables
      .cart_items
      .values_mut()
      .find(|i| i.user_id == user_id && i.product_id == product_id && i.variant_id == variant_id);
    if let Some(item) = existing {
      item.quantity = quantity;
      item.updated_at = now;
      return Ok(item.clone());
    }
    let item = CartItem {
      id: Uuid::new_v4(),
      user_id,
      product_id,
      variant_id,
      quantity,
      created_at: now,
      updated_at: now,
    };
    tables.cart_items.insert(item.id, item.clone());
    Ok(item)
  }

  async fn remove_cart_item(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
    let mut tables = self.tables.write();
    match tables.cart_items.get(&item_id) {
      Some(item) if item.user_id == user_id => Ok(tables.cart_items.remove(&item_id).is_some()),
      _ => Ok(false),
    }
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
    self.tables.write().cart_items.retain(|_, i| i.user_id != user_id);
    Ok(())
  }
}

#[async_trait]
impl PromotionRepository for MemoryStore {
  async fn create_coupon(&self, coupon: NewCoupon) -> Result<Coupon> {
    let mut tables = self.tables.write();
    let code = normalize_code(&coupon.code);
    if tables.coupons.values().any(|c| c.code == code) {
      return Err(AppError::Conflict(format!("Coupon '{}' already exists", code)));
    }
    let record = Coupon {
      id: Uuid::new_v4(),
      code,
      description: coupon.description,
      discount_type: coupon.discount_type,
      value: coupon.value,
      max_discount_paise: coupon.max_discount_paise,
      min_order_paise: coupon.min_order_paise,
      usage_limit: coupon.usage_limit,
      per_user_limit: coupon.per_user_limit,
      used_count: 0,
      starts_at: coupon.starts_at,
      ends_at: coupon.ends_at,
      is_active: true,
      created_at: Utc::now(),
    };
    tables.coupons.insert(record.id, record.clone());
    Ok(record)
  }

  async fn list_coupons(&self) -> Result<Vec<Coupon>> {
    Ok(sorted_newest_first(self.tables.read().coupons.values().cloned(), |c| c.created_at))
  }

  async fn find_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
    let code = normalize_code(code);
    Ok(self.tables.read().coupons.values().find(|c| c.code == code).cloned())
  }

  async fn set_coupon_active(&self, id: Uuid, active: bool) -> Result<Coupon> {
    let mut tables = self.tables.write();
    let coupon = tables
      .coupons
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Coupon {} not found", id)))?;
    coupon.is_active = active;
    Ok(coupon.clone())
  }

  async fn count_coupon_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<i64> {
    let tables = self.tables.read();
    Ok(
      tables
        .coupon_usages
        .iter()
        .filter(|u| u.coupon_id == coupon_id && u.user_id == user_id)
        .count() as i64,
    )
  }

  async fn create_offer(&self, offer: NewOffer) -> Result<Offer> {
    let record = Offer {
      id: Uuid::new_v4(),
      title: offer.title,
      discount_type: offer.discount_type,
      value: offer.value,
      max_discount_paise: offer.max_discount_paise,
      product_id: offer.product_id,
      category_id: offer.category_id,
      starts_at: offer.starts_at,
      ends_at: offer.ends_at,
      is_active: true,
      created_at: Utc::now(),
    };
    self.tables.write().offers.insert(record.id, record.clone());
    Ok(record)
  }

  async fn list_offers(&self, live_at: Option<DateTime<Utc>>) -> Result<Vec<Offer>> {
    let tables = self.tables.read();
    Ok(sorted_newest_first(
      tables
        .offers
        .values()
        .filter(|o| live_at.map_or(true, |now| o.is_live(now)))
        .cloned(),
      |o| o.created_at,
    ))
  }

  async fn set_offer_active(&self, id: Uuid, active: bool) -> Result<Offer> {
    let mut tables = self.tables.write();
    let offer = tables
      .offers
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Offer {} not found", id)))?;
    offer.is_active = active;
    Ok(offer.clone())
  }

  async fn create_banner(&self, banner: NewBanner) -> Result<Banner> {
    let record = Banner {
      id: Uuid::new_v4(),
      title: banner.title,
      image_url: banner.image_url,
      link_url: banner.link_url,
      position: banner.position,
      is_active: true,
      created_at: Utc::now(),
    };
    self.tables.write().banners.insert(record.id, record.clone());
    Ok(record)
  }

  async fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>> {
    let mut banners: Vec<Banner> = self
      .tables
      .read()
      .banners
      .values()
      .filter(|b| !active_only || b.is_active)
      .cloned()
      .collect();
    banners.sort_by_key(|b| (b.position, b.created_at));
    Ok(banners)
  }

  async fn delete_banner(&self, id: Uuid) -> Result<bool> {
    Ok(self.tables.write().banners.remove(&id).is_some())
  }
}

#[async_trait]
impl OrderRepository for MemoryStore {
  async fn place_order(&self, request: PlaceOrder) -> Result<OrderWithItems> {
    let mut tables = self.tables.write();

    // Validate every stock decrement before mutating anything.
    for line in &request.quote.lines {
      let available = match line.variant_id {
        Some(vid) => tables.variants.get(&vid).map(|v| v.stock),
        None => tables.products.get(&line.product_id).map(|p| p.stock),
      };
      if available.unwrap_or(0) < line.quantity {
        return Err(AppError::Conflict(format!("'{}' ran out of stock", line.name)));
      }
    }
    if let Some(coupon_id) = request.coupon_id {
      let coupon = tables
        .coupons
        .get(&coupon_id)
        .ok_or_else(|| AppError::NotFound(format!("Coupon {} not found", coupon_id)))?;
      if coupon.usage_limit.is_some_and(|limit| coupon.used_count >= limit) {
        return Err(AppError::Conflict(format!("Coupon '{}' has reached its usage limit", coupon.code)));
      }
      let used_by_caller = tables
        .coupon_usages
        .iter()
        .filter(|u| u.coupon_id == coupon_id && u.user_id == request.user_id)
        .count() as i64;
      if coupon.per_user_limit.is_some_and(|limit| used_by_caller >= i64::from(limit)) {
        return Err(AppError::Conflict(format!("You have already used coupon '{}'", coupon.code)));
      }
    }

    for line in &request.quote.lines {
      tables.adjust_stock(line.product_id, line.variant_id, -line.quantity)?;
    }

    let now = Utc::now();
    let quote = &request.quote;
    let order = Order {
      id: request.order_id,
      user_id: request.user_id,
      address_id: request.address.id,
      shipping_address: request.address.to_shipping_label(),
      status: request.initial_status(),
      payment_method: request.payment_method,
      payment_status: PaymentStatus::Pending,
      subtotal_paise: quote.subtotal_paise,
      offer_discount_paise: quote.offer_discount_paise,
      coupon_discount_paise: quote.coupon_discount_paise,
      shipping_paise: quote.shipping_paise,
      total_paise: quote.total_paise,
      currency: quote.currency.clone(),
      coupon_id: request.coupon_id,
      coupon_code: quote.coupon_code.clone(),
      gateway_order_id: request.gateway_order_id.clone(),
      gateway_payment_id: None,
      created_at: now,
      updated_at: now,
    };
    let items: Vec<OrderItem> = quote
      .lines
      .iter()
      .map(|line| OrderItem {
        id: Uuid::new_v4(),
        order_id: order.id,
        product_id: line.product_id,
        variant_id: line.variant_id,
        seller_id: line.seller_id,
        name: line.name.clone(),
        unit_price_paise: line.unit_price_paise,
        quantity: line.quantity,
        offer_discount_paise: line.offer_discount_paise,
        line_total_paise: line.line_total_paise,
      })
      .collect();

    if let Some(coupon_id) = request.coupon_id {
      if let Some(coupon) = tables.coupons.get_mut(&coupon_id) {
        coupon.used_count += 1;
      }
      tables.coupon_usages.push(CouponUsage {
        id: Uuid::new_v4(),
        coupon_id,
        user_id: request.user_id,
        order_id: order.id,
        used_at: now,
      });
    }
    tables.cart_items.retain(|_, i| i.user_id != request.user_id);
    tables.order_items.extend(items.iter().cloned());
    tables.orders.insert(order.id, order.clone());

    Ok(OrderWithItems { order, items })
  }

  async fn find_order(&self, id: Uuid) -> Result<Option<OrderWithItems>> {
    let tables = self.tables.read();
    Ok(tables.orders.get(&id).map(|order| OrderWithItems {
      order: order.clone(),
      items: tables.items_of(id),
    }))
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let tables = self.tables.read();
    Ok(sorted_newest_first(
      tables.orders.values().filter(|o| o.user_id == user_id).cloned(),
      |o| o.created_at,
    ))
  }

  async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
    let tables = self.tables.read();
    Ok(sorted_newest_first(
      tables.orders.values().filter(|o| status.map_or(true, |s| o.status == s)).cloned(),
      |o| o.created_at,
    ))
  }

  async fn list_orders_for_seller(&self, seller_id: Uuid) -> Result<Vec<OrderWithItems>> {
    let tables = self.tables.read();
    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in tables.order_items.iter().filter(|i| i.seller_id == seller_id) {
      by_order.entry(item.order_id).or_default().push(item.clone());
    }
    let mut orders: Vec<OrderWithItems> = by_order
      .into_iter()
      .filter_map(|(order_id, items)| {
        tables.orders.get(&order_id).map(|order| OrderWithItems {
          order: order.clone(),
          items,
        })
      })
      .collect();
    orders.sort_by_key(|o| std::cmp::Reverse(o.order.created_at));
    Ok(orders)
  }

  async fn transition_order(&self, id: Uuid, next: OrderStatus) -> Result<Order> {
    let mut tables = self.tables.write();
    let current = tables
      .orders
      .get(&id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?
      .clone();
    if !current.status.can_transition_to(next) {
      return Err(AppError::Conflict(format!(
        "Order cannot move from {} to {}",
        current.status, next
      )));
    }
    if next == OrderStatus::Cancelled {
      for item in tables.items_of(id) {
        tables.adjust_stock(item.product_id, item.variant_id, item.quantity)?;
      }
    }
    let order = tables
      .orders
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;
    order.payment_status = order.payment_status_after(next);
    order.status = next;
    order.updated_at = Utc::now();
    Ok(order.clone())
  }

  async fn record_payment(&self, id: Uuid, gateway_payment_id: &str, success: bool) -> Result<Order> {
    let mut tables = self.tables.write();
    let order = tables
      .orders
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;
    if success {
      order.payment_status = PaymentStatus::Paid;
      order.gateway_payment_id = Some(gateway_payment_id.to_string());
      if order.status == OrderStatus::Pending {
        order.status = OrderStatus::Confirmed;
      }
    } else {
      order.payment_status = PaymentStatus::Failed;
    }
    order.updated_at = Utc::now();
    Ok(order.clone())
  }
}

fn top_products(items: &[&OrderItem]) -> Vec<TopProduct> {
  let mut totals: HashMap<Uuid, TopProduct> = HashMap::new();
  for item in items {
    let entry = totals.entry(item.product_id).or_insert_with(|| TopProduct {
      product_id: item.product_id,
      name: item.name.clone(),
      ..Default::default()
    });
    entry.units_sold += i64::from(item.quantity);
    entry.revenue_paise += item.line_total_paise;
  }
  let mut ranked: Vec<TopProduct> = totals.into_values().collect();
  ranked.sort_by(|a, b| b.units_sold.cmp(&a.units_sold).then_with(|| a.name.cmp(&b.name)));
  ranked.truncate(TOP_PRODUCTS);
  ranked
}

#[async_trait]
impl AnalyticsRepository for MemoryStore {
  async fn admin_analytics(&self) -> Result<AdminAnalytics> {
    let tables = self.tables.read();
    let mut summary = AdminAnalytics::default();
    for order in tables.orders.values() {
      summary.order_count += 1;
      *summary.orders_by_status.entry(order.status).or_insert(0) += 1;
      if order.counts_as_revenue() {
        summary.revenue_paise += order.total_paise;
      }
    }
    let revenue_orders = tables.orders.values().filter(|o| o.counts_as_revenue()).count() as i64;
    if revenue_orders > 0 {
      summary.average_order_value_paise = summary.revenue_paise / revenue_orders;
    }
    summary.customer_count = tables.users.values().filter(|u| u.role == Role::Customer).count() as i64;
    summary.seller_count = tables.users.values().filter(|u| u.role == Role::Seller).count() as i64;

    let sold: Vec<&OrderItem> = tables
      .order_items
      .iter()
      .filter(|i| tables.orders.get(&i.order_id).is_some_and(|o| o.counts_as_revenue()))
      .collect();
    summary.top_products = top_products(&sold);
    Ok(summary)
  }

  async fn seller_analytics(&self, seller_id: Uuid) -> Result<SellerAnalytics> {
    let tables = self.tables.read();
    let sold: Vec<&OrderItem> = tables
      .order_items
      .iter()
      .filter(|i| i.seller_id == seller_id)
      .filter(|i| tables.orders.get(&i.order_id).is_some_and(|o| o.counts_as_revenue()))
      .collect();
    let mut order_ids: Vec<Uuid> = sold.iter().map(|i| i.order_id).collect();
    order_ids.sort();
    order_ids.dedup();
    Ok(SellerAnalytics {
      revenue_paise: sold.iter().map(|i| i.line_total_paise).sum(),
      units_sold: sold.iter().map(|i| i64::from(i.quantity)).sum(),
      order_count: order_ids.len() as i64,
      top_products: top_products(&sold),
    })
  }
}
