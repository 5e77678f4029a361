// snapcart/apps/api/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub seller_id: Uuid,
  pub category_id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub price_paise: i64,
  pub stock: i32,
  pub image_url: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductVariant {
  pub id: Uuid,
  pub product_id: Uuid,
  pub sku: String,
  pub label: String,
  pub price_paise: i64,
  pub stock: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductWithVariants {
  #[serde(flatten)]
  pub product: Product,
  pub variants: Vec<ProductVariant>,
}

impl ProductWithVariants {
  pub fn variant(&self, variant_id: Uuid) -> Option<&ProductVariant> {
    self.variants.iter().find(|v| v.id == variant_id)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewVariant {
  pub sku: String,
  pub label: String,
  pub price_paise: i64,
  pub stock: i32,
}

/// Everything needed to insert a product with its variants.
#[derive(Debug, Clone)]
pub struct NewProduct {
  pub seller_id: Uuid,
  pub category_id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub price_paise: i64,
  pub stock: i32,
  pub image_url: Option<String>,
  pub variants: Vec<NewVariant>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
  pub name: Option<String>,
  pub description: Option<String>,
  pub category_id: Option<Uuid>,
  pub price_paise: Option<i64>,
  pub stock: Option<i32>,
  pub image_url: Option<String>,
  pub is_active: Option<bool>,
}

/// Listing filters. Only active products are listed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
  pub category_id: Option<Uuid>,
  pub seller_id: Option<Uuid>,
  pub q: Option<String>,
  pub min_price_paise: Option<i64>,
  pub max_price_paise: Option<i64>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

impl ProductFilter {
  pub const DEFAULT_LIMIT: i64 = 20;
  pub const MAX_LIMIT: i64 = 100;

  pub fn limit(&self) -> i64 {
    self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
  }

  pub fn offset(&self) -> i64 {
    self.offset.unwrap_or(0).max(0)
  }

  pub fn matches(&self, product: &Product) -> bool {
    if !product.is_active {
      return false;
    }
    if self.category_id.is_some_and(|c| c != product.category_id) {
      return false;
    }
    if self.seller_id.is_some_and(|s| s != product.seller_id) {
      return false;
    }
    if self.min_price_paise.is_some_and(|min| product.price_paise < min) {
      return false;
    }
    if self.max_price_paise.is_some_and(|max| product.price_paise > max) {
      return false;
    }
    match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
      Some(term) => {
        let term = term.to_lowercase();
        product.name.to_lowercase().contains(&term)
          || product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&term))
      }
      None => true,
    }
  }
}
