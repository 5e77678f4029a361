// snapcart/apps/api/src/web/handlers/catalog_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::category::slugify;
use crate::models::product::{NewProduct, NewVariant, ProductFilter, ProductUpdate};
use crate::models::Role;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, CatalogManager};

/// Newest products shown on the home feed.
const FEED_PRODUCTS: i64 = 12;

// --- Categories ---

#[derive(Deserialize, Debug)]
pub struct CategoryPayload {
  pub name: String,
  pub description: Option<String>,
}

impl CategoryPayload {
  fn name_and_slug(&self) -> Result<(String, String), AppError> {
    let name = self.name.trim().to_string();
    if name.is_empty() {
      return Err(AppError::Validation("Category name is required.".to_string()));
    }
    let slug = slugify(&name);
    if slug.is_empty() {
      return Err(AppError::Validation("Category name must contain letters or digits.".to_string()));
    }
    Ok((name, slug))
  }
}

#[instrument(name = "handler::list_categories", skip_all)]
pub async fn list_categories_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let categories = app_state.repos.catalog.list_categories().await?;
  Ok(HttpResponse::Ok().json(json!({ "categories": categories })))
}

#[instrument(name = "handler::create_category", skip(app_state, _admin))]
pub async fn create_category_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  let (name, slug) = req_payload.name_and_slug()?;
  let category = app_state
    .repos
    .catalog
    .create_category(&name, &slug, req_payload.into_inner().description)
    .await?;
  info!(category_id = %category.id, %slug, "Category created.");
  Ok(HttpResponse::Created().json(json!({ "category": category })))
}

#[instrument(name = "handler::update_category", skip(app_state, _admin))]
pub async fn update_category_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<CategoryPayload>,
) -> Result<HttpResponse, AppError> {
  let (name, slug) = req_payload.name_and_slug()?;
  let category = app_state
    .repos
    .catalog
    .update_category(path.into_inner(), &name, &slug, req_payload.into_inner().description)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "category": category })))
}

#[instrument(name = "handler::delete_category", skip(app_state, _admin))]
pub async fn delete_category_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let category_id = path.into_inner();
  if !app_state.repos.catalog.delete_category(category_id).await? {
    return Err(AppError::NotFound(format!("Category with ID {} not found.", category_id)));
  }
  Ok(HttpResponse::NoContent().finish())
}

// --- Products ---

#[derive(Deserialize, Debug)]
pub struct CreateProductPayload {
  pub category_id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub price_paise: i64,
  pub stock: i32,
  pub image_url: Option<String>,
  #[serde(default)]
  pub variants: Vec<NewVariant>,
  /// Admins may list a product on behalf of a seller.
  pub seller_id: Option<Uuid>,
}

fn validate_price_and_stock(price_paise: i64, stock: i32) -> Result<(), AppError> {
  if price_paise < 0 {
    return Err(AppError::Validation("Price cannot be negative.".to_string()));
  }
  if stock < 0 {
    return Err(AppError::Validation("Stock cannot be negative.".to_string()));
  }
  Ok(())
}

fn validate_variants(variants: &[NewVariant]) -> Result<(), AppError> {
  let mut skus = HashSet::new();
  for variant in variants {
    if variant.sku.trim().is_empty() || variant.label.trim().is_empty() {
      return Err(AppError::Validation("Variants need a SKU and a label.".to_string()));
    }
    validate_price_and_stock(variant.price_paise, variant.stock)?;
    if !skus.insert(variant.sku.trim()) {
      return Err(AppError::Validation(format!("Duplicate SKU '{}'.", variant.sku.trim())));
    }
  }
  Ok(())
}

async fn ensure_category_exists(app_state: &AppState, category_id: Uuid) -> Result<(), AppError> {
  if app_state.repos.catalog.find_category(category_id).await?.is_none() {
    return Err(AppError::Validation(format!("Category {} does not exist.", category_id)));
  }
  Ok(())
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ProductFilter>,
) -> Result<HttpResponse, AppError> {
  let filter = query.into_inner();
  let products = app_state.repos.catalog.list_products(&filter).await?;
  Ok(HttpResponse::Ok().json(json!({
    "products": products,
    "limit": filter.limit(),
    "offset": filter.offset(),
  })))
}

#[instrument(name = "handler::get_product", skip(app_state))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let product = app_state
    .repos
    .catalog
    .find_product(product_id)
    .await?
    .filter(|p| p.product.is_active)
    .ok_or_else(|| {
      warn!(%product_id, "Product not found.");
      AppError::NotFound(format!("Product with ID {} not found.", product_id))
    })?;
  Ok(HttpResponse::Ok().json(json!({ "product": product })))
}

#[instrument(name = "handler::create_product", skip(app_state, manager, req_payload), fields(user_id = %manager.id()))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  manager: CatalogManager,
  req_payload: web::Json<CreateProductPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let name = payload.name.trim().to_string();
  if name.is_empty() {
    return Err(AppError::Validation("Product name is required.".to_string()));
  }
  validate_price_and_stock(payload.price_paise, payload.stock)?;
  validate_variants(&payload.variants)?;
  ensure_category_exists(&app_state, payload.category_id).await?;

  let seller_id = match (manager.role(), payload.seller_id) {
    (Role::Admin, Some(seller_id)) => {
      let seller = app_state.repos.users.find_user(seller_id).await?;
      if !seller.is_some_and(|s| s.role == Role::Seller) {
        return Err(AppError::Validation(format!("User {} is not a seller.", seller_id)));
      }
      seller_id
    }
    _ => manager.id(),
  };

  let product = app_state
    .repos
    .catalog
    .create_product(NewProduct {
      seller_id,
      category_id: payload.category_id,
      name,
      description: payload.description,
      price_paise: payload.price_paise,
      stock: payload.stock,
      image_url: payload.image_url,
      variants: payload.variants,
    })
    .await?;
  info!(product_id = %product.product.id, variants = product.variants.len(), "Product created.");
  Ok(HttpResponse::Created().json(json!({ "product": product })))
}

/// Loads the product and checks the caller may edit it.
async fn owned_product(app_state: &AppState, manager: &CatalogManager, product_id: Uuid) -> Result<(), AppError> {
  let product = app_state
    .repos
    .catalog
    .find_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", product_id)))?;
  if manager.role() != Role::Admin && product.product.seller_id != manager.id() {
    warn!(%product_id, user_id = %manager.id(), "Edit of another seller's product refused.");
    return Err(AppError::Forbidden("You can only manage your own products.".to_string()));
  }
  Ok(())
}

#[instrument(name = "handler::update_product", skip(app_state, manager, req_payload), fields(user_id = %manager.id()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  manager: CatalogManager,
  path: web::Path<Uuid>,
  req_payload: web::Json<ProductUpdate>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  owned_product(&app_state, &manager, product_id).await?;

  let mut update = req_payload.into_inner();
  if let Some(name) = update.name.take() {
    let name = name.trim().to_string();
    if name.is_empty() {
      return Err(AppError::Validation("Product name cannot be empty.".to_string()));
    }
    update.name = Some(name);
  }
  validate_price_and_stock(update.price_paise.unwrap_or(0), update.stock.unwrap_or(0))?;
  if let Some(category_id) = update.category_id {
    ensure_category_exists(&app_state, category_id).await?;
  }

  let product = app_state.repos.catalog.update_product(product_id, update).await?;
  Ok(HttpResponse::Ok().json(json!({ "product": product })))
}

/// Soft delete: the product is deactivated so past orders keep their references.
#[instrument(name = "handler::delete_product", skip(app_state, manager), fields(user_id = %manager.id()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  manager: CatalogManager,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  owned_product(&app_state, &manager, product_id).await?;
  let update = ProductUpdate {
    is_active: Some(false),
    ..Default::default()
  };
  app_state.repos.catalog.update_product(product_id, update).await?;
  info!(%product_id, "Product deactivated.");
  Ok(HttpResponse::NoContent().finish())
}

// --- Feed ---

#[instrument(name = "handler::feed", skip_all)]
pub async fn feed_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let banners = app_state.repos.promotions.list_banners(true).await?;
  let offers = app_state.repos.promotions.list_offers(Some(Utc::now())).await?;
  let newest = ProductFilter {
    limit: Some(FEED_PRODUCTS),
    ..Default::default()
  };
  let products = app_state.repos.catalog.list_products(&newest).await?;
  let categories = app_state.repos.catalog.list_categories().await?;

  Ok(HttpResponse::Ok().json(json!({
    "banners": banners,
    "offers": offers,
    "products": products,
    "categories": categories,
  })))
}
