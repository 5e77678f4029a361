// snapcart/apps/api/src/web/handlers/promotion_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::banner::NewBanner;
use crate::models::coupon::{normalize_code, NewCoupon};
use crate::models::offer::NewOffer;
use crate::models::DiscountType;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
pub struct SetActivePayload {
  pub is_active: bool,
}

fn validate_discount(discount_type: DiscountType, value: i64, max_discount_paise: Option<i64>) -> Result<(), AppError> {
  match discount_type {
    DiscountType::Percentage if !(1..=100).contains(&value) => {
      Err(AppError::Validation("Percentage discounts must be between 1 and 100.".to_string()))
    }
    DiscountType::Flat if value <= 0 => Err(AppError::Validation("Flat discounts must be positive.".to_string())),
    _ if max_discount_paise.is_some_and(|cap| cap <= 0) => {
      Err(AppError::Validation("Maximum discount must be positive.".to_string()))
    }
    _ => Ok(()),
  }
}

// --- Coupons ---

#[instrument(name = "handler::create_coupon", skip(app_state, _admin))]
pub async fn create_coupon_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<NewCoupon>,
) -> Result<HttpResponse, AppError> {
  let mut coupon = req_payload.into_inner();
  coupon.code = normalize_code(&coupon.code);
  if coupon.code.is_empty() || !coupon.code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
    return Err(AppError::Validation("Coupon codes use letters, digits, '-' and '_'.".to_string()));
  }
  validate_discount(coupon.discount_type, coupon.value, coupon.max_discount_paise)?;
  if coupon.min_order_paise < 0 {
    return Err(AppError::Validation("Minimum order cannot be negative.".to_string()));
  }
  if coupon.usage_limit.is_some_and(|l| l <= 0) || coupon.per_user_limit.is_some_and(|l| l <= 0) {
    return Err(AppError::Validation("Usage limits must be positive.".to_string()));
  }
  if let (Some(starts), Some(ends)) = (coupon.starts_at, coupon.ends_at) {
    if ends <= starts {
      return Err(AppError::Validation("Coupon must end after it starts.".to_string()));
    }
  }

  let created = app_state.repos.promotions.create_coupon(coupon).await?;
  info!(coupon_id = %created.id, code = %created.code, "Coupon created.");
  Ok(HttpResponse::Created().json(json!({ "coupon": created })))
}

#[instrument(name = "handler::list_coupons", skip_all)]
pub async fn list_coupons_handler(app_state: web::Data<AppState>, _admin: AdminUser) -> Result<HttpResponse, AppError> {
  let coupons = app_state.repos.promotions.list_coupons().await?;
  Ok(HttpResponse::Ok().json(json!({ "coupons": coupons })))
}

#[instrument(name = "handler::set_coupon_active", skip(app_state, _admin))]
pub async fn set_coupon_active_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<SetActivePayload>,
) -> Result<HttpResponse, AppError> {
  let coupon = app_state
    .repos
    .promotions
    .set_coupon_active(path.into_inner(), req_payload.is_active)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "coupon": coupon })))
}

// --- Offers ---

#[instrument(name = "handler::create_offer", skip(app_state, _admin))]
pub async fn create_offer_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<NewOffer>,
) -> Result<HttpResponse, AppError> {
  let offer = req_payload.into_inner();
  if offer.title.trim().is_empty() {
    return Err(AppError::Validation("Offer title is required.".to_string()));
  }
  validate_discount(offer.discount_type, offer.value, offer.max_discount_paise)?;
  if offer.ends_at <= offer.starts_at {
    return Err(AppError::Validation("Offer must end after it starts.".to_string()));
  }
  if let Some(product_id) = offer.product_id {
    if app_state.repos.catalog.find_product(product_id).await?.is_none() {
      return Err(AppError::Validation(format!("Product {} does not exist.", product_id)));
    }
  }
  if let Some(category_id) = offer.category_id {
    if app_state.repos.catalog.find_category(category_id).await?.is_none() {
      return Err(AppError::Validation(format!("Category {} does not exist.", category_id)));
    }
  }

  let created = app_state.repos.promotions.create_offer(offer).await?;
  info!(offer_id = %created.id, "Offer created.");
  Ok(HttpResponse::Created().json(json!({ "offer": created })))
}

#[instrument(name = "handler::admin_list_offers", skip_all)]
pub async fn admin_list_offers_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let offers = app_state.repos.promotions.list_offers(None).await?;
  Ok(HttpResponse::Ok().json(json!({ "offers": offers })))
}

#[instrument(name = "handler::deactivate_offer", skip(app_state, _admin))]
pub async fn deactivate_offer_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let offer = app_state.repos.promotions.set_offer_active(path.into_inner(), false).await?;
  Ok(HttpResponse::Ok().json(json!({ "offer": offer })))
}

/// Offers live right now.
#[instrument(name = "handler::list_offers", skip_all)]
pub async fn list_offers_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let offers = app_state.repos.promotions.list_offers(Some(Utc::now())).await?;
  Ok(HttpResponse::Ok().json(json!({ "offers": offers })))
}

// --- Banners ---

#[instrument(name = "handler::create_banner", skip(app_state, _admin))]
pub async fn create_banner_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  req_payload: web::Json<NewBanner>,
) -> Result<HttpResponse, AppError> {
  let banner = req_payload.into_inner();
  if banner.title.trim().is_empty() || banner.image_url.trim().is_empty() {
    return Err(AppError::Validation("Banners need a title and an image URL.".to_string()));
  }
  let created = app_state.repos.promotions.create_banner(banner).await?;
  Ok(HttpResponse::Created().json(json!({ "banner": created })))
}

#[instrument(name = "handler::admin_list_banners", skip_all)]
pub async fn admin_list_banners_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let banners = app_state.repos.promotions.list_banners(false).await?;
  Ok(HttpResponse::Ok().json(json!({ "banners": banners })))
}

#[instrument(name = "handler::delete_banner", skip(app_state, _admin))]
pub async fn delete_banner_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let banner_id = path.into_inner();
  if !app_state.repos.promotions.delete_banner(banner_id).await? {
    return Err(AppError::NotFound(format!("Banner with ID {} not found.", banner_id)));
  }
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::list_banners", skip_all)]
pub async fn list_banners_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let banners = app_state.repos.promotions.list_banners(true).await?;
  Ok(HttpResponse::Ok().json(json!({ "banners": banners })))
}
