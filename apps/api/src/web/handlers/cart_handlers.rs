// snapcart/apps/api/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::cart_pipeline::MAX_LINE_QUANTITY;
use crate::pipelines::contexts::{AddToCartCtxData, CheckoutCtxData, CheckoutMode};
use crate::pricing::{self, PricingConfig, Quote};
use crate::state::AppState;
use crate::web::extractors::CustomerUser;
use flow::{ContextData, PipelineResult};

#[derive(Deserialize, Debug)]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub variant_id: Option<Uuid>,
  #[serde(default = "default_quantity")]
  pub quantity: i32,
}

fn default_quantity() -> i32 {
  1
}

#[derive(Deserialize, Debug)]
pub struct UpdateQuantityPayload {
  pub quantity: i32,
}

/// Priced cart lines and a quote without any coupon.
#[instrument(name = "handler::view_cart", skip_all, fields(user_id = %customer.id()))]
pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    CheckoutMode::CartView,
    customer.id(),
  ));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let quote = ctx_data.snapshot(|c| c.quote.clone());
      Ok(HttpResponse::Ok().json(json!({ "cart": quote })))
    }
    // An empty cart stops the run before pricing.
    PipelineResult::Stopped => {
      let empty = Quote::empty(&PricingConfig::from(app_state.config.as_ref()));
      Ok(HttpResponse::Ok().json(json!({ "cart": empty })))
    }
  }
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, req_payload, customer),
  fields(user_id = %customer.id(), product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequestPayload>,
  customer: CustomerUser,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(AddToCartCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: customer.id(),
    product_id: payload.product_id,
    variant_id: payload.variant_id,
    quantity: payload.quantity,
    product: None,
    merged_quantity: 0,
    cart_item: None,
  });

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let item = ctx_data.snapshot(|c| c.cart_item.clone()).ok_or_else(|| {
        warn!("Add-to-cart completed without a cart item.");
        AppError::Internal("Cart update completed, but item details are unavailable.".to_string())
      })?;
      info!(item_id = %item.id, quantity = item.quantity, "Item added to cart.");
      Ok(HttpResponse::Ok().json(json!({
        "message": "Item added to cart successfully.",
        "cartItem": item,
      })))
    }
    Ok(PipelineResult::Stopped) => {
      warn!("Add-to-cart pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
    Err(app_err) => {
      warn!(error = %app_err, "Add-to-cart failed.");
      Err(app_err)
    }
  }
}

/// Sets the line's quantity outright. Zero removes the line.
#[instrument(name = "handler::update_cart_item", skip(app_state, customer), fields(user_id = %customer.id()))]
pub async fn update_cart_item_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateQuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  let quantity = req_payload.quantity;
  let carts = &app_state.repos.carts;

  let item = carts
    .find_cart_item(customer.id(), item_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Cart item with ID {} not found.", item_id)))?;

  if quantity < 0 || quantity > MAX_LINE_QUANTITY {
    return Err(AppError::Validation(format!(
      "Quantity must be between 0 and {}.",
      MAX_LINE_QUANTITY
    )));
  }
  if quantity == 0 {
    carts.remove_cart_item(customer.id(), item_id).await?;
    return Ok(HttpResponse::Ok().json(json!({ "removed": true })));
  }

  let product = app_state
    .repos
    .catalog
    .find_product(item.product_id)
    .await?
    .filter(|p| p.product.is_active)
    .ok_or_else(|| AppError::NotFound(format!("Product with ID {} not found.", item.product_id)))?;
  pricing::resolve_line(Some(item.id), &product, item.variant_id, quantity)?;

  let updated = carts
    .upsert_cart_line(customer.id(), item.product_id, item.variant_id, quantity)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "cartItem": updated })))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, customer), fields(user_id = %customer.id()))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let item_id = path.into_inner();
  if !app_state.repos.carts.remove_cart_item(customer.id(), item_id).await? {
    return Err(AppError::NotFound(format!("Cart item with ID {} not found.", item_id)));
  }
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::clear_cart", skip_all, fields(user_id = %customer.id()))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
) -> Result<HttpResponse, AppError> {
  app_state.repos.carts.clear_cart(customer.id()).await?;
  Ok(HttpResponse::NoContent().finish())
}
