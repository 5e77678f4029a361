// snapcart/apps/api/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::PaymentMethod;
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutMode};
use crate::pricing::Quote;
use crate::state::AppState;
use crate::web::extractors::CustomerUser;
use flow::{ContextData, PipelineResult};

#[derive(Deserialize, Debug, Default)]
pub struct PreviewPayload {
  pub coupon_code: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ApplyCouponPayload {
  pub code: String,
}

#[derive(Deserialize, Debug)]
pub struct PlaceOrderPayload {
  pub address_id: Uuid,
  /// `cod` or `razorpay`.
  pub payment_method: String,
  pub coupon_code: Option<String>,
}

/// Runs the checkout pipeline without side effects and returns the quote.
async fn run_quote(app_state: &AppState, user_id: Uuid, coupon_code: Option<String>) -> Result<Quote, AppError> {
  let mut ctx = CheckoutCtxData::new(app_state.clone(), CheckoutMode::Preview, user_id);
  ctx.coupon_code = coupon_code;
  let ctx_data = ContextData::new(ctx);

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => ctx_data
      .snapshot(|c| c.quote.clone())
      .ok_or_else(|| AppError::Internal("Checkout preview completed without a quote.".to_string())),
    PipelineResult::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(name = "handler::checkout_preview", skip(app_state, customer), fields(user_id = %customer.id()))]
pub async fn preview_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
  req_payload: Option<web::Json<PreviewPayload>>,
) -> Result<HttpResponse, AppError> {
  let coupon_code = req_payload.and_then(|p| p.into_inner().coupon_code);
  let quote = run_quote(&app_state, customer.id(), coupon_code).await?;
  Ok(HttpResponse::Ok().json(json!({ "quote": quote })))
}

#[instrument(name = "handler::apply_coupon", skip(app_state, customer), fields(user_id = %customer.id()))]
pub async fn apply_coupon_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
  req_payload: web::Json<ApplyCouponPayload>,
) -> Result<HttpResponse, AppError> {
  let code = req_payload.into_inner().code;
  if code.trim().is_empty() {
    return Err(AppError::Validation("Coupon code is required.".to_string()));
  }
  let quote = run_quote(&app_state, customer.id(), Some(code)).await?;
  info!(code = ?quote.coupon_code, discount = quote.coupon_discount_paise, "Coupon applied.");
  Ok(HttpResponse::Ok().json(json!({ "quote": quote })))
}

#[instrument(name = "handler::place_order", skip(app_state, customer), fields(user_id = %customer.id()))]
pub async fn place_order_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
  req_payload: web::Json<PlaceOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let payment_method: PaymentMethod = payload.payment_method.parse().map_err(AppError::Validation)?;

  let mut ctx = CheckoutCtxData::new(app_state.get_ref().clone(), CheckoutMode::Place, customer.id());
  ctx.address_id = Some(payload.address_id);
  ctx.payment_method = payment_method;
  ctx.coupon_code = payload.coupon_code;
  let ctx_data = ContextData::new(ctx);

  match app_state.flows.run(ctx_data.clone()).await {
    Ok(PipelineResult::Completed) => {
      let (order, gateway_order, email_sent) =
        ctx_data.snapshot(|c| (c.order.clone(), c.gateway_order.clone(), c.confirmation_email_sent));
      let order = order.ok_or_else(|| AppError::Internal("Checkout completed without an order.".to_string()))?;
      let payment = gateway_order.map(|g| {
        json!({
          "provider": "razorpay",
          "keyId": app_state.payments.key_id(),
          "gatewayOrderId": g.id,
          "amountPaise": g.amount_paise,
          "currency": g.currency,
        })
      });
      info!(order_id = %order.order.id, status = %order.order.status, email_sent, "Checkout complete.");
      Ok(HttpResponse::Created().json(json!({
        "order": order,
        "payment": payment,
        "confirmationEmailSent": email_sent,
      })))
    }
    Ok(PipelineResult::Stopped) => Err(AppError::PipelineHaltedByHandler),
    Err(app_err) => {
      warn!(error = %app_err, "Checkout failed.");
      Err(app_err)
    }
  }
}
