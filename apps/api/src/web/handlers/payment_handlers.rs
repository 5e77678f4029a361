// snapcart/apps/api/src/web/handlers/payment_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::pipelines::contexts::VerifyPaymentCtxData;
use crate::state::AppState;
use crate::web::extractors::CustomerUser;
use flow::{ContextData, PipelineResult};

/// What the client-side checkout widget hands back after payment.
#[derive(Deserialize, Debug)]
pub struct VerifyPaymentPayload {
  pub order_id: Uuid,
  pub gateway_order_id: String,
  pub gateway_payment_id: String,
  pub signature: String,
}

#[instrument(
  name = "handler::verify_payment",
  skip(app_state, customer, req_payload),
  fields(user_id = %customer.id(), order_id = %req_payload.order_id)
)]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
  req_payload: web::Json<VerifyPaymentPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(VerifyPaymentCtxData {
    app_state: app_state.get_ref().clone(),
    user_id: customer.id(),
    order_id: payload.order_id,
    gateway_order_id: payload.gateway_order_id,
    gateway_payment_id: payload.gateway_payment_id,
    signature: payload.signature,
    order: None,
    signature_valid: false,
    already_paid: false,
  });

  // `Stopped` means the order was already paid, which is a success for the caller.
  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed | PipelineResult::Stopped => {
      let (order, already_paid) = ctx_data.snapshot(|c| (c.order.clone(), c.already_paid));
      let order = order.ok_or_else(|| AppError::Internal("Payment verification finished without an order.".to_string()))?;
      info!(already_paid, status = %order.status, "Payment verified.");
      Ok(HttpResponse::Ok().json(json!({
        "verified": true,
        "alreadyPaid": already_paid,
        "order": order,
      })))
    }
  }
}
