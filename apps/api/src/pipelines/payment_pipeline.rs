// snapcart/apps/api/src/pipelines/payment_pipeline.rs

use crate::errors::AppError;
use crate::models::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::pipelines::contexts::VerifyPaymentCtxData;
use crate::state::AppState;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{info, warn};

/// Registers the online payment verification pipeline. A run that finds the
/// order already paid stops early, which callers treat as success.
pub fn register_verify_payment_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<VerifyPaymentCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("stop_if_already_paid", false, None),
    ("verify_signature", false, None),
    ("record_payment", false, None),
    ("reject_bad_signature", false, None),
  ]);

  p.on_root("load_order", |ctx_data: ContextData<VerifyPaymentCtxData>| {
    Box::pin(async move {
      let (user_id, order_id, gateway_order_id, orders) = {
        let guard = ctx_data.read();
        (
          guard.user_id,
          guard.order_id,
          guard.gateway_order_id.clone(),
          guard.app_state.repos.orders.clone(),
        )
      };

      let order = orders
        .find_order(order_id)
        .await?
        .map(|o| o.order)
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("Order with ID {} not found.", order_id)))?;

      if order.payment_method != PaymentMethod::Razorpay {
        return Err(AppError::Validation("Order is not an online payment order.".to_string()));
      }
      if order.gateway_order_id.as_deref() != Some(gateway_order_id.as_str()) {
        warn!(%order_id, "Gateway order id does not match the order.");
        return Err(AppError::Validation("Gateway order id does not match this order.".to_string()));
      }
      if order.status == OrderStatus::Cancelled {
        return Err(AppError::Conflict("Order has been cancelled.".to_string()));
      }

      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("stop_if_already_paid", |ctx_data: ContextData<VerifyPaymentCtxData>| {
    Box::pin(async move {
      let paid = ctx_data.snapshot(|c| c.order.as_ref().is_some_and(|o| o.payment_status == PaymentStatus::Paid));
      if paid {
        info!("Payment already recorded, nothing to do.");
        ctx_data.write().already_paid = true;
        return Ok::<_, AppError>(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  });

  p.on_root("verify_signature", |ctx_data: ContextData<VerifyPaymentCtxData>| {
    Box::pin(async move {
      let valid = {
        let guard = ctx_data.read();
        guard
          .app_state
          .payments
          .verify_signature(&guard.gateway_order_id, &guard.gateway_payment_id, &guard.signature)
      };
      if !valid {
        warn!(order_id = %ctx_data.read().order_id, "Payment signature mismatch.");
      }
      ctx_data.write().signature_valid = valid;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Failures are recorded too, so the order shows `failed` until a retry succeeds.
  p.on_root("record_payment", |ctx_data: ContextData<VerifyPaymentCtxData>| {
    Box::pin(async move {
      let (order_id, payment_id, valid, orders) = {
        let guard = ctx_data.read();
        (
          guard.order_id,
          guard.gateway_payment_id.clone(),
          guard.signature_valid,
          guard.app_state.repos.orders.clone(),
        )
      };

      let order = orders.record_payment(order_id, &payment_id, valid).await?;
      info!(%order_id, payment_status = ?order.payment_status, status = %order.status, "Payment outcome recorded.");
      ctx_data.write().order = Some(order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("reject_bad_signature", |ctx_data: ContextData<VerifyPaymentCtxData>| {
    Box::pin(async move {
      if !ctx_data.read().signature_valid {
        return Err(AppError::Payment("Payment verification failed.".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  info!("Payment verification pipeline registered.");
}
