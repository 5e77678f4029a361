// snapcart/apps/api/src/pipelines/mod.rs

//! Pipelines behind the multi-step API operations. Each pipeline runs on its
//! own context type, so handlers dispatch through `Flows::run` by type.

use crate::errors::AppError;
use crate::state::AppState;
use flow::Flows;
use std::sync::Arc;

pub mod common_steps;
pub mod contexts;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod order_pipeline;
pub mod otp_pipeline;
pub mod payment_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers every pipeline with `flows`. Called once while building `AppState`.
pub fn register_all_pipelines(flows: &Arc<Flows<AppError>>, app_state: &AppState) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(flows, app_state);
  signin_pipeline::register_signin_pipeline(flows, app_state);
  otp_pipeline::register_otp_request_pipeline(flows, app_state);
  otp_pipeline::register_otp_verify_pipeline(flows, app_state);
  cart_pipeline::register_add_to_cart_pipeline(flows, app_state);
  checkout_pipeline::register_checkout_pipeline(flows, app_state);
  payment_pipeline::register_verify_payment_pipeline(flows, app_state);
  order_pipeline::register_order_transition_pipeline(flows, app_state);

  tracing::info!(count = flows.len(), "All pipelines registered.");
}
