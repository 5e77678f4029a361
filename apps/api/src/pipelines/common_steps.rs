// snapcart/apps/api/src/pipelines/common_steps.rs

//! Steps shared by several pipelines. The email steps return `FlowResult` so a
//! provider failure surfaces as `FlowError::Handler`, which callers on
//! optional steps log and swallow.

use crate::errors::AppError;
use crate::models::User;
use crate::pipelines::contexts::{OrderEmailCtxData, WelcomeEmailCtxData};
use crate::pricing::display_amount;
use crate::services::token_service::TokenPair;
use crate::state::AppState;
use flow::{ContextData, FlowError, FlowResult, PipelineControl};
use tracing::{info, instrument, warn};

/// Rejects deactivated accounts and issues a fresh token pair.
pub fn issue_tokens_for(app_state: &AppState, user: &User) -> Result<TokenPair, AppError> {
  if !user.is_active {
    warn!(user_id = %user.id, "Token issue refused for deactivated account.");
    return Err(AppError::Forbidden("This account has been deactivated.".to_string()));
  }
  app_state.tokens.issue_pair(user)
}

#[instrument(name = "common_step::send_welcome_email", skip(ctx_data), err)]
pub async fn send_welcome_email_step(ctx_data: ContextData<WelcomeEmailCtxData>) -> FlowResult<PipelineControl> {
  let (to, name, notifier) = {
    let guard = ctx_data.read();
    (guard.recipient_email.clone(), guard.recipient_name.clone(), guard.app_state.notifier.clone())
  };

  let sent = notifier
    .send_email(
      &to,
      &format!("Welcome to Snapcart, {}!", name),
      &format!("<p>Hi {},</p><p>Your Snapcart account is ready.</p>", name),
    )
    .await
    .map_err(|source| FlowError::Handler { source })?;
  info!(%to, message_id = %sent.message_id, "Welcome email sent.");
  Ok(PipelineControl::Continue)
}

#[instrument(name = "common_step::send_order_email", skip(ctx_data), err)]
pub async fn send_order_email_step(ctx_data: ContextData<OrderEmailCtxData>) -> FlowResult<PipelineControl> {
  let (to, name, order_id, subject, headline, notifier) = {
    let guard = ctx_data.read();
    (
      guard.recipient_email.clone(),
      guard.recipient_name.clone(),
      guard.order_id,
      guard.subject.clone(),
      guard.headline.clone(),
      guard.app_state.notifier.clone(),
    )
  };

  let sent = notifier
    .send_email(
      &to,
      &subject,
      &format!("<p>Hi {},</p><p>{}</p><p>Order reference: {}</p>", name, headline, order_id),
    )
    .await
    .map_err(|source| FlowError::Handler { source })?;
  info!(%to, %order_id, message_id = %sent.message_id, "Order email sent.");
  Ok(PipelineControl::Continue)
}

pub fn order_confirmation_headline(total_paise: i64) -> String {
  format!("Thanks for your order of {}. We'll let you know when it ships.", display_amount(total_paise))
}
