// snapcart/apps/api/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use crate::state::AppState;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, warn, Level};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

/// Registers the email/password sign-in pipeline.
pub fn register_signin_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("load_user", false, None),
    ("verify_password", false, None),
    ("issue_tokens", false, None),
  ]);

  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, password_empty) = ctx_data.snapshot(|c| (c.email.clone(), c.password.is_empty()));
      if password_empty {
        return Err(AppError::Validation("Password is required.".to_string()));
      }
      let email = auth_service::normalize_email(&email)?;
      ctx_data.write().email = email;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signin_p.on_root("load_user", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (email, users) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.repos.users.clone())
      };

      match users.find_user_by_email(&email).await? {
        Some(user) => {
          event!(Level::DEBUG, user_id = %user.id, "User found for sign-in.");
          ctx_data.write().user = Some(user);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        None => {
          warn!(%email, "Sign-in for unknown email.");
          Err(AppError::Auth(INVALID_CREDENTIALS.to_string()))
        }
      }
    })
  });

  signin_p.on_root("verify_password", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (stored_hash, password, user_id) = {
        let guard = ctx_data.read();
        let user = guard
          .user
          .as_ref()
          .ok_or_else(|| AppError::Internal("User missing before password check.".to_string()))?;
        (user.password_hash.clone(), guard.password.clone(), user.id)
      };

      // Phone-only accounts have no password and can only use OTP.
      let Some(stored_hash) = stored_hash else {
        warn!(%user_id, "Password sign-in for an account without a password.");
        return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
      };
      if !auth_service::verify_password(&stored_hash, &password)? {
        warn!(%user_id, "Password mismatch.");
        return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signin_p.on_root("issue_tokens", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let tokens = {
        let guard = ctx_data.read();
        let user = guard
          .user
          .as_ref()
          .ok_or_else(|| AppError::Internal("User missing before token issue.".to_string()))?;
        common_steps::issue_tokens_for(&guard.app_state, user)?
      };
      ctx_data.write().tokens = Some(tokens);
      info!("Sign-in succeeded.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(signin_p);
  info!("Sign-in pipeline registered.");
}
