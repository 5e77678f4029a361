// snapcart/apps/api/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::user::NewUser;
use crate::models::Role;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{SignupCtxData, WelcomeEmailCtxData};
use crate::services::auth_service;
use crate::state::AppState;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, warn, Level};

/// Registers the email/password sign-up pipeline for customers and sellers.
pub fn register_signup_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_user", false, None),
    ("create_user", false, None),
    ("issue_tokens", false, None),
    ("send_welcome_email", true, None),
  ]);

  // Normalises the input in place so later steps see the canonical email.
  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (role, name, email, password, store_name) = {
        let guard = ctx_data.read();
        (
          guard.role,
          guard.name.trim().to_string(),
          guard.email.clone(),
          guard.password.clone(),
          guard.store_name.as_deref().map(str::trim).map(str::to_string),
        )
      };

      if role == Role::Admin {
        warn!("Rejected self sign-up as admin.");
        return Err(AppError::Forbidden("Admin accounts cannot be created by sign-up.".to_string()));
      }
      if name.is_empty() {
        return Err(AppError::Validation("Name is required.".to_string()));
      }
      let email = auth_service::normalize_email(&email)?;
      auth_service::validate_password(&password)?;

      let store_name = store_name.filter(|s| !s.is_empty());
      if role == Role::Seller && store_name.is_none() {
        return Err(AppError::Validation("Store name is required for sellers.".to_string()));
      }

      event!(Level::DEBUG, %email, %role, "Signup input validated.");
      {
        let mut guard = ctx_data.write();
        guard.name = name;
        guard.email = email;
        guard.store_name = if role == Role::Seller { store_name } else { None };
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signup_p.on_root("check_existing_user", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (email, users) = {
        let guard = ctx_data.read();
        (guard.email.clone(), guard.app_state.repos.users.clone())
      };

      if users.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "Sign-up with an email that is already registered.");
        return Err(AppError::Conflict("An account with this email already exists.".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signup_p.on_root("create_user", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (new_user, password, users) = {
        let guard = ctx_data.read();
        (
          NewUser {
            role: guard.role,
            name: guard.name.clone(),
            email: Some(guard.email.clone()),
            phone: None,
            password_hash: None,
            store_name: guard.store_name.clone(),
          },
          guard.password.clone(),
          guard.app_state.repos.users.clone(),
        )
      };

      let password_hash = auth_service::hash_password(&password)?;
      let user = users
        .create_user(NewUser {
          password_hash: Some(password_hash),
          ..new_user
        })
        .await?;

      info!(user_id = %user.id, role = %user.role, "User created.");
      ctx_data.write().user = Some(user);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signup_p.on_root("issue_tokens", |ctx_data: ContextData<SignupCtxData>| {
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
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  signup_p.on_root("send_welcome_email", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let email_ctx = {
        let guard = ctx_data.read();
        WelcomeEmailCtxData {
          app_state: guard.app_state.clone(),
          recipient_email: guard.email.clone(),
          recipient_name: guard.name.clone(),
        }
      };

      common_steps::send_welcome_email_step(ContextData::new(email_ctx)).await?;
      ctx_data.write().welcome_email_sent = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(signup_p);
  info!("Sign-up pipeline registered.");
}
