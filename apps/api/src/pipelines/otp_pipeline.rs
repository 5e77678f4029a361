// snapcart/apps/api/src/pipelines/otp_pipeline.rs

//! Phone login: `OtpRequestCtxData` sends a code, `OtpVerifyCtxData` checks it
//! and signs the caller in, creating a customer on first login.

use crate::errors::AppError;
use crate::models::user::NewUser;
use crate::models::Role;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{OtpRequestCtxData, OtpVerifyCtxData};
use crate::services::otp_service::{self, OTP_MAX_ATTEMPTS};
use crate::state::AppState;
use chrono::Utc;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, warn, Level};

const INVALID_OTP: &str = "Invalid OTP.";

pub fn register_otp_request_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<OtpRequestCtxData, AppError>::new(&[
    ("validate_phone", false, None),
    ("store_otp_session", false, None),
    ("send_otp_sms", false, None),
  ]);

  p.on_root("validate_phone", |ctx_data: ContextData<OtpRequestCtxData>| {
    Box::pin(async move {
      let phone = ctx_data.snapshot(|c| c.phone.clone());
      let phone = otp_service::normalize_phone(&phone)?;
      ctx_data.write().phone = phone;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("store_otp_session", |ctx_data: ContextData<OtpRequestCtxData>| {
    Box::pin(async move {
      let (phone, app_state) = ctx_data.snapshot(|c| (c.phone.clone(), c.app_state.clone()));

      let code = otp_service::generate_code();
      let session = app_state.otp.new_session(&phone, &code, Utc::now());
      let expires_at = session.expires_at;
      app_state.repos.otp.replace_otp_session(session).await?;

      event!(Level::DEBUG, %phone, %expires_at, "OTP session stored.");
      {
        let mut guard = ctx_data.write();
        guard.code = Some(code);
        guard.expires_at = Some(expires_at);
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("send_otp_sms", |ctx_data: ContextData<OtpRequestCtxData>| {
    Box::pin(async move {
      let (phone, code, notifier, ttl) = {
        let guard = ctx_data.read();
        (
          guard.phone.clone(),
          guard.code.clone(),
          guard.app_state.notifier.clone(),
          guard.app_state.otp.ttl(),
        )
      };
      let code = code.ok_or_else(|| AppError::Internal("OTP missing before send.".to_string()))?;

      let body = format!(
        "{} is your Snapcart login code. It expires in {} minutes.",
        code,
        ttl.num_minutes().max(1)
      );
      notifier
        .send_sms(&phone, &body)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to send OTP: {}", e)))?;
      info!(%phone, "OTP sent.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  info!("OTP request pipeline registered.");
}

pub fn register_otp_verify_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<OtpVerifyCtxData, AppError>::new(&[
    ("validate_otp_input", false, None),
    ("load_otp_session", false, None),
    ("check_otp", false, None),
    ("find_or_create_customer", false, None),
    ("issue_tokens", false, None),
  ]);

  p.on_root("validate_otp_input", |ctx_data: ContextData<OtpVerifyCtxData>| {
    Box::pin(async move {
      let (phone, code) = ctx_data.snapshot(|c| (c.phone.clone(), c.code.trim().to_string()));
      let phone = otp_service::normalize_phone(&phone)?;
      otp_service::validate_code_format(&code)?;
      {
        let mut guard = ctx_data.write();
        guard.phone = phone;
        guard.code = code;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("load_otp_session", |ctx_data: ContextData<OtpVerifyCtxData>| {
    Box::pin(async move {
      let (phone, otp_repo) = ctx_data.snapshot(|c| (c.phone.clone(), c.app_state.repos.otp.clone()));

      let session = otp_repo.find_otp_session(&phone).await?.ok_or_else(|| {
        warn!(%phone, "OTP verify without an active session.");
        AppError::Auth("No OTP was requested for this phone number.".to_string())
      })?;

      if session.expires_at < Utc::now() {
        otp_repo.delete_otp_session(session.id).await?;
        return Err(AppError::Auth("OTP has expired. Request a new one.".to_string()));
      }
      if session.attempts >= OTP_MAX_ATTEMPTS {
        otp_repo.delete_otp_session(session.id).await?;
        return Err(AppError::Auth("Too many failed attempts. Request a new OTP.".to_string()));
      }

      ctx_data.write().session = Some(session);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // A wrong code burns an attempt; the session is dropped once the limit is hit.
  p.on_root("check_otp", |ctx_data: ContextData<OtpVerifyCtxData>| {
    Box::pin(async move {
      let (session, code, app_state) = {
        let guard = ctx_data.read();
        (guard.session.clone(), guard.code.clone(), guard.app_state.clone())
      };
      let session = session.ok_or_else(|| AppError::Internal("OTP session missing before check.".to_string()))?;

      if app_state.otp.code_matches(&session, &code) {
        app_state.repos.otp.delete_otp_session(session.id).await?;
        event!(Level::DEBUG, phone = %session.phone, "OTP accepted.");
        return Ok(PipelineControl::Continue);
      }

      let attempts = app_state.repos.otp.record_failed_otp_attempt(session.id).await?;
      warn!(phone = %session.phone, attempts, "Wrong OTP entered.");
      if attempts >= OTP_MAX_ATTEMPTS {
        app_state.repos.otp.delete_otp_session(session.id).await?;
      }
      Err::<PipelineControl, AppError>(AppError::Auth(INVALID_OTP.to_string()))
    })
  });

  p.on_root("find_or_create_customer", |ctx_data: ContextData<OtpVerifyCtxData>| {
    Box::pin(async move {
      let (phone, users) = ctx_data.snapshot(|c| (c.phone.clone(), c.app_state.repos.users.clone()));

      let (user, created) = match users.find_user_by_phone(&phone).await? {
        Some(user) => (user, false),
        None => {
          let user = users
            .create_user(NewUser {
              role: Role::Customer,
              name: "Snapcart Customer".to_string(),
              email: None,
              phone: Some(phone.clone()),
              password_hash: None,
              store_name: None,
            })
            .await?;
          info!(user_id = %user.id, "Customer created on first OTP login.");
          (user, true)
        }
      };

      {
        let mut guard = ctx_data.write();
        guard.user = Some(user);
        guard.account_created = created;
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("issue_tokens", |ctx_data: ContextData<OtpVerifyCtxData>| {
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

  flows.register_pipeline(p);
  info!("OTP verify pipeline registered.");
}
