// snapcart/apps/api/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::Role;
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{OtpRequestCtxData, OtpVerifyCtxData, SigninCtxData, SignupCtxData};
use crate::services::token_service::{TokenKind, TokenPair};
use crate::state::AppState;
use crate::web::cookies::{self, REFRESH_COOKIE};
use crate::web::extractors::AuthenticatedUser;
use flow::{ContextData, PipelineResult};

#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub name: String,
  pub email: String,
  pub password: String,
  /// `customer` (default) or `seller`.
  pub role: Option<Role>,
  pub store_name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequestPayload {
  pub email: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct OtpRequestPayload {
  pub phone: String,
}

#[derive(Deserialize, Debug)]
pub struct OtpVerifyPayload {
  pub phone: String,
  pub code: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct RefreshPayload {
  pub refresh_token: Option<String>,
}

fn authenticated_response(
  mut builder: actix_web::HttpResponseBuilder,
  app_state: &AppState,
  tokens: &TokenPair,
  body: serde_json::Value,
) -> HttpResponse {
  cookies::set_auth_cookies(&mut builder, tokens, &app_state.config);
  builder.json(body)
}

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(SignupCtxData::new(
    app_state.get_ref().clone(),
    payload.role.unwrap_or(Role::Customer),
    payload.name,
    payload.email,
    payload.password,
    payload.store_name,
  ));

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let (user, tokens, welcome_email_sent) = {
        let guard = ctx_data.read();
        (guard.user.clone(), guard.tokens.clone(), guard.welcome_email_sent)
      };
      let user = user.ok_or_else(|| AppError::Internal("Signup completed without a user.".to_string()))?;
      let tokens = tokens.ok_or_else(|| AppError::Internal("Signup completed without tokens.".to_string()))?;
      info!(user_id = %user.id, welcome_email_sent, "Signup successful.");

      Ok(authenticated_response(
        HttpResponse::Created(),
        &app_state,
        &tokens,
        json!({ "user": user, "tokens": tokens, "welcomeEmailSent": welcome_email_sent }),
      ))
    }
    PipelineResult::Stopped => {
      warn!("Signup pipeline was stopped by a handler.");
      Err(AppError::PipelineHaltedByHandler)
    }
  }
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(req_email = %req_payload.email))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    email: payload.email,
    password: payload.password,
    user: None,
    tokens: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let (user, tokens) = ctx_data.snapshot(|c| (c.user.clone(), c.tokens.clone()));
      let user = user.ok_or_else(|| AppError::Auth("Sign-in completed without a user.".to_string()))?;
      let tokens = tokens.ok_or_else(|| AppError::Auth("Sign-in completed without tokens.".to_string()))?;
      info!(user_id = %user.id, "Login successful.");
      Ok(authenticated_response(
        HttpResponse::Ok(),
        &app_state,
        &tokens,
        json!({ "user": user, "tokens": tokens }),
      ))
    }
    PipelineResult::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(name = "handler::otp_request", skip(app_state, req_payload))]
pub async fn otp_request_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<OtpRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let ctx_data = ContextData::new(OtpRequestCtxData {
    app_state: app_state.get_ref().clone(),
    phone: req_payload.into_inner().phone,
    code: None,
    expires_at: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let (phone, expires_at) = ctx_data.snapshot(|c| (c.phone.clone(), c.expires_at));
      Ok(HttpResponse::Ok().json(json!({
        "message": "OTP sent.",
        "phone": phone,
        "expiresAt": expires_at,
      })))
    }
    PipelineResult::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(name = "handler::otp_verify", skip(app_state, req_payload))]
pub async fn otp_verify_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<OtpVerifyPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let ctx_data = ContextData::new(OtpVerifyCtxData {
    app_state: app_state.get_ref().clone(),
    phone: payload.phone,
    code: payload.code,
    session: None,
    user: None,
    account_created: false,
    tokens: None,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let (user, tokens, created) = ctx_data.snapshot(|c| (c.user.clone(), c.tokens.clone(), c.account_created));
      let user = user.ok_or_else(|| AppError::Internal("OTP login completed without a user.".to_string()))?;
      let tokens = tokens.ok_or_else(|| AppError::Internal("OTP login completed without tokens.".to_string()))?;
      info!(user_id = %user.id, created, "OTP login successful.");
      Ok(authenticated_response(
        HttpResponse::Ok(),
        &app_state,
        &tokens,
        json!({ "user": user, "tokens": tokens, "accountCreated": created }),
      ))
    }
    PipelineResult::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

/// Issues a new pair from a refresh token in the body or the `refresh_token` cookie.
#[instrument(name = "handler::refresh", skip_all)]
pub async fn refresh_handler(
  req: HttpRequest,
  app_state: web::Data<AppState>,
  req_payload: Option<web::Json<RefreshPayload>>,
) -> Result<HttpResponse, AppError> {
  let token = req_payload
    .and_then(|p| p.into_inner().refresh_token)
    .or_else(|| req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string()))
    .ok_or_else(|| AppError::Auth("Refresh token required.".to_string()))?;

  let claims = app_state.tokens.verify(&token, TokenKind::Refresh)?;
  let user = app_state
    .repos
    .users
    .find_user(claims.sub)
    .await?
    .ok_or_else(|| AppError::Auth("Account no longer exists.".to_string()))?;
  let tokens = common_steps::issue_tokens_for(&app_state, &user)?;

  Ok(authenticated_response(
    HttpResponse::Ok(),
    &app_state,
    &tokens,
    json!({ "tokens": tokens }),
  ))
}

#[instrument(name = "handler::logout", skip_all)]
pub async fn logout_handler(app_state: web::Data<AppState>) -> HttpResponse {
  let mut builder = HttpResponse::Ok();
  cookies::clear_auth_cookies(&mut builder, &app_state.config);
  builder.json(json!({ "message": "Logged out." }))
}

#[instrument(name = "handler::me", skip_all, fields(user_id = %auth.id()))]
pub async fn me_handler(auth: AuthenticatedUser) -> HttpResponse {
  HttpResponse::Ok().json(json!({ "user": auth.user }))
}
