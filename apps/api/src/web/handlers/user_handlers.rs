// snapcart/apps/api/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::address::NewAddress;
use crate::models::user::ProfileUpdate;
use crate::models::Role;
use crate::services::otp_service;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};

fn trimmed_non_empty(value: Option<String>, field: &str) -> Result<Option<String>, AppError> {
  match value.map(|v| v.trim().to_string()) {
    Some(v) if v.is_empty() => Err(AppError::Validation(format!("{} cannot be empty.", field))),
    other => Ok(other),
  }
}

#[instrument(name = "handler::update_me", skip(app_state, auth, req_payload), fields(user_id = %auth.id()))]
pub async fn update_me_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if payload.store_name.is_some() && auth.role() != Role::Seller {
    return Err(AppError::Validation("Only sellers have a store name.".to_string()));
  }
  let update = ProfileUpdate {
    name: trimmed_non_empty(payload.name, "Name")?,
    phone: payload.phone.as_deref().map(otp_service::normalize_phone).transpose()?,
    store_name: trimmed_non_empty(payload.store_name, "Store name")?,
  };

  let user = app_state.repos.users.update_profile(auth.id(), update).await?;
  info!("Profile updated.");
  Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

#[instrument(name = "handler::list_addresses", skip_all, fields(user_id = %auth.id()))]
pub async fn list_addresses_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let addresses = app_state.repos.users.list_addresses(auth.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "addresses": addresses })))
}

#[instrument(name = "handler::add_address", skip(app_state, auth, req_payload), fields(user_id = %auth.id()))]
pub async fn add_address_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  req_payload: web::Json<NewAddress>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let required = [
    ("full_name", &payload.full_name),
    ("line1", &payload.line1),
    ("city", &payload.city),
    ("state", &payload.state),
    ("postal_code", &payload.postal_code),
  ];
  if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
    return Err(AppError::Validation(format!("{} is required.", field)));
  }
  let address = NewAddress {
    phone: otp_service::normalize_phone(&payload.phone)?,
    ..payload
  };

  let created = app_state.repos.users.add_address(auth.id(), address).await?;
  info!(address_id = %created.id, is_default = created.is_default, "Address added.");
  Ok(HttpResponse::Created().json(json!({ "address": created })))
}

#[instrument(name = "handler::delete_address", skip(app_state, auth), fields(user_id = %auth.id()))]
pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let address_id = path.into_inner();
  if !app_state.repos.users.delete_address(auth.id(), address_id).await? {
    return Err(AppError::NotFound(format!("Address with ID {} not found.", address_id)));
  }
  Ok(HttpResponse::NoContent().finish())
}

#[derive(Deserialize, Debug)]
pub struct ListUsersQuery {
  pub role: Option<Role>,
}

#[instrument(name = "handler::admin_list_users", skip_all)]
pub async fn admin_list_users_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  query: web::Query<ListUsersQuery>,
) -> Result<HttpResponse, AppError> {
  let users = app_state.repos.users.list_users(query.role).await?;
  Ok(HttpResponse::Ok().json(json!({ "users": users })))
}

#[derive(Deserialize, Debug)]
pub struct SetActivePayload {
  pub is_active: bool,
}

#[instrument(name = "handler::admin_set_user_active", skip(app_state, admin, req_payload), fields(admin_id = %admin.id()))]
pub async fn admin_set_user_active_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<SetActivePayload>,
) -> Result<HttpResponse, AppError> {
  let user_id = path.into_inner();
  if user_id == admin.id() && !req_payload.is_active {
    return Err(AppError::Validation("Admins cannot deactivate themselves.".to_string()));
  }
  let user = app_state.repos.users.set_user_active(user_id, req_payload.is_active).await?;
  info!(%user_id, is_active = user.is_active, "User activation changed.");
  Ok(HttpResponse::Ok().json(json!({ "user": user })))
}
