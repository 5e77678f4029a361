// snapcart/apps/api/src/web/handlers/analytics_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, SellerUser};

#[instrument(name = "handler::admin_analytics", skip_all)]
pub async fn admin_analytics_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let analytics = app_state.repos.analytics.admin_analytics().await?;
  Ok(HttpResponse::Ok().json(json!({ "analytics": analytics })))
}

#[instrument(name = "handler::seller_analytics", skip_all, fields(seller_id = %seller.id()))]
pub async fn seller_analytics_handler(
  app_state: web::Data<AppState>,
  seller: SellerUser,
) -> Result<HttpResponse, AppError> {
  let analytics = app_state.repos.analytics.seller_analytics(seller.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "analytics": analytics })))
}
