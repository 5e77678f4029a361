// snapcart/apps/api/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Order, OrderStatus, Role};
use crate::pipelines::contexts::OrderTransitionCtxData;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser, CustomerUser, SellerUser};
use flow::{ContextData, PipelineResult};

async fn run_transition(
  app_state: &AppState,
  actor: &AuthenticatedUser,
  order_id: Uuid,
  next_status: OrderStatus,
) -> Result<(Order, bool), AppError> {
  let ctx_data = ContextData::new(OrderTransitionCtxData {
    app_state: app_state.clone(),
    actor_id: actor.id(),
    actor_role: actor.role(),
    order_id,
    next_status,
    order: None,
    updated: None,
    customer_notified: false,
  });

  match app_state.flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let (updated, notified) = ctx_data.snapshot(|c| (c.updated.clone(), c.customer_notified));
      let updated = updated.ok_or_else(|| AppError::Internal("Order transition completed without an order.".to_string()))?;
      Ok((updated, notified))
    }
    PipelineResult::Stopped => Err(AppError::PipelineHaltedByHandler),
  }
}

#[instrument(name = "handler::list_my_orders", skip_all, fields(user_id = %customer.id()))]
pub async fn list_my_orders_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.repos.orders.list_orders_for_user(customer.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

/// Owners and admins see the order. Anyone else gets a 404.
#[instrument(name = "handler::get_order", skip(app_state, auth), fields(user_id = %auth.id()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = app_state
    .repos
    .orders
    .find_order(order_id)
    .await?
    .filter(|o| auth.role() == Role::Admin || o.order.user_id == auth.id())
    .ok_or_else(|| AppError::NotFound(format!("Order with ID {} not found.", order_id)))?;
  Ok(HttpResponse::Ok().json(json!({ "order": order })))
}

#[instrument(name = "handler::cancel_order", skip(app_state, customer), fields(user_id = %customer.id()))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  customer: CustomerUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let (order, notified) = run_transition(&app_state, &customer, path.into_inner(), OrderStatus::Cancelled).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order, "customerNotified": notified })))
}

#[derive(Deserialize, Debug)]
pub struct OrderListQuery {
  pub status: Option<OrderStatus>,
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, _admin))]
pub async fn admin_list_orders_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  query: web::Query<OrderListQuery>,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.repos.orders.list_orders(query.status).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusPayload {
  pub status: OrderStatus,
}

#[instrument(name = "handler::admin_update_order_status", skip(app_state, admin), fields(admin_id = %admin.id()))]
pub async fn admin_update_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateStatusPayload>,
) -> Result<HttpResponse, AppError> {
  let (order, notified) = run_transition(&app_state, &admin, path.into_inner(), req_payload.status).await?;
  Ok(HttpResponse::Ok().json(json!({ "order": order, "customerNotified": notified })))
}

#[instrument(name = "handler::seller_list_orders", skip_all, fields(seller_id = %seller.id()))]
pub async fn seller_list_orders_handler(
  app_state: web::Data<AppState>,
  seller: SellerUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state.repos.orders.list_orders_for_seller(seller.id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}
