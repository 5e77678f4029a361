// snapcart/apps/api/src/pipelines/order_pipeline.rs

use crate::errors::AppError;
use crate::models::{OrderStatus, Role};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{OrderEmailCtxData, OrderTransitionCtxData};
use crate::state::AppState;
use flow::{ContextData, Flows, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{event, info, warn, Level};

/// Registers the order status pipeline used by customer cancels and admin
/// status updates.
pub fn register_order_transition_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let mut p = Pipeline::<OrderTransitionCtxData, AppError>::new(&[
    ("load_order", false, None),
    ("authorize_transition", false, None),
    ("check_transition", false, None),
    ("apply_transition", false, None),
    ("notify_customer", true, None),
  ]);

  p.on_root("load_order", |ctx_data: ContextData<OrderTransitionCtxData>| {
    Box::pin(async move {
      let (order_id, orders) = ctx_data.snapshot(|c| (c.order_id, c.app_state.repos.orders.clone()));
      let order = orders
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order with ID {} not found.", order_id)))?;
      ctx_data.write().order = Some(order.order);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Customers may only cancel their own orders; admins may drive any move.
  p.on_root("authorize_transition", |ctx_data: ContextData<OrderTransitionCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let order = guard
        .order
        .as_ref()
        .ok_or_else(|| AppError::Internal("Order missing before authorization.".to_string()))?;
      match guard.actor_role {
        Role::Admin => Ok(PipelineControl::Continue),
        Role::Customer if order.user_id != guard.actor_id => {
          Err(AppError::NotFound(format!("Order with ID {} not found.", order.id)))
        }
        Role::Customer if guard.next_status == OrderStatus::Cancelled => Ok(PipelineControl::Continue),
        _ => {
          warn!(actor_id = %guard.actor_id, role = %guard.actor_role, next = %guard.next_status, "Order transition refused.");
          Err(AppError::Forbidden("You may not change this order's status.".to_string()))
        }
      }
    })
  });

  p.on_root("check_transition", |ctx_data: ContextData<OrderTransitionCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      let current = guard
        .order
        .as_ref()
        .map(|o| o.status)
        .ok_or_else(|| AppError::Internal("Order missing before transition check.".to_string()))?;
      if !current.can_transition_to(guard.next_status) {
        return Err(AppError::Conflict(format!(
          "Order cannot move from {} to {}.",
          current, guard.next_status
        )));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("apply_transition", |ctx_data: ContextData<OrderTransitionCtxData>| {
    Box::pin(async move {
      let (order_id, next, orders) = ctx_data.snapshot(|c| (c.order_id, c.next_status, c.app_state.repos.orders.clone()));
      let updated = orders.transition_order(order_id, next).await?;
      info!(%order_id, status = %updated.status, payment_status = ?updated.payment_status, "Order status changed.");
      ctx_data.write().updated = Some(updated);
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p.on_root("notify_customer", |ctx_data: ContextData<OrderTransitionCtxData>| {
    Box::pin(async move {
      let (app_state, updated) = ctx_data.snapshot(|c| (c.app_state.clone(), c.updated.clone()));
      let updated = updated.ok_or_else(|| AppError::Internal("Order missing before notification.".to_string()))?;

      let headline = match updated.status {
        OrderStatus::Confirmed => "Your order has been confirmed.",
        OrderStatus::Shipped => "Your order is on its way.",
        OrderStatus::Delivered => "Your order has been delivered.",
        OrderStatus::Cancelled => "Your order has been cancelled.",
        OrderStatus::Pending => return Ok(PipelineControl::Continue),
      };
      let Some(customer) = app_state.repos.users.find_user(updated.user_id).await? else {
        return Ok(PipelineControl::Continue);
      };
      let Some(email) = customer.email else {
        event!(Level::DEBUG, user_id = %customer.id, "No email on file, status update not sent.");
        return Ok(PipelineControl::Continue);
      };

      let email_ctx = OrderEmailCtxData {
        app_state,
        recipient_email: email,
        recipient_name: customer.name,
        order_id: updated.id,
        subject: format!("Snapcart order update: {}", updated.status),
        headline: headline.to_string(),
      };
      common_steps::send_order_email_step(ContextData::new(email_ctx)).await?;
      ctx_data.write().customer_notified = true;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(p);
  info!("Order transition pipeline registered.");
}
