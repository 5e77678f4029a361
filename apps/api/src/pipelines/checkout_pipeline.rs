// snapcart/apps/api/src/pipelines/checkout_pipeline.rs

//! One pipeline serves the cart view, the checkout preview, coupon apply and
//! order placement. Steps with side effects are skipped unless the run is in
//! `CheckoutMode::Place`.

use crate::errors::AppError;
use crate::models::coupon::normalize_code;
use crate::models::{OrderStatus, PaymentMethod};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{CheckoutCtxData, CheckoutMode, OrderEmailCtxData};
use crate::pricing::{self, PricingConfig, Quote};
use crate::repository::PlaceOrder;
use crate::state::AppState;
use flow::{ContextData, Flows, Pipeline, PipelineControl, SkipCondition};
use std::sync::Arc;
use tracing::{event, info, instrument, warn, Level};
use uuid::Uuid;

fn unless_placing() -> SkipCondition<CheckoutCtxData> {
  Arc::new(|ctx: ContextData<CheckoutCtxData>| ctx.read().mode != CheckoutMode::Place)
}

pub fn register_checkout_pipeline(flows: &Arc<Flows<AppError>>, _app_state: &AppState) {
  let without_coupon: SkipCondition<CheckoutCtxData> = Arc::new(|ctx: ContextData<CheckoutCtxData>| !ctx.read().has_coupon());
  let unless_online: SkipCondition<CheckoutCtxData> = Arc::new(|ctx: ContextData<CheckoutCtxData>| {
    let guard = ctx.read();
    guard.mode != CheckoutMode::Place || guard.payment_method != PaymentMethod::Razorpay
  });

  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(&[
    ("load_cart", false, None),
    ("load_address", false, Some(unless_placing())),
    ("price_lines", false, None),
    ("apply_offers", false, None),
    ("validate_coupon", false, Some(without_coupon)),
    ("build_quote", false, None),
    ("create_gateway_order", false, Some(unless_online)),
    ("persist_order", false, Some(unless_placing())),
    ("send_confirmation", true, Some(unless_placing())),
  ]);

  p.on_root("load_cart", load_cart);
  p.on_root("load_address", load_address);
  p.on_root("price_lines", price_lines);
  p.on_root("apply_offers", apply_offers);
  p.on_root("validate_coupon", validate_coupon);
  p.on_root("build_quote", build_quote);
  p.on_root("create_gateway_order", create_gateway_order);
  p.on_root("persist_order", persist_order);
  p.on_root("send_confirmation", send_confirmation);

  flows.register_pipeline(p);
  info!("Checkout pipeline registered.");
}

async fn load_cart(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (user_id, mode, carts) = {
    let guard = ctx_data.read();
    (guard.user_id, guard.mode, guard.app_state.repos.carts.clone())
  };

  let items = carts.list_cart(user_id).await?;
  if items.is_empty() {
    if mode == CheckoutMode::CartView {
      return Ok(PipelineControl::Stop);
    }
    return Err(AppError::Validation("Cart is empty".to_string()));
  }

  event!(Level::DEBUG, %user_id, lines = items.len(), "Cart loaded.");
  ctx_data.write().cart_items = items;
  Ok(PipelineControl::Continue)
}

async fn load_address(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (user_id, address_id, users) = {
    let guard = ctx_data.read();
    (guard.user_id, guard.address_id, guard.app_state.repos.users.clone())
  };
  let address_id = address_id.ok_or_else(|| AppError::Validation("address_id is required.".to_string()))?;

  let address = users
    .find_address(address_id)
    .await?
    .filter(|a| a.user_id == user_id)
    .ok_or_else(|| {
      warn!(%user_id, %address_id, "Checkout with an address the caller does not own.");
      AppError::NotFound(format!("Address with ID {} not found.", address_id))
    })?;

  ctx_data.write().address = Some(address);
  Ok(PipelineControl::Continue)
}

/// Checkout rejects the whole cart on the first bad line. The cart view prices
/// what it can and reports the rest so the customer can fix them.
async fn price_lines(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (items, mode, catalog) = ctx_data.snapshot(|c| (c.cart_items.clone(), c.mode, c.app_state.repos.catalog.clone()));

  let mut ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
  ids.sort_unstable();
  ids.dedup();
  let products = catalog.find_products(&ids).await?;

  let (lines, unavailable) = if mode == CheckoutMode::CartView {
    pricing::partition_lines(&items, &products)
  } else {
    (pricing::resolve_lines(&items, &products)?, Vec::new())
  };
  if !unavailable.is_empty() {
    event!(Level::DEBUG, unavailable = unavailable.len(), "Cart has lines that cannot be bought.");
  }

  let mut guard = ctx_data.write();
  guard.lines = lines;
  guard.unavailable = unavailable;
  Ok(PipelineControl::Continue)
}

async fn apply_offers(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (now, promotions) = ctx_data.snapshot(|c| (c.now, c.app_state.repos.promotions.clone()));
  let offers = promotions.list_offers(Some(now)).await?;

  let mut guard = ctx_data.write();
  pricing::apply_offers(&mut guard.lines, &offers, now);
  guard.offers = offers;
  Ok(PipelineControl::Continue)
}

async fn validate_coupon(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (user_id, raw_code, now, post_offer_subtotal, promotions) = {
    let guard = ctx_data.read();
    (
      guard.user_id,
      guard.coupon_code.clone().unwrap_or_default(),
      guard.now,
      guard.lines.iter().map(|l| l.line_total_paise).sum::<i64>(),
      guard.app_state.repos.promotions.clone(),
    )
  };

  let code = normalize_code(&raw_code);
  let coupon = promotions.find_coupon_by_code(&code).await?;
  let usage = match &coupon {
    Some(c) => promotions.count_coupon_usage(c.id, user_id).await?,
    None => 0,
  };
  let coupon = pricing::validate_coupon(coupon.as_ref(), &code, now, post_offer_subtotal, usage)?.clone();

  event!(Level::DEBUG, code = %coupon.code, "Coupon accepted.");
  ctx_data.write().coupon = Some(coupon);
  Ok(PipelineControl::Continue)
}

async fn build_quote(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let mut guard = ctx_data.write();
  let config = PricingConfig::from(guard.app_state.config.as_ref());
  let lines = std::mem::take(&mut guard.lines);
  let mut quote = if lines.is_empty() && guard.mode == CheckoutMode::CartView {
    Quote::empty(&config)
  } else {
    pricing::quote(lines, guard.coupon.as_ref(), &config)?
  };
  quote.unavailable = std::mem::take(&mut guard.unavailable);
  guard.lines = quote.lines.clone();
  guard.quote = Some(quote);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::create_gateway_order", skip_all, err(Display))]
async fn create_gateway_order(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (order_id, total, currency, payments) = {
    let guard = ctx_data.read();
    let quote = guard
      .quote
      .as_ref()
      .ok_or_else(|| AppError::Internal("Quote missing before payment.".to_string()))?;
    (guard.order_id, quote.total_paise, quote.currency.clone(), guard.app_state.payments.clone())
  };

  let gateway_order = payments.create_order(&order_id.to_string(), total, &currency).await?;
  ctx_data.write().gateway_order = Some(gateway_order);
  Ok(PipelineControl::Continue)
}

async fn persist_order(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (place, orders) = {
    let guard = ctx_data.read();
    let missing = |what: &str| AppError::Internal(format!("{} missing before order placement.", what));
    let place = PlaceOrder {
      order_id: guard.order_id,
      user_id: guard.user_id,
      address: guard.address.clone().ok_or_else(|| missing("Address"))?,
      payment_method: guard.payment_method,
      quote: guard.quote.clone().ok_or_else(|| missing("Quote"))?,
      coupon_id: guard.coupon.as_ref().map(|c| c.id),
      gateway_order_id: guard.gateway_order.as_ref().map(|g| g.id.clone()),
    };
    (place, guard.app_state.repos.orders.clone())
  };

  let order = orders.place_order(place).await?;
  info!(
    order_id = %order.order.id,
    status = %order.order.status,
    total = %pricing::display_amount(order.order.total_paise),
    "Order placed."
  );
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

/// Optional: a failed email never undoes a placed order.
async fn send_confirmation(ctx_data: ContextData<CheckoutCtxData>) -> Result<PipelineControl, AppError> {
  let (app_state, user_id, order) = ctx_data.snapshot(|c| (c.app_state.clone(), c.user_id, c.order.clone()));
  let order = order.ok_or_else(|| AppError::Internal("Order missing before confirmation.".to_string()))?;

  let user = app_state.repos.users.find_user(user_id).await?;
  let Some((email, name)) = user.and_then(|u| u.email.map(|e| (e, u.name))) else {
    event!(Level::DEBUG, %user_id, "No email on file, confirmation skipped.");
    return Ok(PipelineControl::Continue);
  };

  let (subject, headline) = match order.order.status {
    OrderStatus::Pending => (
      "Your Snapcart order is awaiting payment".to_string(),
      format!(
        "Complete the payment of {} to confirm your order.",
        pricing::display_amount(order.order.total_paise)
      ),
    ),
    _ => (
      "Your Snapcart order is confirmed".to_string(),
      common_steps::order_confirmation_headline(order.order.total_paise),
    ),
  };
  let email_ctx = OrderEmailCtxData {
    app_state,
    recipient_email: email,
    recipient_name: name,
    order_id: order.order.id,
    subject,
    headline,
  };
  common_steps::send_order_email_step(ContextData::new(email_ctx)).await?;
  ctx_data.write().confirmation_email_sent = true;
  Ok(PipelineControl::Continue)
}
