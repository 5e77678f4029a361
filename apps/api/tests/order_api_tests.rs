// snapcart/apps/api/tests/order_api_tests.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use common::*;
use serde_json::json;
use snapcart_api::models::{OrderStatus, ProductWithVariants, Role, User};
use snapcart_api::AppError;

struct Shop {
  h: Harness,
  seller_token: String,
  buyer: User,
  buyer_token: String,
  admin_token: String,
  kettle: ProductWithVariants,
}

async fn shop() -> Shop {
  let h = harness();
  let (seller, seller_token) = h.user(Role::Seller, "seller@example.com").await;
  let (buyer, buyer_token) = h.user(Role::Customer, "buyer@example.com").await;
  let (_, admin_token) = h.user(Role::Admin, "admin@example.com").await;
  let category = h.category("Kitchen").await;
  let kettle = h.product(seller.id, category.id, "Kettle", 30_000, 5).await;
  Shop {
    h,
    seller_token,
    buyer,
    buyer_token,
    admin_token,
    kettle,
  }
}

/// Puts `$qty` kettles in the buyer's cart, checks out with `$method` and
/// yields the new order's id.
macro_rules! place_order {
  ($app:expr, $shop:expr, $qty:expr, $method:expr) => {{
    let address = $shop.h.address($shop.buyer.id).await;
    send!(
      $app,
      TestRequest::post()
        .uri("/api/cart/items")
        .insert_header(bearer(&$shop.buyer_token))
        .set_json(json!({ "product_id": $shop.kettle.product.id, "quantity": $qty }))
    );
    let (status, body) = send!(
      $app,
      TestRequest::post()
        .uri("/api/checkout")
        .insert_header(bearer(&$shop.buyer_token))
        .set_json(json!({ "address_id": address.id, "payment_method": $method }))
    );
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["order"]["id"].as_str().expect("order id").to_string()
  }};
}

fn set_status(order_id: &str, status: &str, token: &str) -> TestRequest {
  TestRequest::patch()
    .uri(&format!("/api/admin/orders/{}/status", order_id))
    .insert_header(bearer(token))
    .set_json(json!({ "status": status }))
}

fn cancel(order_id: &str, token: &str) -> TestRequest {
  TestRequest::post()
    .uri(&format!("/api/orders/{}/cancel", order_id))
    .insert_header(bearer(token))
}

#[actix_web::test]
async fn cancel_restocks_and_is_final() {
  let s = shop().await;
  let app = init_app!(s.h.state);
  let (_, stranger) = s.h.user(Role::Customer, "stranger@example.com").await;

  let order_id = place_order!(app, s, 2, "cod");
  assert_eq!(s.h.stock_of(s.kettle.product.id).await, 3);

  let (status, _) = send!(app, cancel(&order_id, &stranger));
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = send!(
    app,
    TestRequest::get()
      .uri(&format!("/api/orders/{}", order_id))
      .insert_header(bearer(&stranger))
  );
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = send!(app, cancel(&order_id, &s.buyer_token));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["order"]["status"], "cancelled");
  assert_eq!(body["customerNotified"], true);
  assert_eq!(s.h.stock_of(s.kettle.product.id).await, 5);

  let (status, _) = send!(app, cancel(&order_id, &s.buyer_token));
  assert_eq!(status, StatusCode::CONFLICT);
  let (status, _) = send!(app, set_status(&order_id, "shipped", &s.admin_token));
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(s.h.stock_of(s.kettle.product.id).await, 5);

  // The store refuses the move on its own too, with the same error kind.
  let order_uuid: uuid::Uuid = order_id.parse().expect("order uuid");
  let refused = s.h.state.repos.orders.transition_order(order_uuid, OrderStatus::Shipped).await;
  assert!(matches!(refused, Err(AppError::Conflict(_))), "{:?}", refused);
}

#[actix_web::test]
async fn admin_walks_the_status_machine() {
  let s = shop().await;
  let app = init_app!(s.h.state);
  let order_id = place_order!(app, s, 1, "cod");

  let (status, _) = send!(app, set_status(&order_id, "shipped", &s.buyer_token));
  assert_eq!(status, StatusCode::FORBIDDEN);
  let (status, _) = send!(app, set_status(&order_id, "delivered", &s.admin_token));
  assert_eq!(status, StatusCode::CONFLICT);
  let (status, _) = send!(app, set_status(&order_id, "teleported", &s.admin_token));
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = send!(app, set_status(&order_id, "shipped", &s.admin_token));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["order"]["status"], "shipped");
  assert_eq!(body["order"]["payment_status"], "pending");

  // Shipped orders can no longer be cancelled by the customer.
  let (status, _) = send!(app, cancel(&order_id, &s.buyer_token));
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, body) = send!(app, set_status(&order_id, "delivered", &s.admin_token));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["order"]["status"], "delivered");
  assert_eq!(body["order"]["payment_status"], "paid");

  let (status, body) = send!(
    app,
    TestRequest::get()
      .uri("/api/admin/orders?status=delivered")
      .insert_header(bearer(&s.admin_token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["orders"].as_array().map(Vec::len), Some(1));

  let (status, body) = send!(app, TestRequest::get().uri("/api/orders").insert_header(bearer(&s.buyer_token)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["orders"][0]["id"], order_id.as_str());
}

#[actix_web::test]
async fn cancelling_a_paid_order_refunds_it() {
  let s = shop().await;
  let app = init_app!(s.h.state);
  let order_id = place_order!(app, s, 1, "razorpay");

  let (_, body) = send!(
    app,
    TestRequest::get()
      .uri(&format!("/api/orders/{}", order_id))
      .insert_header(bearer(&s.buyer_token))
  );
  let gateway_order_id = body["order"]["gateway_order_id"].as_str().expect("gateway id").to_string();
  let (status, _) = send!(
    app,
    TestRequest::post()
      .uri("/api/payments/verify")
      .insert_header(bearer(&s.buyer_token))
      .set_json(json!({
        "order_id": order_id,
        "gateway_order_id": gateway_order_id,
        "gateway_payment_id": "pay_77",
        "signature": s.h.gateway.sign(&gateway_order_id, "pay_77"),
      }))
  );
  assert_eq!(status, StatusCode::OK);

  let (status, body) = send!(app, cancel(&order_id, &s.buyer_token));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["order"]["payment_status"], "refunded");
}

#[actix_web::test]
async fn analytics_count_only_revenue_orders() {
  let s = shop().await;
  let app = init_app!(s.h.state);
  let (other_seller, other_seller_token) = s.h.user(Role::Seller, "other@example.com").await;
  let category = s.h.category("Garden").await;
  s.h.product(other_seller.id, category.id, "Hose", 10_000, 5).await;

  let kept = place_order!(app, s, 2, "cod");
  let cancelled = place_order!(app, s, 1, "cod");
  send!(app, cancel(&cancelled, &s.buyer_token));
  // Unpaid online orders are not revenue yet.
  place_order!(app, s, 1, "razorpay");

  let (status, body) = send!(
    app,
    TestRequest::get()
      .uri("/api/admin/analytics")
      .insert_header(bearer(&s.admin_token))
  );
  assert_eq!(status, StatusCode::OK);
  let analytics = &body["analytics"];
  assert_eq!(analytics["order_count"], 3);
  assert_eq!(analytics["revenue_paise"], 60_000);
  assert_eq!(analytics["average_order_value_paise"], 60_000);
  assert_eq!(analytics["orders_by_status"]["cancelled"], 1);
  assert_eq!(analytics["customer_count"], 1);
  assert_eq!(analytics["seller_count"], 2);
  assert_eq!(analytics["top_products"][0]["name"], "Kettle");
  assert_eq!(analytics["top_products"][0]["units_sold"], 2);

  let (status, body) = send!(
    app,
    TestRequest::get()
      .uri("/api/seller/analytics")
      .insert_header(bearer(&s.seller_token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["analytics"]["units_sold"], 2);
  assert_eq!(body["analytics"]["revenue_paise"], 60_000);
  assert_eq!(body["analytics"]["order_count"], 1);

  let (_, body) = send!(
    app,
    TestRequest::get()
      .uri("/api/seller/analytics")
      .insert_header(bearer(&other_seller_token))
  );
  assert_eq!(body["analytics"]["units_sold"], 0);

  let (status, body) = send!(
    app,
    TestRequest::get()
      .uri("/api/seller/orders")
      .insert_header(bearer(&s.seller_token))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["orders"].as_array().map(Vec::len), Some(3));
  assert!(body["orders"]
    .as_array()
    .expect("orders")
    .iter()
    .any(|o| o["id"] == kept.as_str()));

  let (status, _) = send!(
    app,
    TestRequest::get()
      .uri("/api/admin/analytics")
      .insert_header(bearer(&s.seller_token))
  );
  assert_eq!(status, StatusCode::FORBIDDEN);
}
