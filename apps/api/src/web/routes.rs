// snapcart/apps/api/src/web/routes.rs

use crate::web::handlers::{
  analytics_handlers as analytics, auth_handlers as auth, cart_handlers as cart, catalog_handlers as catalog,
  checkout_handlers as checkout, order_handlers as orders, payment_handlers as payments,
  promotion_handlers as promotions, user_handlers as users,
};
use actix_web::{web, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth::signup_handler))
          .route("/login", web::post().to(auth::login_handler))
          .route("/otp/request", web::post().to(auth::otp_request_handler))
          .route("/otp/verify", web::post().to(auth::otp_verify_handler))
          .route("/refresh", web::post().to(auth::refresh_handler))
          .route("/logout", web::post().to(auth::logout_handler))
          .route("/me", web::get().to(auth::me_handler)),
      )
      .service(
        web::scope("/users/me")
          .route("", web::get().to(auth::me_handler))
          .route("", web::patch().to(users::update_me_handler))
          .route("/addresses", web::get().to(users::list_addresses_handler))
          .route("/addresses", web::post().to(users::add_address_handler))
          .route("/addresses/{id}", web::delete().to(users::delete_address_handler)),
      )
      .service(
        web::scope("/categories")
          .route("", web::get().to(catalog::list_categories_handler))
          .route("", web::post().to(catalog::create_category_handler))
          .route("/{id}", web::patch().to(catalog::update_category_handler))
          .route("/{id}", web::delete().to(catalog::delete_category_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(catalog::list_products_handler))
          .route("", web::post().to(catalog::create_product_handler))
          .route("/{id}", web::get().to(catalog::get_product_handler))
          .route("/{id}", web::patch().to(catalog::update_product_handler))
          .route("/{id}", web::delete().to(catalog::delete_product_handler)),
      )
      .route("/feed", web::get().to(catalog::feed_handler))
      .route("/offers", web::get().to(promotions::list_offers_handler))
      .route("/banners", web::get().to(promotions::list_banners_handler))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart::view_cart_handler))
          .route("", web::delete().to(cart::clear_cart_handler))
          .route("/items", web::post().to(cart::add_to_cart_handler))
          .route("/items/{id}", web::patch().to(cart::update_cart_item_handler))
          .route("/items/{id}", web::delete().to(cart::remove_cart_item_handler)),
      )
      .route("/coupon/apply", web::post().to(checkout::apply_coupon_handler))
      .service(
        web::scope("/checkout")
          .route("", web::post().to(checkout::place_order_handler))
          .route("/preview", web::post().to(checkout::preview_handler)),
      )
      .route("/payments/verify", web::post().to(payments::verify_payment_handler))
      .service(
        web::scope("/orders")
          .route("", web::get().to(orders::list_my_orders_handler))
          .route("/{id}", web::get().to(orders::get_order_handler))
          .route("/{id}/cancel", web::post().to(orders::cancel_order_handler)),
      )
      .service(
        web::scope("/seller")
          .route("/orders", web::get().to(orders::seller_list_orders_handler))
          .route("/analytics", web::get().to(analytics::seller_analytics_handler)),
      )
      .service(
        web::scope("/admin")
          .route("/users", web::get().to(users::admin_list_users_handler))
          .route("/users/{id}/active", web::patch().to(users::admin_set_user_active_handler))
          .route("/orders", web::get().to(orders::admin_list_orders_handler))
          .route("/orders/{id}/status", web::patch().to(orders::admin_update_status_handler))
          .route("/coupons", web::get().to(promotions::list_coupons_handler))
          .route("/coupons", web::post().to(promotions::create_coupon_handler))
          .route("/coupons/{id}/active", web::patch().to(promotions::set_coupon_active_handler))
          .route("/offers", web::get().to(promotions::admin_list_offers_handler))
          .route("/offers", web::post().to(promotions::create_offer_handler))
          .route("/offers/{id}/deactivate", web::post().to(promotions::deactivate_offer_handler))
          .route("/banners", web::get().to(promotions::admin_list_banners_handler))
          .route("/banners", web::post().to(promotions::create_banner_handler))
          .route("/banners/{id}", web::delete().to(promotions::delete_banner_handler))
          .route("/analytics", web::get().to(analytics::admin_analytics_handler)),
      ),
  );
}
