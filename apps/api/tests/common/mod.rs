// snapcart/apps/api/tests/common/mod.rs
#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::test;
use once_cell::sync::Lazy;
use serde_json::Value;
use snapcart_api::config::AppConfig;
use snapcart_api::models::address::NewAddress;
use snapcart_api::models::coupon::NewCoupon;
use snapcart_api::models::product::{NewProduct, NewVariant};
use snapcart_api::models::user::NewUser;
use snapcart_api::models::{Address, Category, Coupon, DiscountType, ProductWithVariants, Role, User};
use snapcart_api::repository::{MemoryStore, Repositories};
use snapcart_api::services::notifier::LogNotifier;
use snapcart_api::services::payment_gateway::LocalGateway;
use snapcart_api::AppState;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// Builds the full route table over `$state`.
macro_rules! init_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .app_data(snapcart_api::web::json_config())
        .configure(snapcart_api::web::configure_app_routes),
    )
    .await
  };
}

/// Sends a `TestRequest` and returns `(status, json body)`.
macro_rules! send {
  ($app:expr, $req:expr) => {
    crate::common::json_of(actix_web::test::call_service(&$app, $req.to_request()).await).await
  };
}

pub async fn json_of<B: MessageBody>(resp: ServiceResponse<B>) -> (StatusCode, Value) {
  let status = resp.status();
  let bytes = test::read_body(resp).await;
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).expect("response body is json")
  };
  (status, body)
}

pub struct Harness {
  pub state: AppState,
  pub notifier: Arc<LogNotifier>,
  pub gateway: LocalGateway,
}

pub fn harness() -> Harness {
  setup_tracing();
  let config = AppConfig::for_tests();
  let gateway = LocalGateway::from_config(&config);
  let (state, notifier) = AppState::in_memory(config);
  Harness { state, notifier, gateway }
}

/// Same as `harness` but every email send fails.
pub fn harness_with_failing_email() -> Harness {
  setup_tracing();
  let config = AppConfig::for_tests();
  let gateway = LocalGateway::from_config(&config);
  let notifier = Arc::new(LogNotifier::failing_email(config.mail_sender.clone()));
  let payments = Arc::new(LocalGateway::from_config(&config));
  let repos = Repositories::from_store(Arc::new(MemoryStore::new()));
  let state = AppState::build(config, repos, payments, notifier.clone());
  Harness { state, notifier, gateway }
}

pub fn bearer(token: &str) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token))
}

impl Harness {
  /// Creates a password-less user directly in the store and returns an access token.
  pub async fn user(&self, role: Role, email: &str) -> (User, String) {
    let user = self
      .state
      .repos
      .users
      .create_user(NewUser {
        role,
        name: format!("{} user", role.as_str()),
        email: Some(email.to_string()),
        phone: None,
        password_hash: None,
        store_name: (role == Role::Seller).then(|| "Test Store".to_string()),
      })
      .await
      .expect("create user");
    let tokens = self.state.tokens.issue_pair(&user).expect("issue tokens");
    (user, tokens.access_token)
  }

  pub async fn category(&self, name: &str) -> Category {
    let slug = snapcart_api::models::category::slugify(name);
    self
      .state
      .repos
      .catalog
      .create_category(name, &slug, None)
      .await
      .expect("create category")
  }

  pub async fn product(&self, seller_id: Uuid, category_id: Uuid, name: &str, price_paise: i64, stock: i32) -> ProductWithVariants {
    self
      .state
      .repos
      .catalog
      .create_product(NewProduct {
        seller_id,
        category_id,
        name: name.to_string(),
        description: None,
        price_paise,
        stock,
        image_url: None,
        variants: Vec::new(),
      })
      .await
      .expect("create product")
  }

  pub async fn product_with_variants(
    &self,
    seller_id: Uuid,
    category_id: Uuid,
    name: &str,
    variants: &[(&str, i64, i32)],
  ) -> ProductWithVariants {
    self
      .state
      .repos
      .catalog
      .create_product(NewProduct {
        seller_id,
        category_id,
        name: name.to_string(),
        description: None,
        price_paise: variants.first().map(|v| v.1).unwrap_or(0),
        stock: 0,
        image_url: None,
        variants: variants
          .iter()
          .map(|(label, price_paise, stock)| NewVariant {
            sku: format!("SKU-{}", label),
            label: label.to_string(),
            price_paise: *price_paise,
            stock: *stock,
          })
          .collect(),
      })
      .await
      .expect("create product")
  }

  pub async fn address(&self, user_id: Uuid) -> Address {
    self
      .state
      .repos
      .users
      .add_address(
        user_id,
        NewAddress {
          full_name: "Asha Rao".to_string(),
          phone: "9876543210".to_string(),
          line1: "12 MG Road".to_string(),
          line2: None,
          city: "Bengaluru".to_string(),
          state: "Karnataka".to_string(),
          postal_code: "560001".to_string(),
        },
      )
      .await
      .expect("add address")
  }

  pub async fn percent_coupon(&self, code: &str, percent: i64, min_order_paise: i64, per_user_limit: Option<i32>) -> Coupon {
    self
      .state
      .repos
      .promotions
      .create_coupon(NewCoupon {
        code: code.to_string(),
        description: None,
        discount_type: DiscountType::Percentage,
        value: percent,
        max_discount_paise: None,
        min_order_paise,
        usage_limit: None,
        per_user_limit,
        starts_at: None,
        ends_at: None,
      })
      .await
      .expect("create coupon")
  }

  /// Current stock of a simple (variant-less) product.
  pub async fn stock_of(&self, product_id: Uuid) -> i32 {
    self
      .state
      .repos
      .catalog
      .find_product(product_id)
      .await
      .expect("find product")
      .expect("product exists")
      .product
      .stock
  }
}
