// snapcart/apps/api/src/seed.rs

//! Demo data for local runs: an admin, a seller, a few categories and products,
//! a welcome coupon and a banner. Skipped when the admin already exists.

use crate::errors::Result;
use crate::models::banner::NewBanner;
use crate::models::category::slugify;
use crate::models::coupon::NewCoupon;
use crate::models::product::{NewProduct, NewVariant};
use crate::models::user::NewUser;
use crate::models::{DiscountType, Role};
use crate::services::auth_service;
use crate::state::AppState;
use tracing::{info, instrument};

#[instrument(name = "seed::seed_demo_data", skip_all, err(Display))]
pub async fn seed_demo_data(app_state: &AppState) -> Result<()> {
  let repos = &app_state.repos;
  let config = &app_state.config;

  let admin_email = auth_service::normalize_email(&config.seed_admin_email)?;
  if repos.users.find_user_by_email(&admin_email).await?.is_some() {
    info!("Seed data already present, skipping.");
    return Ok(());
  }

  repos
    .users
    .create_user(NewUser {
      role: Role::Admin,
      name: "Snapcart Admin".to_string(),
      email: Some(admin_email),
      phone: None,
      password_hash: Some(auth_service::hash_password(&config.seed_admin_password)?),
      store_name: None,
    })
    .await?;

  let seller = repos
    .users
    .create_user(NewUser {
      role: Role::Seller,
      name: "Demo Seller".to_string(),
      email: Some("seller@snapcart.local".to_string()),
      phone: None,
      password_hash: Some(auth_service::hash_password(&config.seed_admin_password)?),
      store_name: Some("Demo Store".to_string()),
    })
    .await?;

  let kitchen = repos
    .catalog
    .create_category("Kitchen", &slugify("Kitchen"), Some("Cookware and appliances".to_string()))
    .await?;
  let apparel = repos
    .catalog
    .create_category("Apparel", &slugify("Apparel"), None)
    .await?;

  repos
    .catalog
    .create_product(NewProduct {
      seller_id: seller.id,
      category_id: kitchen.id,
      name: "Steel Kettle".to_string(),
      description: Some("1.5 litre stainless steel kettle".to_string()),
      price_paise: 129_900,
      stock: 25,
      image_url: None,
      variants: vec![],
    })
    .await?;
  repos
    .catalog
    .create_product(NewProduct {
      seller_id: seller.id,
      category_id: apparel.id,
      name: "Cotton T-Shirt".to_string(),
      description: None,
      price_paise: 49_900,
      stock: 0,
      image_url: None,
      variants: ["S", "M", "L"]
        .into_iter()
        .map(|size| NewVariant {
          sku: format!("TSHIRT-{}", size),
          label: size.to_string(),
          price_paise: 49_900,
          stock: 40,
        })
        .collect(),
    })
    .await?;

  repos
    .promotions
    .create_coupon(NewCoupon {
      code: "WELCOME10".to_string(),
      description: Some("10% off your first order".to_string()),
      discount_type: DiscountType::Percentage,
      value: 10,
      max_discount_paise: Some(20_000),
      min_order_paise: 49_900,
      usage_limit: None,
      per_user_limit: Some(1),
      starts_at: None,
      ends_at: None,
    })
    .await?;
  repos
    .promotions
    .create_banner(NewBanner {
      title: "Monsoon sale".to_string(),
      image_url: "https://cdn.snapcart.local/banners/monsoon.jpg".to_string(),
      link_url: Some("/offers".to_string()),
      position: 0,
    })
    .await?;

  info!("Demo data seeded.");
  Ok(())
}
