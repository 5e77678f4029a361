// snapcart/apps/api/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Where repositories keep their data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  Postgres,
  Memory,
}

impl FromStr for StorageBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "postgres" | "pg" => Ok(StorageBackend::Postgres),
      "memory" | "mem" => Ok(StorageBackend::Memory),
      other => Err(AppError::Config(format!("Unknown STORAGE_BACKEND '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub storage_backend: StorageBackend,
  pub database_url: Option<String>,
  pub log_format: LogFormat,

  pub jwt_secret: String,
  pub access_token_ttl_secs: i64,
  pub refresh_token_ttl_secs: i64,
  /// Adds the `Secure` attribute to auth cookies.
  pub secure_cookies: bool,
  pub otp_ttl_secs: i64,

  pub currency: String,
  pub shipping_fee_paise: i64,
  pub free_shipping_threshold_paise: i64,

  pub razorpay_key_id: String,
  pub razorpay_key_secret: String,

  pub mail_sender: String,

  pub seed_db: bool,
  /// Admin account created by seeding when no user has that email.
  pub seed_admin_email: String,
  pub seed_admin_password: String,
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  let raw = env::var(name).unwrap_or_else(|_| default.to_string());
  raw
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", name, raw, e)))
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let storage_backend = parse_var::<StorageBackend>("STORAGE_BACKEND", "postgres")?;
    let database_url = env::var("DATABASE_URL").ok();
    if storage_backend == StorageBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "Missing environment variable 'DATABASE_URL' (or set STORAGE_BACKEND=memory)".to_string(),
      ));
    }

    let jwt_secret = env::var("JWT_SECRET")
      .map_err(|e| AppError::Config(format!("Missing environment variable 'JWT_SECRET': {}", e)))?;
    if jwt_secret.len() < 16 {
      return Err(AppError::Config("JWT_SECRET must be at least 16 characters".to_string()));
    }

    let log_format = match env::var("LOG_FORMAT").unwrap_or_default().to_ascii_lowercase().as_str() {
      "json" => LogFormat::Json,
      _ => LogFormat::Pretty,
    };

    let config = Self {
      server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
      server_port: parse_var("SERVER_PORT", "8080")?,
      storage_backend,
      database_url,
      log_format,
      jwt_secret,
      access_token_ttl_secs: parse_var("ACCESS_TOKEN_TTL_SECS", "900")?,
      refresh_token_ttl_secs: parse_var("REFRESH_TOKEN_TTL_SECS", "604800")?,
      secure_cookies: parse_var("SECURE_COOKIES", "false")?,
      otp_ttl_secs: parse_var("OTP_TTL_SECS", "300")?,
      currency: env::var("CURRENCY").unwrap_or_else(|_| "INR".to_string()),
      shipping_fee_paise: parse_var("SHIPPING_FEE_PAISE", "4900")?,
      free_shipping_threshold_paise: parse_var("FREE_SHIPPING_THRESHOLD_PAISE", "49900")?,
      razorpay_key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_else(|_| "rzp_test_snapcart".to_string()),
      razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET").unwrap_or_else(|_| "rzp_test_secret".to_string()),
      mail_sender: env::var("MAIL_SENDER").unwrap_or_else(|_| "noreply@snapcart.local".to_string()),
      seed_db: parse_var("SEED_DB", "false")?,
      seed_admin_email: env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@snapcart.local".to_string()),
      seed_admin_password: env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "change-me-admin".to_string()),
    };

    tracing::info!(
      backend = ?config.storage_backend,
      port = config.server_port,
      currency = %config.currency,
      "Application configuration loaded."
    );
    Ok(config)
  }

  /// Defaults used by tests and local demos. Never reads the environment.
  pub fn for_tests() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      storage_backend: StorageBackend::Memory,
      database_url: None,
      log_format: LogFormat::Pretty,
      jwt_secret: "test-secret-with-enough-length".to_string(),
      access_token_ttl_secs: 900,
      refresh_token_ttl_secs: 604_800,
      secure_cookies: false,
      otp_ttl_secs: 300,
      currency: "INR".to_string(),
      shipping_fee_paise: 4_900,
      free_shipping_threshold_paise: 49_900,
      razorpay_key_id: "rzp_test_snapcart".to_string(),
      razorpay_key_secret: "rzp_test_secret".to_string(),
      mail_sender: "noreply@snapcart.local".to_string(),
      seed_db: false,
      seed_admin_email: "admin@snapcart.local".to_string(),
      seed_admin_password: "admin-password".to_string(),
    }
  }
}
