// snapcart/apps/api/src/web/mod.rs

pub mod cookies;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use routes::configure_app_routes;

use crate::errors::AppError;
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest};

/// Malformed JSON bodies answer with the same `{"error": ...}` shape as every other 400.
pub fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err: JsonPayloadError, _req: &HttpRequest| {
    AppError::Validation(format!("Invalid request body: {}", err)).into()
  })
}
