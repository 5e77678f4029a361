// snapcart/apps/api/src/web/cookies.rs

use crate::config::AppConfig;
use crate::services::token_service::TokenPair;
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpResponseBuilder;
use chrono::Utc;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

fn auth_cookie(name: &'static str, value: String, max_age_secs: i64, config: &AppConfig) -> Cookie<'static> {
  Cookie::build(name, value)
    .path("/")
    .http_only(true)
    .secure(config.secure_cookies)
    .same_site(SameSite::Lax)
    .max_age(CookieDuration::seconds(max_age_secs.max(0)))
    .finish()
}

/// Sets both token cookies, expiring with their tokens.
pub fn set_auth_cookies(builder: &mut HttpResponseBuilder, tokens: &TokenPair, config: &AppConfig) {
  let now = Utc::now();
  builder.cookie(auth_cookie(
    ACCESS_COOKIE,
    tokens.access_token.clone(),
    (tokens.access_expires_at - now).num_seconds(),
    config,
  ));
  builder.cookie(auth_cookie(
    REFRESH_COOKIE,
    tokens.refresh_token.clone(),
    (tokens.refresh_expires_at - now).num_seconds(),
    config,
  ));
}

pub fn clear_auth_cookies(builder: &mut HttpResponseBuilder, config: &AppConfig) {
  for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
    let mut cookie = auth_cookie(name, String::new(), 0, config);
    cookie.make_removal();
    builder.cookie(cookie);
  }
}
