// snapcart/apps/api/src/services/token_service.rs

//! Signed access/refresh tokens.
//!
//! A token is `base64url(claims json) "." base64url(mac)` where `mac` is a
//! BLAKE3 keyed hash of the first segment. The key is derived from the
//! configured secret, so rotating the secret invalidates every token.

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{Role, User};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const KEY_CONTEXT: &str = "snapcart 2024-06 auth token mac";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
  Access,
  Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub role: Role,
  pub kind: TokenKind,
  pub iat: i64,
  pub exp: i64,
  pub jti: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
  pub access_token: String,
  pub refresh_token: String,
  pub access_expires_at: DateTime<Utc>,
  pub refresh_expires_at: DateTime<Utc>,
}

pub struct TokenService {
  key: [u8; 32],
  access_ttl: Duration,
  refresh_ttl: Duration,
}

impl TokenService {
  pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
    Self {
      key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
      access_ttl,
      refresh_ttl,
    }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(
      &config.jwt_secret,
      Duration::seconds(config.access_token_ttl_secs),
      Duration::seconds(config.refresh_token_ttl_secs),
    )
  }

  pub fn access_ttl(&self) -> Duration {
    self.access_ttl
  }

  pub fn refresh_ttl(&self) -> Duration {
    self.refresh_ttl
  }

  pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AppError> {
    self.issue_pair_at(user.id, user.role, Utc::now())
  }

  pub fn issue_pair_at(&self, user_id: Uuid, role: Role, now: DateTime<Utc>) -> Result<TokenPair, AppError> {
    let access_expires_at = now + self.access_ttl;
    let refresh_expires_at = now + self.refresh_ttl;
    Ok(TokenPair {
      access_token: self.sign(&Claims {
        sub: user_id,
        role,
        kind: TokenKind::Access,
        iat: now.timestamp(),
        exp: access_expires_at.timestamp(),
        jti: Uuid::new_v4(),
      })?,
      refresh_token: self.sign(&Claims {
        sub: user_id,
        role,
        kind: TokenKind::Refresh,
        iat: now.timestamp(),
        exp: refresh_expires_at.timestamp(),
        jti: Uuid::new_v4(),
      })?,
      access_expires_at,
      refresh_expires_at,
    })
  }

  fn mac(&self, payload: &str) -> blake3::Hash {
    blake3::keyed_hash(&self.key, payload.as_bytes())
  }

  pub fn sign(&self, claims: &Claims) -> Result<String, AppError> {
    let json = serde_json::to_vec(claims).map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))?;
    let payload = URL_SAFE_NO_PAD.encode(json);
    let mac = URL_SAFE_NO_PAD.encode(self.mac(&payload).as_bytes());
    Ok(format!("{}.{}", payload, mac))
  }

  pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
    self.verify_at(token, expected, Utc::now())
  }

  pub fn verify_at(&self, token: &str, expected: TokenKind, now: DateTime<Utc>) -> Result<Claims, AppError> {
    let invalid = || AppError::Auth("Invalid or expired token.".to_string());

    let (payload, mac_b64) = token.split_once('.').ok_or_else(invalid)?;
    let mac_bytes: [u8; 32] = URL_SAFE_NO_PAD
      .decode(mac_b64)
      .ok()
      .and_then(|bytes| bytes.try_into().ok())
      .ok_or_else(invalid)?;
    // blake3::Hash equality is constant-time.
    if self.mac(payload) != blake3::Hash::from(mac_bytes) {
      return Err(invalid());
    }

    let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
    let claims: Claims = serde_json::from_slice(&json).map_err(|_| invalid())?;
    if claims.kind != expected {
      return Err(AppError::Auth(format!(
        "Expected a {} token.",
        match expected {
          TokenKind::Access => "access",
          TokenKind::Refresh => "refresh",
        }
      )));
    }
    let expires_at = Utc.timestamp_opt(claims.exp, 0).single().ok_or_else(invalid)?;
    if now >= expires_at {
      return Err(invalid());
    }
    Ok(claims)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn service() -> TokenService {
    TokenService::new("unit-test-secret-0123456789", Duration::minutes(15), Duration::days(7))
  }

  #[test]
  fn access_token_verifies_and_carries_role() {
    let svc = service();
    let user_id = Uuid::new_v4();
    let pair = svc.issue_pair_at(user_id, Role::Seller, Utc::now()).unwrap();
    let claims = svc.verify(&pair.access_token, TokenKind::Access).unwrap();
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.role, Role::Seller);
  }

  #[test]
  fn kinds_are_not_interchangeable() {
    let svc = service();
    let pair = svc.issue_pair_at(Uuid::new_v4(), Role::Customer, Utc::now()).unwrap();
    assert!(svc.verify(&pair.refresh_token, TokenKind::Access).is_err());
    assert!(svc.verify(&pair.access_token, TokenKind::Refresh).is_err());
    assert!(svc.verify(&pair.refresh_token, TokenKind::Refresh).is_ok());
  }

  #[test]
  fn expired_tampered_and_foreign_tokens_fail() {
    let svc = service();
    let issued = Utc::now() - Duration::minutes(20);
    let pair = svc.issue_pair_at(Uuid::new_v4(), Role::Customer, issued).unwrap();
    assert!(svc.verify(&pair.access_token, TokenKind::Access).is_err());
    assert!(svc.verify(&pair.refresh_token, TokenKind::Refresh).is_ok());

    let fresh = svc.issue_pair_at(Uuid::new_v4(), Role::Customer, Utc::now()).unwrap();
    let (payload, mac) = fresh.access_token.split_once('.').unwrap();
    let forged_claims = URL_SAFE_NO_PAD.encode(
      String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap())
        .unwrap()
        .replace("customer", "admin"),
    );
    assert!(svc.verify(&format!("{}.{}", forged_claims, mac), TokenKind::Access).is_err());

    let other = TokenService::new("a-completely-different-secret", Duration::minutes(15), Duration::days(7));
    assert!(other.verify(&fresh.access_token, TokenKind::Access).is_err());
    assert!(svc.verify("garbage", TokenKind::Access).is_err());
  }
}
