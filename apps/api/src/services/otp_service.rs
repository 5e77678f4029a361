// snapcart/apps/api/src/services/otp_service.rs

//! One-time codes for phone login. Codes are 4 ASCII digits; only a keyed
//! BLAKE3 hash of `phone:code` is persisted.

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::OtpSession;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

pub const OTP_LENGTH: usize = 4;
/// Failed verifications allowed before the session is burned.
pub const OTP_MAX_ATTEMPTS: i32 = 5;

const KEY_CONTEXT: &str = "snapcart 2024-06 otp code hash";

/// Trims the phone and checks it is 10 to 15 digits with an optional leading `+`.
pub fn normalize_phone(phone: &str) -> Result<String, AppError> {
  let phone = phone.trim();
  let digits = phone.strip_prefix('+').unwrap_or(phone);
  if !(10..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
    return Err(AppError::Validation("Phone number must be 10 to 15 digits.".to_string()));
  }
  Ok(phone.to_string())
}

pub fn validate_code_format(code: &str) -> Result<(), AppError> {
  if code.len() != OTP_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
    return Err(AppError::Validation(format!("OTP must be exactly {} digits.", OTP_LENGTH)));
  }
  Ok(())
}

pub fn generate_code() -> String {
  format!("{:04}", rand::random_range(0..10_000u32))
}

pub struct OtpService {
  key: [u8; 32],
  ttl: Duration,
}

impl OtpService {
  pub fn new(secret: &str, ttl: Duration) -> Self {
    Self {
      key: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
      ttl,
    }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(&config.jwt_secret, Duration::seconds(config.otp_ttl_secs))
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  fn hash(&self, phone: &str, code: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new_keyed(&self.key);
    hasher.update(phone.as_bytes());
    hasher.update(b":");
    hasher.update(code.as_bytes());
    hasher.finalize()
  }

  /// New session for `phone` holding the hash of `code`.
  pub fn new_session(&self, phone: &str, code: &str, now: DateTime<Utc>) -> OtpSession {
    OtpSession {
      id: Uuid::new_v4(),
      phone: phone.to_string(),
      code_hash: self.hash(phone, code).to_hex().to_string(),
      attempts: 0,
      expires_at: now + self.ttl,
      created_at: now,
    }
  }

  pub fn code_matches(&self, session: &OtpSession, code: &str) -> bool {
    match blake3::Hash::from_hex(&session.code_hash) {
      Ok(stored) => stored == self.hash(&session.phone, code),
      Err(_) => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn codes_are_four_digits() {
    for _ in 0..200 {
      let code = generate_code();
      assert!(validate_code_format(&code).is_ok(), "bad code {}", code);
    }
  }

  #[test]
  fn wrong_length_or_non_digits_fail_validation() {
    assert!(validate_code_format("123").is_err());
    assert!(validate_code_format("12345").is_err());
    assert!(validate_code_format("12a4").is_err());
    assert!(validate_code_format("１２３４").is_err());
    assert!(validate_code_format("0042").is_ok());
  }

  #[test]
  fn phone_rules() {
    assert_eq!(normalize_phone(" +919876543210 ").unwrap(), "+919876543210");
    assert!(normalize_phone("98765").is_err());
    assert!(normalize_phone("98765-43210").is_err());
    assert!(normalize_phone("1234567890123456").is_err());
  }

  #[test]
  fn session_stores_hash_bound_to_phone() {
    let svc = OtpService::new("unit-test-secret-0123456789", Duration::minutes(5));
    let session = svc.new_session("+919876543210", "4821", Utc::now());
    assert_ne!(session.code_hash, "4821");
    assert!(svc.code_matches(&session, "4821"));
    assert!(!svc.code_matches(&session, "4822"));

    let other_phone = OtpSession {
      phone: "+919000000000".to_string(),
      ..session.clone()
    };
    assert!(!svc.code_matches(&other_phone, "4821"));
  }
}
