// snapcart/apps/api/src/services/payment_gateway.rs

//! Razorpay-style payment seam: the server creates a gateway order, the client
//! pays and returns `(order_id, payment_id, signature)`, and the server checks
//! the signature before marking the order paid.

use crate::config::AppConfig;
use crate::errors::AppError;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GatewayOrder {
  pub id: String,
  pub amount_paise: i64,
  pub currency: String,
  pub receipt: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Public key handed to the client-side checkout widget.
  fn key_id(&self) -> &str;

  async fn create_order(&self, receipt: &str, amount_paise: i64, currency: &str) -> Result<GatewayOrder, AppError>;

  fn verify_signature(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool;
}

const KEY_CONTEXT: &str = "snapcart 2024-06 payment signature";

/// In-process gateway. Order ids are derived from the receipt and signatures
/// are BLAKE3 keyed hashes of `"{order_id}|{payment_id}"`, so a client holding
/// the secret (tests, local demos) can produce valid signatures.
pub struct LocalGateway {
  key_id: String,
  key: [u8; 32],
}

impl LocalGateway {
  pub fn new(key_id: &str, key_secret: &str) -> Self {
    Self {
      key_id: key_id.to_string(),
      key: blake3::derive_key(KEY_CONTEXT, key_secret.as_bytes()),
    }
  }

  pub fn from_config(config: &AppConfig) -> Self {
    Self::new(&config.razorpay_key_id, &config.razorpay_key_secret)
  }

  fn mac(&self, gateway_order_id: &str, payment_id: &str) -> blake3::Hash {
    blake3::keyed_hash(&self.key, format!("{}|{}", gateway_order_id, payment_id).as_bytes())
  }

  /// Hex signature the gateway would send back for a successful payment.
  pub fn sign(&self, gateway_order_id: &str, payment_id: &str) -> String {
    self.mac(gateway_order_id, payment_id).to_hex().to_string()
  }
}

#[async_trait]
impl PaymentGateway for LocalGateway {
  fn key_id(&self) -> &str {
    &self.key_id
  }

  #[instrument(name = "LocalGateway::create_order", skip(self), err(Display))]
  async fn create_order(&self, receipt: &str, amount_paise: i64, currency: &str) -> Result<GatewayOrder, AppError> {
    if amount_paise <= 0 {
      return Err(AppError::Payment("Amount must be positive for online payment.".to_string()));
    }
    let digest = blake3::keyed_hash(&self.key, receipt.as_bytes()).to_hex();
    let order = GatewayOrder {
      id: format!("order_{}", &digest.as_str()[..14]),
      amount_paise,
      currency: currency.to_string(),
      receipt: receipt.to_string(),
    };
    info!(gateway_order_id = %order.id, "Gateway order created.");
    Ok(order)
  }

  fn verify_signature(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
    match blake3::Hash::from_hex(signature.trim()) {
      Ok(provided) => provided == self.mac(gateway_order_id, payment_id),
      Err(_) => false,
    }
  }
}
