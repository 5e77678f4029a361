// snapcart/apps/api/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::repository::{MemoryStore, Repositories};
use crate::services::notifier::{LogNotifier, Notifier};
use crate::services::otp_service::OtpService;
use crate::services::payment_gateway::{LocalGateway, PaymentGateway};
use crate::services::token_service::TokenService;
use flow::Flows;
use std::sync::Arc;

/// Shared by every request handler and copied into every pipeline context.
#[derive(Clone)]
pub struct AppState {
  pub repos: Repositories,
  pub flows: Arc<Flows<AppError>>,
  pub config: Arc<AppConfig>,
  pub tokens: Arc<TokenService>,
  pub otp: Arc<OtpService>,
  pub payments: Arc<dyn PaymentGateway>,
  pub notifier: Arc<dyn Notifier>,
}

impl AppState {
  /// Wires services from `config` and registers every pipeline.
  pub fn build(
    config: AppConfig,
    repos: Repositories,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
  ) -> Self {
    let state = AppState {
      repos,
      flows: Arc::new(Flows::<AppError>::new()),
      tokens: Arc::new(TokenService::from_config(&config)),
      otp: Arc::new(OtpService::from_config(&config)),
      config: Arc::new(config),
      payments,
      notifier,
    };
    pipelines::register_all_pipelines(&state.flows, &state);
    state
  }

  /// In-memory store, local gateway and logging notifier. The notifier is
  /// returned as well so callers can read what was sent.
  pub fn in_memory(config: AppConfig) -> (Self, Arc<LogNotifier>) {
    let notifier = Arc::new(LogNotifier::new(config.mail_sender.clone()));
    let payments = Arc::new(LocalGateway::from_config(&config));
    let repos = Repositories::from_store(Arc::new(MemoryStore::new()));
    (Self::build(config, repos, payments, notifier.clone()), notifier)
  }
}
