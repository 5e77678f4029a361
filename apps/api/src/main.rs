// snapcart/apps/api/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use snapcart_api::config::{AppConfig, LogFormat, StorageBackend};
use snapcart_api::repository::{MemoryStore, PgStore, Repositories};
use snapcart_api::services::notifier::LogNotifier;
use snapcart_api::services::payment_gateway::LocalGateway;
use snapcart_api::state::AppState;
use snapcart_api::{seed, web};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  let app_config = match AppConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      eprintln!("Configuration error: {}", e);
      std::process::exit(1);
    }
  };
  init_tracing(app_config.log_format);
  tracing::info!("Starting Snapcart API server...");

  let repos = match (app_config.storage_backend, app_config.database_url.as_deref()) {
    (StorageBackend::Postgres, Some(url)) => match PgStore::connect(url).await {
      Ok(store) => {
        tracing::info!("Connected to the database and applied migrations.");
        Repositories::from_store(Arc::new(store))
      }
      Err(e) => {
        tracing::error!(error = %e, "Failed to connect to the database.");
        return Err(std::io::Error::other(e.to_string()));
      }
    },
    _ => {
      tracing::warn!("Using the in-memory store. Data is lost on restart.");
      Repositories::from_store(Arc::new(MemoryStore::new()))
    }
  };

  let payments = Arc::new(LocalGateway::from_config(&app_config));
  let notifier = Arc::new(LogNotifier::new(app_config.mail_sender.clone()));
  let app_state = AppState::build(app_config, repos, payments, notifier);

  if app_state.config.seed_db {
    if let Err(e) = seed::seed_demo_data(&app_state).await {
      tracing::error!(error = %e, "Failed to seed demo data.");
    }
  }

  let server_address = format!("{}:{}", app_state.config.server_host, app_state.config.server_port);
  tracing::info!("Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .app_data(web::json_config())
      .configure(web::configure_app_routes)
      .wrap(tracing_actix_web::TracingLogger::default())
  })
  .bind(&server_address)?
  .run()
  .await
}
