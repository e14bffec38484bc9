// src/main.rs

mod config;
mod errors;
mod models;
mod services;
mod state;
mod web;

use crate::config::AppConfig;
use crate::services::gateway::{PaymentGateway, SimulatedGateway};
use crate::services::notifications::{LogMailer, Mailer};
use crate::state::AppState;
use crate::web::routes;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting learncart server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };

  // Gateway and mailer are built once here and injected; nothing downstream
  // reconfigures them per call.
  let gateway: Arc<dyn PaymentGateway> = Arc::new(SimulatedGateway::new(app_config.app_base_url.clone()));
  let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

  let app_state = AppState {
    db_pool,
    config: app_config.clone(),
    gateway,
    mailer,
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(routes::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
