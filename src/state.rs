// src/state.rs

use crate::config::AppConfig;
use crate::services::gateway::PaymentGateway;
use crate::services::notifications::Mailer;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared per-process state. The gateway and mailer clients are constructed
/// once at startup and injected here rather than reached through ambient
/// globals; everything else a request needs flows from this struct.
#[derive(Clone)]
pub struct AppState {
  pub db_pool: PgPool,
  pub config: Arc<AppConfig>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub mailer: Arc<dyn Mailer>,
}
