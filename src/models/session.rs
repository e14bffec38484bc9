// src/models/session.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Opaque bearer session. Expiry is a data-level timestamp checked on lookup.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Session {
  pub token: String,
  pub user_id: Uuid,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
}
