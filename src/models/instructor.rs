// src/models/instructor.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Instructor {
  pub id: Uuid,
  pub name: String,
  pub bio: Option<String>,
  pub avatar_url: Option<String>,
  pub created_at: DateTime<Utc>,
}
