// src/models/favorite_item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One course in a user's favorites list. `(user_id, course_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FavoriteItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub course_id: Uuid,
  pub added_at: DateTime<Utc>,
}
