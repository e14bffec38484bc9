// src/models/course.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Course {
  pub id: Uuid,
  pub title: String,
  pub description: String,
  pub instructor: String,
  /// Catalog price in major currency units.
  pub price: i64,
  /// Current promotional price, if any. Takes precedence over `price` when
  /// resolving what a buyer pays.
  pub discounted_price: Option<i64>,
  pub category: String,
  pub level: String,
  pub duration: String,
  pub language: String,
  pub thumbnail_url: String,
  pub video_url: String,
  pub is_published: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Course {
  /// The price a buyer pays today: the discount when one is active, the list
  /// price otherwise.
  pub fn effective_price(&self) -> i64 {
    self.discounted_price.unwrap_or(self.price)
  }

  pub fn is_free(&self) -> bool {
    self.effective_price() == 0
  }
}
