// src/models/progress.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Progress {
  pub id: Uuid,
  pub user_id: Uuid,
  pub course_id: Uuid,
  pub position_seconds: f64,
  pub duration_seconds: f64,
  pub percentage: i32,
  pub completed: bool,
  pub last_watched_at: DateTime<Utc>,
}

/// Watched share of the video, clamped to 100.
pub fn watch_percentage(position_seconds: f64, duration_seconds: f64) -> i32 {
  if duration_seconds <= 0.0 {
    return 0;
  }
  ((position_seconds / duration_seconds * 100.0).round() as i32).min(100)
}

/// A course counts as completed once 90% has been watched.
pub fn is_completed(percentage: i32) -> bool {
  percentage >= 90
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn percentage_is_rounded_and_clamped() {
    assert_eq!(watch_percentage(0.0, 600.0), 0);
    assert_eq!(watch_percentage(300.0, 600.0), 50);
    assert_eq!(watch_percentage(599.0, 600.0), 100);
    assert_eq!(watch_percentage(700.0, 600.0), 100);
    assert_eq!(watch_percentage(10.0, 0.0), 0);
  }

  #[test]
  fn completion_threshold_is_ninety_percent() {
    assert!(!is_completed(89));
    assert!(is_completed(90));
    assert!(is_completed(100));
  }
}
