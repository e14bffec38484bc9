// src/models/enrollment.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, SqlxType)]
#[sqlx(type_name = "enrollment_kind_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentKind {
  Free,
  Purchased,
}

/// Grant of a user's access to a course, independent of any order record.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Enrollment {
  pub id: Uuid,
  pub user_id: Uuid,
  pub course_id: Uuid,
  pub kind: EnrollmentKind,
  pub enrolled_at: DateTime<Utc>,
}
