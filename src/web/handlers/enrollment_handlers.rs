// src/web/handlers/enrollment_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::FromRow;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Course, Enrollment, EnrollmentKind};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
  pub course_id: Uuid,
}

#[derive(Debug, FromRow, serde::Serialize)]
pub struct EnrollmentEntry {
  #[sqlx(flatten)]
  pub course: Course,
  pub kind: EnrollmentKind,
  #[serde(rename = "enrolledAt")]
  pub enrolled_at: DateTime<Utc>,
}

/// Explicit enrollment is only for free courses; paid access arrives through
/// a completed order.
#[instrument(
    name = "handler::enroll",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.id(), course_id = %req_payload.course_id)
)]
pub async fn enroll_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<EnrollRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let course_id = req_payload.course_id;

  let course: Option<Course> = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
    .bind(course_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let course = course.ok_or_else(|| AppError::NotFound(format!("Course with ID {} not found.", course_id)))?;

  if !course.is_free() {
    return Err(AppError::Validation(
      "Course requires purchase; add it to your cart instead.".to_string(),
    ));
  }

  let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM enrollments WHERE user_id = $1 AND course_id = $2")
    .bind(auth_user.id())
    .bind(course_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  if existing.is_some() {
    return Err(AppError::Validation("Already enrolled in this course".to_string()));
  }

  let enrollment: Enrollment =
    sqlx::query_as("INSERT INTO enrollments (user_id, course_id, kind) VALUES ($1, $2, 'free') RETURNING *")
      .bind(auth_user.id())
      .bind(course_id)
      .fetch_one(&app_state.db_pool)
      .await?;

  info!("User enrolled in free course.");
  Ok(HttpResponse::Created().json(json!({
      "message": "Enrolled successfully",
      "enrollment": enrollment
  })))
}

#[instrument(name = "handler::my_enrollments", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn my_enrollments_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let enrollments: Vec<EnrollmentEntry> = sqlx::query_as(
    "SELECT c.*, e.kind, e.enrolled_at FROM enrollments e JOIN courses c ON c.id = e.course_id \
     WHERE e.user_id = $1 ORDER BY e.enrolled_at DESC",
  )
  .bind(auth_user.id())
  .fetch_all(&app_state.db_pool)
  .await?;

  Ok(HttpResponse::Ok().json(json!({ "enrollments": enrollments })))
}
