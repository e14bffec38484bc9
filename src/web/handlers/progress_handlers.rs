// src/web/handlers/progress_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::progress::{is_completed, watch_percentage};
use crate::models::{Course, Progress};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgressRequest {
  pub course_id: Uuid,
  pub current_time: f64,
  pub duration: f64,
}

#[instrument(
    name = "handler::save_progress",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.id(), course_id = %req_payload.course_id)
)]
pub async fn save_progress_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SaveProgressRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if payload.duration <= 0.0 {
    return Err(AppError::Validation("Duration must be a positive number.".to_string()));
  }
  if payload.current_time < 0.0 {
    return Err(AppError::Validation("Current time cannot be negative.".to_string()));
  }

  let percentage = watch_percentage(payload.current_time, payload.duration);
  let completed = is_completed(percentage);

  // Watching a free course auto-enrolls the viewer.
  let course: Option<Course> = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
    .bind(payload.course_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let course = course.ok_or_else(|| AppError::NotFound(format!("Course with ID {} not found.", payload.course_id)))?;
  if course.is_free() && payload.current_time > 0.0 {
    sqlx::query(
      "INSERT INTO enrollments (user_id, course_id, kind) VALUES ($1, $2, 'free') \
       ON CONFLICT (user_id, course_id) DO NOTHING",
    )
    .bind(auth_user.id())
    .bind(course.id)
    .execute(&app_state.db_pool)
    .await?;
  }

  let progress: Progress = sqlx::query_as(
    "INSERT INTO progress (user_id, course_id, position_seconds, duration_seconds, percentage, completed, last_watched_at) \
     VALUES ($1, $2, $3, $4, $5, $6, NOW()) \
     ON CONFLICT (user_id, course_id) DO UPDATE \
       SET position_seconds = EXCLUDED.position_seconds, \
           duration_seconds = EXCLUDED.duration_seconds, \
           percentage = EXCLUDED.percentage, \
           completed = EXCLUDED.completed, \
           last_watched_at = NOW() \
     RETURNING *",
  )
  .bind(auth_user.id())
  .bind(course.id)
  .bind(payload.current_time)
  .bind(payload.duration)
  .bind(percentage)
  .bind(completed)
  .fetch_one(&app_state.db_pool)
  .await?;

  info!(percentage, completed, "Progress saved");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Progress saved successfully",
      "progress": {
          "currentTime": progress.position_seconds,
          "duration": progress.duration_seconds,
          "percentage": progress.percentage,
          "isCompleted": progress.completed
      }
  })))
}

#[instrument(
    name = "handler::get_progress",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.id(), course_id = %path.as_ref())
)]
pub async fn get_progress_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let course_id = path.into_inner();

  let progress: Option<Progress> = sqlx::query_as("SELECT * FROM progress WHERE user_id = $1 AND course_id = $2")
    .bind(auth_user.id())
    .bind(course_id)
    .fetch_optional(&app_state.db_pool)
    .await?;

  match progress {
    Some(progress) => Ok(HttpResponse::Ok().json(json!({
        "progress": {
            "currentTime": progress.position_seconds,
            "duration": progress.duration_seconds,
            "percentage": progress.percentage,
            "isCompleted": progress.completed
        }
    }))),
    None => Ok(HttpResponse::Ok().json(json!({
        "progress": { "currentTime": 0.0, "duration": 0.0, "percentage": 0, "isCompleted": false }
    }))),
  }
}
