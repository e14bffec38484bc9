// src/web/handlers/favorite_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::FromRow;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{Course, FavoriteItem};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToFavoritesRequest {
  pub course_id: Uuid,
}

#[derive(Debug, FromRow, serde::Serialize)]
pub struct FavoriteEntry {
  #[sqlx(flatten)]
  pub course: Course,
  #[serde(rename = "addedAt")]
  pub added_at: DateTime<Utc>,
}

#[instrument(name = "handler::get_favorites", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn get_favorites_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let items: Vec<FavoriteEntry> = sqlx::query_as(
    "SELECT c.*, fi.added_at FROM favorite_items fi JOIN courses c ON c.id = fi.course_id \
     WHERE fi.user_id = $1 ORDER BY fi.added_at",
  )
  .bind(auth_user.id())
  .fetch_all(&app_state.db_pool)
  .await?;

  info!("Favorite items found: {}", items.len());
  Ok(HttpResponse::Ok().json(json!({ "items": items })))
}

#[instrument(
    name = "handler::add_to_favorites",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.id(), course_id = %req_payload.course_id)
)]
pub async fn add_to_favorites_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToFavoritesRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let course_id = req_payload.course_id;

  let course_exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM courses WHERE id = $1")
    .bind(course_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  if course_exists.is_none() {
    return Err(AppError::NotFound(format!("Course with ID {} not found.", course_id)));
  }

  let existing: Option<(Uuid,)> =
    sqlx::query_as("SELECT id FROM favorite_items WHERE user_id = $1 AND course_id = $2")
      .bind(auth_user.id())
      .bind(course_id)
      .fetch_optional(&app_state.db_pool)
      .await?;
  if existing.is_some() {
    return Err(AppError::Conflict("Course already in favorites".to_string()));
  }

  let item: FavoriteItem =
    sqlx::query_as("INSERT INTO favorite_items (user_id, course_id) VALUES ($1, $2) RETURNING *")
      .bind(auth_user.id())
      .bind(course_id)
      .fetch_one(&app_state.db_pool)
      .await?;

  Ok(HttpResponse::Created().json(json!({
      "message": "Course added to favorites",
      "favorite": item
  })))
}

#[instrument(
    name = "handler::remove_from_favorites",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.id(), course_id = %path.as_ref())
)]
pub async fn remove_from_favorites_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let course_id = path.into_inner();

  let result = sqlx::query("DELETE FROM favorite_items WHERE user_id = $1 AND course_id = $2")
    .bind(auth_user.id())
    .bind(course_id)
    .execute(&app_state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    warn!("Course {} was not in favorites.", course_id);
    return Err(AppError::NotFound("Course not found in favorites".to_string()));
  }

  Ok(HttpResponse::Ok().json(json!({"message": "Course removed from favorites"})))
}

#[instrument(name = "handler::clear_favorites", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn clear_favorites_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let result = sqlx::query("DELETE FROM favorite_items WHERE user_id = $1")
    .bind(auth_user.id())
    .execute(&app_state.db_pool)
    .await?;

  info!("Favorites cleared: {} items removed.", result.rows_affected());
  Ok(HttpResponse::Ok().json(json!({"message": "Favorites cleared"})))
}

#[instrument(
    name = "handler::favorite_status",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.id(), course_id = %path.as_ref())
)]
pub async fn favorite_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let course_id = path.into_inner();

  let existing: Option<(Uuid,)> =
    sqlx::query_as("SELECT id FROM favorite_items WHERE user_id = $1 AND course_id = $2")
      .bind(auth_user.id())
      .bind(course_id)
      .fetch_optional(&app_state.db_pool)
      .await?;

  Ok(HttpResponse::Ok().json(json!({ "isFavorite": existing.is_some() })))
}
