// src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use sqlx::FromRow;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CartItem, Course};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
  pub course_id: Uuid,
}

/// Cart entry populated with its course, shaped for the client.
#[derive(Debug, FromRow, serde::Serialize)]
pub struct CartEntry {
  #[sqlx(flatten)]
  pub course: Course,
  #[serde(rename = "addedAt")]
  pub added_at: DateTime<Utc>,
}

#[instrument(name = "handler::get_cart", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let items: Vec<CartEntry> = sqlx::query_as(
    "SELECT c.*, ci.added_at FROM cart_items ci JOIN courses c ON c.id = ci.course_id \
     WHERE ci.user_id = $1 ORDER BY ci.added_at",
  )
  .bind(auth_user.id())
  .fetch_all(&app_state.db_pool)
  .await?;

  info!("Cart items found: {}", items.len());
  Ok(HttpResponse::Ok().json(json!({ "items": items })))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.id(), course_id = %req_payload.course_id)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<AddToCartRequest>,
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

  let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM cart_items WHERE user_id = $1 AND course_id = $2")
    .bind(auth_user.id())
    .bind(course_id)
    .fetch_optional(&app_state.db_pool)
    .await?;
  if existing.is_some() {
    return Err(AppError::Conflict("Course already in cart".to_string()));
  }

  let item: CartItem = sqlx::query_as("INSERT INTO cart_items (user_id, course_id) VALUES ($1, $2) RETURNING *")
    .bind(auth_user.id())
    .bind(course_id)
    .fetch_one(&app_state.db_pool)
    .await?;

  Ok(HttpResponse::Created().json(json!({
      "message": "Course added to cart",
      "cartItem": item
  })))
}

#[instrument(
    name = "handler::remove_from_cart",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.id(), course_id = %path.as_ref())
)]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let course_id = path.into_inner();

  let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND course_id = $2")
    .bind(auth_user.id())
    .bind(course_id)
    .execute(&app_state.db_pool)
    .await?;

  if result.rows_affected() == 0 {
    warn!("Course {} was not in the cart.", course_id);
    return Err(AppError::NotFound("Course not found in cart".to_string()));
  }

  Ok(HttpResponse::Ok().json(json!({"message": "Course removed from cart"})))
}

#[instrument(name = "handler::clear_cart", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(auth_user.id())
    .execute(&app_state.db_pool)
    .await?;

  info!("Cart cleared: {} items removed.", result.rows_affected());
  Ok(HttpResponse::Ok().json(json!({"message": "Cart cleared"})))
}
