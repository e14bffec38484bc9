// src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::User;
use crate::services::auth;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
  pub email: String,
  pub password: String,
  pub first_name: String,
  pub last_name: String,
}

#[derive(Deserialize, Debug)]
pub struct SigninRequest {
  pub email: String,
  pub password: String,
}

#[instrument(name = "handler::signup", skip(app_state, req_payload))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  if payload.email.trim().is_empty() {
    return Err(AppError::MissingField { field: "email".to_string() });
  }
  if payload.first_name.trim().is_empty() {
    return Err(AppError::MissingField { field: "firstName".to_string() });
  }

  let existing: Option<(uuid::Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
    .bind(&payload.email)
    .fetch_optional(&app_state.db_pool)
    .await?;
  if existing.is_some() {
    return Err(AppError::Conflict("Email already registered".to_string()));
  }

  let password_hash = auth::hash_password(&payload.password)?;

  let user: User = sqlx::query_as(
    "INSERT INTO users (email, password_hash, first_name, last_name) VALUES ($1, $2, $3, $4) RETURNING *",
  )
  .bind(&payload.email)
  .bind(&password_hash)
  .bind(&payload.first_name)
  .bind(&payload.last_name)
  .fetch_one(&app_state.db_pool)
  .await?;

  let session = auth::create_session(&app_state.db_pool, user.id, app_state.config.session_ttl_hours).await?;

  info!(user_id = %user.id, "User signed up");
  Ok(HttpResponse::Created().json(json!({
      "message": "Signup successful.",
      "token": session.token,
      "user": user
  })))
}

#[instrument(name = "handler::signin", skip(app_state, req_payload))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SigninRequest>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();

  let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
    .bind(&payload.email)
    .fetch_optional(&app_state.db_pool)
    .await?;
  let user = match user {
    Some(user) => user,
    None => {
      warn!("Signin attempt for unknown email.");
      return Err(AppError::Auth("Invalid email or password.".to_string()));
    }
  };

  if !auth::verify_password(&user.password_hash, &payload.password)? {
    warn!(user_id = %user.id, "Signin attempt with wrong password.");
    return Err(AppError::Auth("Invalid email or password.".to_string()));
  }

  let session = auth::create_session(&app_state.db_pool, user.id, app_state.config.session_ttl_hours).await?;

  info!(user_id = %user.id, "User signed in");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Signin successful.",
      "token": session.token,
      "user": user
  })))
}

#[instrument(name = "handler::signout", skip(app_state, req, auth_user), fields(user_id = %auth_user.id()))]
pub async fn signout_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  if let Some(token) = req
    .headers()
    .get("Authorization")
    .and_then(|h| h.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
  {
    auth::revoke_session(&app_state.db_pool, token).await?;
  }
  Ok(HttpResponse::Ok().json(json!({"message": "Signed out."})))
}

#[instrument(name = "handler::me", skip(auth_user), fields(user_id = %auth_user.id()))]
pub async fn me_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(json!({"user": auth_user.user})))
}
