// src/services/auth.rs

//! Password hashing/verification and bearer-session management.

use crate::errors::{AppError, Result};
use crate::models::{Session, User};
use argon2::{
  password_hash::{
    rand_core::OsRng, // For generating random salts
    PasswordHash,
    PasswordHasher,
    PasswordVerifier,
    SaltString,
  },
  Argon2,
};
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// Hashes a plain-text password using Argon2.
#[instrument(name = "auth::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  debug!("Attempting to hash password.");
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  let argon2_hasher = Argon2::default();

  match argon2_hasher.hash_password(password.as_bytes(), &salt) {
    Ok(password_hash_obj) => Ok(password_hash_obj.to_string()),
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// Verifies a plain-text password against a stored Argon2 hash.
#[instrument(name = "auth::verify_password", skip(hashed_password_str, provided_password), err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool> {
  let parsed_hash = PasswordHash::new(hashed_password_str)
    .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;

  match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(e) => {
      error!(error = %e, "Password verification encountered an internal error.");
      Err(AppError::Internal(format!("Password verification failed: {}", e)))
    }
  }
}

/// Issues a fresh opaque session token for the user.
#[instrument(name = "auth::create_session", skip(pool), fields(user_id = %user_id))]
pub async fn create_session(pool: &PgPool, user_id: Uuid, ttl_hours: i64) -> Result<Session> {
  let token = format!("tok_{}", Uuid::new_v4().simple());
  let expires_at = Utc::now() + Duration::hours(ttl_hours);

  let session: Session = sqlx::query_as(
    "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, $3) \
     RETURNING token, user_id, expires_at, created_at",
  )
  .bind(&token)
  .bind(user_id)
  .bind(expires_at)
  .fetch_one(pool)
  .await?;

  Ok(session)
}

/// Resolves a bearer token to its user, rejecting unknown or expired tokens.
#[instrument(name = "auth::find_session_user", skip(pool, token))]
pub async fn find_session_user(pool: &PgPool, token: &str) -> Result<User> {
  let user: Option<User> = sqlx::query_as(
    "SELECT u.id, u.email, u.password_hash, u.first_name, u.last_name, u.role, u.created_at, u.updated_at \
     FROM sessions s JOIN users u ON u.id = s.user_id \
     WHERE s.token = $1 AND s.expires_at > NOW()",
  )
  .bind(token)
  .fetch_optional(pool)
  .await?;

  user.ok_or_else(|| AppError::Auth("Invalid or expired session token.".to_string()))
}

#[instrument(name = "auth::revoke_session", skip(pool, token))]
pub async fn revoke_session(pool: &PgPool, token: &str) -> Result<()> {
  sqlx::query("DELETE FROM sessions WHERE token = $1")
    .bind(token)
    .execute(pool)
    .await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify_roundtrip() {
    let hash = hash_password("s3cret-passw0rd").expect("hashing should succeed");
    assert!(verify_password(&hash, "s3cret-passw0rd").unwrap());
    assert!(!verify_password(&hash, "wrong-password").unwrap());
  }

  #[test]
  fn empty_password_is_rejected() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn garbage_hash_is_an_internal_error() {
    assert!(matches!(
      verify_password("not-a-phc-string", "anything"),
      Err(AppError::Internal(_))
    ));
  }
}
