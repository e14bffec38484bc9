// src/web/extractors.rs

//! Request extractors for authenticated identities, backed by the sessions
//! table.

use crate::errors::AppError;
use crate::models::{User, UserRole};
use crate::services::auth;
use crate::state::AppState;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;
use uuid::Uuid;

fn bearer_token(req: &HttpRequest) -> Option<String> {
  req
    .headers()
    .get("Authorization")
    .and_then(|h| h.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(str::to_string)
}

/// The signed-in user behind the request's bearer token.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user: User,
}

impl AuthenticatedUser {
  pub fn id(&self) -> Uuid {
    self.user.id
  }

  async fn resolve(req: HttpRequest) -> Result<Self, AppError> {
    let state = req
      .app_data::<web::Data<AppState>>()
      .ok_or_else(|| AppError::Internal("Application state is not configured.".to_string()))?
      .clone();

    let token = bearer_token(&req).ok_or_else(|| {
      warn!("Missing or malformed Authorization header.");
      AppError::Auth("User authentication required.".to_string())
    })?;

    let user = auth::find_session_user(&state.db_pool, &token).await?;
    Ok(AuthenticatedUser { user })
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(AuthenticatedUser::resolve(req))
  }
}

/// An authenticated user with the admin role.
#[derive(Debug)]
pub struct AdminUser {
  pub user: User,
}

impl AdminUser {
  pub fn id(&self) -> Uuid {
    self.user.id
  }
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move {
      let authenticated = AuthenticatedUser::resolve(req).await?;
      if authenticated.user.role != UserRole::Admin {
        warn!(user_id = %authenticated.user.id, "Non-admin user attempted an admin operation.");
        return Err(AppError::Auth("Admin access required.".to_string()));
      }
      Ok(AdminUser { user: authenticated.user })
    })
  }
}
