// src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("{field} is required")]
  MissingField { field: String },

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  // State-conflict: the operation is well-formed but the order is in the
  // wrong state for it (re-paying an in-flight order, cancelling a paid one).
  #[error("Invalid State: {0}")]
  State(String),

  // Payment was attempted and the gateway reported a non-success outcome.
  // Carries enough detail for the client to show a retry path.
  #[error("Payment not completed (status: {status})")]
  PaymentFailed {
    status: String,
    reason: Option<String>,
  },

  // The gateway itself misbehaved (network, auth, 5xx). Original message is
  // logged, never sent to the client.
  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Email Error: {0}")]
  Email(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience
// in code that uses `?` on functions returning anyhow::Result.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      return AppError::Sqlx(err.downcast::<sqlx::Error>().unwrap());
    }
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::MissingField { field } => {
        HttpResponse::BadRequest().json(json!({"error": format!("{} is required", field), "field": field}))
      }
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Conflict(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::State(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::PaymentFailed { status, reason } => HttpResponse::BadRequest().json(json!({
        "error": "Payment not completed",
        "details": { "status": status, "error": reason }
      })),
      AppError::Gateway(_) => {
        HttpResponse::InternalServerError().json(json!({"error": "Could not initiate payment"}))
      }
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Email(_) => HttpResponse::InternalServerError().json(json!({"error": "Email service error"})),
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
