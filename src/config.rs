// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Pricing schedule applied at order creation. The defaults are policy, not
/// incidental: free shipping above 50000, flat 500 fee below, 18% tax.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
  pub free_shipping_threshold: i64,
  pub shipping_fee: i64,
  pub tax_rate: f64,
}

impl Default for PricingPolicy {
  fn default() -> Self {
    Self {
      free_shipping_threshold: 50_000,
      shipping_fee: 500,
      tax_rate: 0.18,
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub app_base_url: String,
  pub frontend_url: String,

  pub currency: String,
  pub email_sender: String,
  pub email_sender_name: String,

  pub session_ttl_hours: i64,
  pub checkout_session_ttl_minutes: i64,
  pub welcome_email_delay_secs: u64,

  pub pricing: PricingPolicy,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let app_base_url = get_env("APP_BASE_URL").unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));
    let frontend_url = get_env("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let currency = get_env("CURRENCY").unwrap_or_else(|_| "inr".to_string());
    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|_| "noreply@learncart.example".to_string());
    let email_sender_name = get_env("EMAIL_SENDER_NAME").unwrap_or_else(|_| "LearnCart".to_string());

    let session_ttl_hours = parse_env("SESSION_TTL_HOURS", 72)?;
    let checkout_session_ttl_minutes = parse_env("CHECKOUT_SESSION_TTL_MINUTES", 30)?;
    let welcome_email_delay_secs = parse_env("WELCOME_EMAIL_DELAY_SECS", 5)?;

    let pricing = PricingPolicy {
      free_shipping_threshold: parse_env("FREE_SHIPPING_THRESHOLD", PricingPolicy::default().free_shipping_threshold)?,
      shipping_fee: parse_env("SHIPPING_FEE", PricingPolicy::default().shipping_fee)?,
      tax_rate: parse_env("TAX_RATE", PricingPolicy::default().tax_rate)?,
    };

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      app_base_url,
      frontend_url,
      currency,
      email_sender,
      email_sender_name,
      session_ttl_hours,
      checkout_session_ttl_minutes,
      welcome_email_delay_secs,
      pricing,
    })
  }
}

fn parse_env<T: std::str::FromStr>(var_name: &str, default: T) -> Result<T>
where
  T::Err: std::fmt::Display,
{
  match env::var(var_name) {
    Ok(raw) => raw
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
    Err(_) => Ok(default),
  }
}
