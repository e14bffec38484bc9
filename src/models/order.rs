// src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Card,
  Upi,
  Netbanking,
  Wallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Processing,
  Completed,
  Failed,
  Refunded,
}

impl PaymentStatus {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "pending" => Some(PaymentStatus::Pending),
      "processing" => Some(PaymentStatus::Processing),
      "completed" => Some(PaymentStatus::Completed),
      "failed" => Some(PaymentStatus::Failed),
      "refunded" => Some(PaymentStatus::Refunded),
      _ => None,
    }
  }
}

/// Fulfillment lifecycle, distinct from the payment status. Admin-driven past
/// `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
  Refunded,
}

impl OrderStatus {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "pending" => Some(OrderStatus::Pending),
      "confirmed" => Some(OrderStatus::Confirmed),
      "processing" => Some(OrderStatus::Processing),
      "shipped" => Some(OrderStatus::Shipped),
      "delivered" => Some(OrderStatus::Delivered),
      "cancelled" => Some(OrderStatus::Cancelled),
      "refunded" => Some(OrderStatus::Refunded),
      _ => None,
    }
  }
}

/// Shipping/contact snapshot captured at order creation. Every field is
/// required; validation names the first missing one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  pub phone: String,
  pub address: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
}

/// The central purchase record. Pricing and customer info are snapshots taken
/// at creation; once `payment_status` reaches `Completed` the row and its
/// items are never mutated except for fulfillment status.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub order_number: String,
  pub user_id: Uuid,

  pub customer_email: String,
  pub customer_first_name: String,
  pub customer_last_name: String,
  pub customer_phone: String,
  pub customer_address: String,
  pub customer_city: String,
  pub customer_state: String,
  pub customer_pincode: String,

  pub payment_method: PaymentMethod,
  pub payment_status: PaymentStatus,
  pub checkout_session_id: Option<String>,
  pub payment_intent_id: Option<String>,
  pub transaction_id: Option<String>,
  pub paid_at: Option<DateTime<Utc>>,
  pub failure_reason: Option<String>,

  pub subtotal: i64,
  pub shipping: i64,
  pub tax: i64,
  pub total: i64,

  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
  pub cancelled_at: Option<DateTime<Utc>>,
  pub notes: Option<String>,
}

/// Append-only audit row for admin-driven status transitions.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StatusHistoryEntry {
  pub id: Uuid,
  pub order_id: Uuid,
  pub status: OrderStatus,
  pub notes: String,
  pub changed_by: Uuid,
  pub changed_at: DateTime<Utc>,
}
