// src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Immutable line item: the unit price is copied from the catalog (or the
/// verified buy-now price) at order creation and never re-derived.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub course_id: Uuid,
  pub price: i64,
  pub quantity: i32,
}
