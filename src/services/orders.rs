// src/services/orders.rs

//! Order assembler: turns a direct-purchase item list or the caller's cart
//! into a persisted order with an immutable pricing snapshot. Also the home
//! of the order lookup queries shared by the gateway adapter and the
//! reconciliation engine.

use crate::config::PricingPolicy;
use crate::errors::{AppError, Result};
use crate::models::{Course, CustomerInfo, Order, OrderItem, PaymentMethod, PaymentStatus};
use crate::state::AppState;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, instrument};
use uuid::Uuid;

/// One entry of a direct ("buy now") purchase. The optional price is trusted
/// when present; cart-based purchases never consult it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectItem {
  pub course_id: Uuid,
  pub price: Option<i64>,
  pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pricing {
  pub subtotal: i64,
  pub shipping: i64,
  pub tax: i64,
  pub total: i64,
}

/// Apply the pricing schedule to a subtotal. Computed exactly once per order;
/// the result is stored and never re-derived.
pub fn compute_pricing(subtotal: i64, policy: &PricingPolicy) -> Pricing {
  let shipping = if subtotal > policy.free_shipping_threshold {
    0
  } else {
    policy.shipping_fee
  };
  let tax = (subtotal as f64 * policy.tax_rate).round() as i64;
  Pricing {
    subtotal,
    shipping,
    tax,
    total: subtotal + shipping + tax,
  }
}

/// Every customer-info field is required; the error names the first missing
/// field using the wire-format (camelCase) name.
pub fn validate_customer_info(info: &CustomerInfo) -> Result<()> {
  let fields = [
    ("email", info.email.as_str()),
    ("firstName", info.first_name.as_str()),
    ("lastName", info.last_name.as_str()),
    ("phone", info.phone.as_str()),
    ("address", info.address.as_str()),
    ("city", info.city.as_str()),
    ("state", info.state.as_str()),
    ("pincode", info.pincode.as_str()),
  ];
  for (name, value) in fields {
    if value.trim().is_empty() {
      return Err(AppError::MissingField { field: name.to_string() });
    }
  }
  Ok(())
}

/// Direct purchases prefer the caller-supplied price, then the discounted
/// price, then the list price. A zero or negative caller price counts as
/// absent.
pub fn direct_purchase_price(requested: Option<i64>, course: &Course) -> i64 {
  match requested {
    Some(price) if price > 0 => price,
    _ => course.effective_price(),
  }
}

static ORDER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Human-readable order number: millisecond timestamp plus a process-local
/// sequence. Monotonic-ish and collision-free within practical load.
pub fn generate_order_number() -> String {
  let seq = ORDER_SEQ.fetch_add(1, Ordering::Relaxed) % 10_000;
  format!("ORD-{}-{:04}", chrono::Utc::now().timestamp_millis(), seq)
}

struct ItemDraft {
  course_id: Uuid,
  price: i64,
  quantity: i32,
}

/// Assemble and persist a new order in `pending`/`pending` state. Does not
/// contact the payment gateway.
#[instrument(name = "orders::create_order", skip(state, customer_info, items), fields(user_id = %user_id))]
pub async fn create_order(
  state: &AppState,
  user_id: Uuid,
  customer_info: &CustomerInfo,
  payment_method: PaymentMethod,
  items: Option<Vec<DirectItem>>,
) -> Result<(Order, Vec<OrderItem>)> {
  validate_customer_info(customer_info)?;

  let drafts = match items {
    Some(direct_items) if !direct_items.is_empty() => {
      assemble_direct_items(&state.db_pool, &direct_items).await?
    }
    _ => assemble_cart_items(&state.db_pool, user_id).await?,
  };

  if drafts.is_empty() {
    return Err(AppError::Validation("No items to process".to_string()));
  }

  let subtotal: i64 = drafts.iter().map(|d| d.price * d.quantity as i64).sum();
  let pricing = compute_pricing(subtotal, &state.config.pricing);
  let order_number = generate_order_number();

  let mut tx = state.db_pool.begin().await?;

  let order: Order = sqlx::query_as(
    "INSERT INTO orders (order_number, user_id, \
       customer_email, customer_first_name, customer_last_name, customer_phone, \
       customer_address, customer_city, customer_state, customer_pincode, \
       payment_method, payment_status, subtotal, shipping, tax, total, status) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'pending', $12, $13, $14, $15, 'pending') \
     RETURNING *",
  )
  .bind(&order_number)
  .bind(user_id)
  .bind(&customer_info.email)
  .bind(&customer_info.first_name)
  .bind(&customer_info.last_name)
  .bind(&customer_info.phone)
  .bind(&customer_info.address)
  .bind(&customer_info.city)
  .bind(&customer_info.state)
  .bind(&customer_info.pincode)
  .bind(payment_method)
  .bind(pricing.subtotal)
  .bind(pricing.shipping)
  .bind(pricing.tax)
  .bind(pricing.total)
  .fetch_one(&mut *tx)
  .await?;

  let mut order_items = Vec::with_capacity(drafts.len());
  for draft in &drafts {
    let item: OrderItem = sqlx::query_as(
      "INSERT INTO order_items (order_id, course_id, price, quantity) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(order.id)
    .bind(draft.course_id)
    .bind(draft.price)
    .bind(draft.quantity)
    .fetch_one(&mut *tx)
    .await?;
    order_items.push(item);
  }

  tx.commit().await?;

  info!(
    order_number = %order.order_number,
    item_count = order_items.len(),
    total = pricing.total,
    "Order created"
  );
  Ok((order, order_items))
}

async fn assemble_direct_items(pool: &PgPool, items: &[DirectItem]) -> Result<Vec<ItemDraft>> {
  let mut drafts = Vec::with_capacity(items.len());
  for item in items {
    let quantity = item.quantity.unwrap_or(1);
    if quantity <= 0 {
      return Err(AppError::Validation("Quantity must be a positive number.".to_string()));
    }

    let course: Option<Course> = sqlx::query_as("SELECT * FROM courses WHERE id = $1")
      .bind(item.course_id)
      .fetch_optional(pool)
      .await?;
    let course = course.ok_or_else(|| AppError::NotFound(format!("Course not found: {}", item.course_id)))?;

    drafts.push(ItemDraft {
      course_id: course.id,
      price: direct_purchase_price(item.price, &course),
      quantity,
    });
  }
  Ok(drafts)
}

/// Cart purchases always price from the catalog; caller-supplied prices are
/// never consulted on this path.
async fn assemble_cart_items(pool: &PgPool, user_id: Uuid) -> Result<Vec<ItemDraft>> {
  let rows: Vec<(Uuid, i64, Option<i64>)> = sqlx::query_as(
    "SELECT c.id, c.price, c.discounted_price \
     FROM cart_items ci JOIN courses c ON c.id = ci.course_id \
     WHERE ci.user_id = $1 ORDER BY ci.added_at",
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  if rows.is_empty() {
    return Err(AppError::Validation("Cart is empty".to_string()));
  }

  Ok(
    rows
      .into_iter()
      .map(|(course_id, price, discounted_price)| ItemDraft {
        course_id,
        price: discounted_price.unwrap_or(price),
        quantity: 1,
      })
      .collect(),
  )
}

// --- Shared order queries ---

pub async fn find_order(pool: &PgPool, order_id: Uuid) -> Result<Option<Order>> {
  let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1")
    .bind(order_id)
    .fetch_optional(pool)
    .await?;
  Ok(order)
}

pub async fn find_order_for_user(pool: &PgPool, order_id: Uuid, user_id: Uuid) -> Result<Option<Order>> {
  let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
    .bind(order_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
  Ok(order)
}

pub async fn find_order_by_session(pool: &PgPool, session_id: &str) -> Result<Option<Order>> {
  let order = sqlx::query_as("SELECT * FROM orders WHERE checkout_session_id = $1")
    .bind(session_id)
    .fetch_optional(pool)
    .await?;
  Ok(order)
}

pub async fn find_order_by_intent(pool: &PgPool, intent_id: &str, user_id: Uuid) -> Result<Option<Order>> {
  let order = sqlx::query_as("SELECT * FROM orders WHERE payment_intent_id = $1 AND user_id = $2")
    .bind(intent_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
  Ok(order)
}

/// Line item joined with its course, for checkout line items, order detail
/// responses, and confirmation emails.
#[derive(Debug, Clone, FromRow, serde::Serialize)]
pub struct PurchasedItemView {
  pub course_id: Uuid,
  pub title: String,
  pub description: String,
  pub thumbnail_url: String,
  pub price: i64,
  pub quantity: i32,
}

pub async fn load_purchased_items(pool: &PgPool, order_id: Uuid) -> Result<Vec<PurchasedItemView>> {
  let items = sqlx::query_as(
    "SELECT oi.course_id, c.title, c.description, c.thumbnail_url, oi.price, oi.quantity \
     FROM order_items oi JOIN courses c ON c.id = oi.course_id \
     WHERE oi.order_id = $1",
  )
  .bind(order_id)
  .fetch_all(pool)
  .await?;
  Ok(items)
}

pub async fn list_user_orders(pool: &PgPool, user_id: Uuid, page: i64, limit: i64) -> Result<(Vec<Order>, i64)> {
  let offset = (page - 1) * limit;
  let orders: Vec<Order> =
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3")
      .bind(user_id)
      .bind(offset)
      .bind(limit)
      .fetch_all(pool)
      .await?;
  let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
    .bind(user_id)
    .fetch_one(pool)
    .await?;
  Ok((orders, total))
}

#[derive(Debug, Default, Clone)]
pub struct AdminOrderFilter {
  pub status: Option<crate::models::OrderStatus>,
  pub payment_status: Option<PaymentStatus>,
  pub search: Option<String>,
}

pub async fn list_all_orders(
  pool: &PgPool,
  filter: &AdminOrderFilter,
  page: i64,
  limit: i64,
) -> Result<(Vec<Order>, i64)> {
  let offset = (page - 1) * limit;
  let where_clause = "($1::order_status_enum IS NULL OR status = $1) \
     AND ($2::payment_status_enum IS NULL OR payment_status = $2) \
     AND ($3::text IS NULL OR order_number ILIKE '%' || $3 || '%' \
          OR customer_email ILIKE '%' || $3 || '%' \
          OR customer_first_name ILIKE '%' || $3 || '%' \
          OR customer_last_name ILIKE '%' || $3 || '%')";

  let orders: Vec<Order> = sqlx::query_as(&format!(
    "SELECT * FROM orders WHERE {} ORDER BY created_at DESC OFFSET $4 LIMIT $5",
    where_clause
  ))
  .bind(filter.status)
  .bind(filter.payment_status)
  .bind(filter.search.as_deref())
  .bind(offset)
  .bind(limit)
  .fetch_all(pool)
  .await?;

  let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM orders WHERE {}", where_clause))
    .bind(filter.status)
    .bind(filter.payment_status)
    .bind(filter.search.as_deref())
    .fetch_one(pool)
    .await?;

  Ok((orders, total))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;

  fn policy() -> PricingPolicy {
    PricingPolicy::default()
  }

  fn course(price: i64, discounted_price: Option<i64>) -> Course {
    Course {
      id: Uuid::new_v4(),
      title: "Test Course".to_string(),
      description: "desc".to_string(),
      instructor: "Someone".to_string(),
      price,
      discounted_price,
      category: "Programming".to_string(),
      level: "Beginner".to_string(),
      duration: "4h".to_string(),
      language: "English".to_string(),
      thumbnail_url: String::new(),
      video_url: String::new(),
      is_published: true,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn info() -> CustomerInfo {
    CustomerInfo {
      email: "buyer@example.com".to_string(),
      first_name: "Asha".to_string(),
      last_name: "Verma".to_string(),
      phone: "9999999999".to_string(),
      address: "1 Main St".to_string(),
      city: "Pune".to_string(),
      state: "MH".to_string(),
      pincode: "411001".to_string(),
    }
  }

  #[test]
  fn pricing_below_threshold_pays_flat_shipping() {
    let p = compute_pricing(1000, &policy());
    assert_eq!(p, Pricing { subtotal: 1000, shipping: 500, tax: 180, total: 1680 });
  }

  #[test]
  fn pricing_above_threshold_ships_free() {
    let p = compute_pricing(60_000, &policy());
    assert_eq!(p, Pricing { subtotal: 60_000, shipping: 0, tax: 10_800, total: 70_800 });
  }

  #[test]
  fn threshold_is_exclusive() {
    // Exactly at the threshold still pays shipping; one unit above is free.
    assert_eq!(compute_pricing(50_000, &policy()).shipping, 500);
    assert_eq!(compute_pricing(50_001, &policy()).shipping, 0);
  }

  #[test]
  fn tax_is_rounded() {
    assert_eq!(compute_pricing(10, &policy()).tax, 2); // 1.8 rounds up
    assert_eq!(compute_pricing(5, &policy()).tax, 1); // 0.9 rounds up
  }

  #[test]
  fn total_always_equals_component_sum() {
    for subtotal in [0, 1, 999, 50_000, 50_001, 123_456] {
      let p = compute_pricing(subtotal, &policy());
      assert_eq!(p.total, p.subtotal + p.shipping + p.tax);
    }
  }

  #[test]
  fn missing_fields_are_named() {
    let mut bad = info();
    bad.first_name = "  ".to_string();
    match validate_customer_info(&bad) {
      Err(AppError::MissingField { field }) => assert_eq!(field, "firstName"),
      other => panic!("expected MissingField, got {:?}", other),
    }
    assert!(validate_customer_info(&info()).is_ok());
  }

  #[test]
  fn direct_price_prefers_caller_then_discount_then_list() {
    let c = course(1000, Some(800));
    assert_eq!(direct_purchase_price(Some(750), &c), 750);
    assert_eq!(direct_purchase_price(None, &c), 800);
    assert_eq!(direct_purchase_price(Some(0), &c), 800);
    let full = course(1000, None);
    assert_eq!(direct_purchase_price(None, &full), 1000);
  }

  #[test]
  fn order_numbers_are_unique_and_sequenced() {
    let a = generate_order_number();
    let b = generate_order_number();
    assert_ne!(a, b);
    assert!(a.starts_with("ORD-"));
    let seq = |s: &str| s.rsplit('-').next().unwrap().parse::<u64>().unwrap();
    assert_eq!(seq(&b), (seq(&a) + 1) % 10_000);
  }
}
