// src/services/gateway.rs

//! Payment gateway adapter: translates persisted orders into external
//! checkout artifacts (hosted sessions, payment intents) and verifies intent
//! state. The external processor is reached through the [`PaymentGateway`]
//! trait; [`SimulatedGateway`] is the bundled in-process provider.

use crate::errors::{AppError, Result};
use crate::models::{Order, PaymentMethod, PaymentStatus};
use crate::services::orders::{self, PurchasedItemView};
use crate::state::AppState;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Correlation metadata attached to every external artifact so the
/// processor's responses can be joined back to the order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderMetadata {
  pub order_id: Uuid,
  pub user_id: Uuid,
  pub order_number: String,
}

/// One priced line on a hosted checkout page. Amounts are integer minor
/// currency units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
  pub name: String,
  pub description: Option<String>,
  pub unit_amount_minor: i64,
  pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
  pub line_items: Vec<SessionLineItem>,
  pub currency: String,
  pub customer_email: Option<String>,
  pub success_url: String,
  pub cancel_url: String,
  pub metadata: OrderMetadata,
  pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
  pub id: String,
  pub url: String,
}

#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
  pub amount_minor: i64,
  pub currency: String,
  pub metadata: OrderMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargeSummary {
  pub id: String,
  pub status: String,
}

/// Authoritative intent state as reported by the processor. Status strings
/// are provider vocabulary; see `reconciliation::intent_indicates_success`
/// for the matching rule.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
  pub id: String,
  pub client_secret: Option<String>,
  pub status: String,
  pub amount_minor: i64,
  pub charges: Vec<ChargeSummary>,
  pub last_error: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_checkout_session(&self, req: CheckoutSessionRequest) -> Result<CheckoutSession>;
  async fn create_payment_intent(&self, req: PaymentIntentRequest) -> Result<PaymentIntent>;
  async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent>;
}

/// Convert a major-unit amount to the minor units the processor expects.
pub fn to_minor_units(amount: i64) -> i64 {
  amount * 100
}

const MAX_DESCRIPTION_LEN: usize = 500;

/// Build the hosted-checkout line items for an order: one priced line per
/// purchased course, plus synthetic Shipping and Tax lines when nonzero
/// (hosted checkouts cannot express them separately).
pub fn build_line_items(items: &[PurchasedItemView], shipping: i64, tax: i64) -> Vec<SessionLineItem> {
  let mut lines: Vec<SessionLineItem> = items
    .iter()
    .map(|item| SessionLineItem {
      name: item.title.clone(),
      description: Some(item.description.chars().take(MAX_DESCRIPTION_LEN).collect()),
      unit_amount_minor: to_minor_units(item.price),
      quantity: item.quantity,
    })
    .collect();

  if shipping > 0 {
    lines.push(SessionLineItem {
      name: "Shipping".to_string(),
      description: Some("Delivery charges".to_string()),
      unit_amount_minor: to_minor_units(shipping),
      quantity: 1,
    });
  }
  if tax > 0 {
    lines.push(SessionLineItem {
      name: "Tax (GST)".to_string(),
      description: Some("Tax charges".to_string()),
      unit_amount_minor: to_minor_units(tax),
      quantity: 1,
    });
  }
  lines
}

/// Refuse to open a second payment attempt for an order already in flight or
/// settled.
pub fn ensure_payment_pending(status: PaymentStatus) -> Result<()> {
  if status != PaymentStatus::Pending {
    return Err(AppError::State("Order payment already processed".to_string()));
  }
  Ok(())
}

fn metadata_for(order: &Order) -> OrderMetadata {
  OrderMetadata {
    order_id: order.id,
    user_id: order.user_id,
    order_number: order.order_number.clone(),
  }
}

/// Create a hosted checkout session for the order and persist the returned
/// session id, the join key the redirect-based reconciliation path uses.
#[instrument(name = "gateway::create_checkout_session", skip(state), fields(order_id = %order_id))]
pub async fn create_checkout_session_for_order(
  state: &AppState,
  order_id: Uuid,
  requesting_user: Uuid,
) -> Result<CheckoutSession> {
  let order = orders::find_order_for_user(&state.db_pool, order_id, requesting_user)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  ensure_payment_pending(order.payment_status)?;

  let items = orders::load_purchased_items(&state.db_pool, order.id).await?;
  let line_items = build_line_items(&items, order.shipping, order.tax);

  let frontend_url = &state.config.frontend_url;
  let success_url = format!(
    "{}/my-courses?session_id={{CHECKOUT_SESSION_ID}}&order_id={}&payment_success=true",
    frontend_url, order.id
  );
  let cancel_url = format!("{}/my-courses?canceled=true&order_id={}", frontend_url, order.id);

  let req = CheckoutSessionRequest {
    line_items,
    currency: state.config.currency.clone(),
    customer_email: Some(order.customer_email.clone()),
    success_url,
    cancel_url,
    metadata: metadata_for(&order),
    expires_at: Utc::now() + Duration::minutes(state.config.checkout_session_ttl_minutes),
  };

  let session = state.gateway.create_checkout_session(req).await.map_err(|e| {
    warn!(error = %e, "Gateway rejected checkout session creation");
    AppError::Gateway("Could not initiate payment".to_string())
  })?;

  sqlx::query("UPDATE orders SET checkout_session_id = $2, updated_at = NOW() WHERE id = $1")
    .bind(order.id)
    .bind(&session.id)
    .execute(&state.db_pool)
    .await?;

  info!(session_id = %session.id, order_number = %order.order_number, "Checkout session created");
  Ok(session)
}

/// Outcome of initiating an intent-based payment. Card payments get a real
/// gateway intent; other methods get a synthesized redirect (trust-on-redirect
/// policy, a documented limitation).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PaymentInitiation {
  CardIntent {
    #[serde(rename = "clientSecret")]
    client_secret: Option<String>,
    #[serde(rename = "paymentIntentId")]
    payment_intent_id: String,
  },
  Redirect {
    #[serde(rename = "paymentUrl")]
    payment_url: String,
    #[serde(rename = "orderId")]
    order_id: Uuid,
  },
}

/// Create a payment intent for the order (card), or synthesize a redirect for
/// the alternative methods; either way the order moves to `processing`.
#[instrument(name = "gateway::create_payment_intent", skip(state), fields(order_id = %order_id, method = ?method))]
pub async fn create_payment_intent_for_order(
  state: &AppState,
  order_id: Uuid,
  requesting_user: Uuid,
  method: PaymentMethod,
) -> Result<PaymentInitiation> {
  let order = orders::find_order_for_user(&state.db_pool, order_id, requesting_user)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  ensure_payment_pending(order.payment_status)?;

  if method == PaymentMethod::Card {
    let req = PaymentIntentRequest {
      amount_minor: to_minor_units(order.total),
      currency: state.config.currency.clone(),
      metadata: metadata_for(&order),
    };

    let intent = state.gateway.create_payment_intent(req).await.map_err(|e| {
      warn!(error = %e, "Gateway rejected payment intent creation");
      AppError::Gateway("Could not initiate payment".to_string())
    })?;

    sqlx::query(
      "UPDATE orders SET payment_intent_id = $2, payment_status = 'processing', updated_at = NOW() WHERE id = $1",
    )
    .bind(order.id)
    .bind(&intent.id)
    .execute(&state.db_pool)
    .await?;

    info!(intent_id = %intent.id, order_number = %order.order_number, "Payment intent created");
    Ok(PaymentInitiation::CardIntent {
      client_secret: intent.client_secret,
      payment_intent_id: intent.id,
    })
  } else {
    let payment_url = format!(
      "{}/my-courses?order_id={}&method={}&payment_redirect=true",
      state.config.frontend_url,
      order.id,
      method_slug(method)
    );

    sqlx::query("UPDATE orders SET payment_status = 'processing', updated_at = NOW() WHERE id = $1")
      .bind(order.id)
      .execute(&state.db_pool)
      .await?;

    info!(order_number = %order.order_number, "Non-card payment redirect issued");
    Ok(PaymentInitiation::Redirect {
      payment_url,
      order_id: order.id,
    })
  }
}

fn method_slug(method: PaymentMethod) -> &'static str {
  match method {
    PaymentMethod::Card => "card",
    PaymentMethod::Upi => "upi",
    PaymentMethod::Netbanking => "netbanking",
    PaymentMethod::Wallet => "wallet",
  }
}

// --- Bundled provider ---

/// In-process stand-in for the external processor. Created intents are held
/// in memory; retrieval settles them (an arbitrary amount condition produces
/// failures so the failure path stays exercised end to end).
pub struct SimulatedGateway {
  checkout_base_url: String,
  intents: RwLock<HashMap<String, PaymentIntent>>,
}

impl SimulatedGateway {
  pub fn new(checkout_base_url: impl Into<String>) -> Self {
    Self {
      checkout_base_url: checkout_base_url.into(),
      intents: RwLock::new(HashMap::new()),
    }
  }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
  #[instrument(name = "sim_gateway::create_checkout_session", skip(self, req), fields(order_id = %req.metadata.order_id))]
  async fn create_checkout_session(&self, req: CheckoutSessionRequest) -> Result<CheckoutSession> {
    if req.line_items.is_empty() {
      return Err(AppError::Gateway("Checkout session requires at least one line item".to_string()));
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await; // Simulate network latency

    let total_minor: i64 = req
      .line_items
      .iter()
      .map(|l| l.unit_amount_minor * l.quantity as i64)
      .sum();
    let session_id = format!("sim_cs_{}", Uuid::new_v4().simple());
    let url = format!("{}/pay/{}", self.checkout_base_url, session_id);
    info!(
      session_id = %session_id,
      currency = %req.currency,
      total_minor,
      customer_email = ?req.customer_email,
      expires_at = %req.expires_at,
      success_url = %req.success_url,
      cancel_url = %req.cancel_url,
      "Simulated checkout session created"
    );
    Ok(CheckoutSession { id: session_id, url })
  }

  #[instrument(name = "sim_gateway::create_payment_intent", skip(self, req), fields(order_id = %req.metadata.order_id, amount = req.amount_minor, currency = %req.currency))]
  async fn create_payment_intent(&self, req: PaymentIntentRequest) -> Result<PaymentIntent> {
    if req.amount_minor <= 0 {
      return Err(AppError::Gateway("Amount must be greater than zero".to_string()));
    }
    tokio::time::sleep(std::time::Duration::from_millis(50)).await; // Simulate network latency

    let intent_id = format!("sim_pi_{}", Uuid::new_v4().simple());
    let intent = PaymentIntent {
      id: intent_id.clone(),
      client_secret: Some(format!("{}_secret_{}", intent_id, Uuid::new_v4().simple())),
      status: "requires_action".to_string(),
      amount_minor: req.amount_minor,
      charges: Vec::new(),
      last_error: None,
    };
    self.intents.write().insert(intent_id, intent.clone());
    Ok(intent)
  }

  #[instrument(name = "sim_gateway::retrieve_payment_intent", skip(self))]
  async fn retrieve_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let mut intents = self.intents.write();
    let intent = intents
      .get_mut(intent_id)
      .ok_or_else(|| AppError::Gateway(format!("No such payment intent: {}", intent_id)))?;

    // Settle on first retrieval. Amounts ending in 123 minor units fail.
    if intent.status == "requires_action" {
      if intent.amount_minor % 1000 == 123 {
        intent.status = "failed".to_string();
        intent.last_error = Some("Simulated card declined".to_string());
      } else {
        intent.status = "succeeded".to_string();
        intent.charges.push(ChargeSummary {
          id: format!("sim_ch_{}", Uuid::new_v4().simple()),
          status: "succeeded".to_string(),
        });
      }
    }
    Ok(intent.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn item(title: &str, price: i64, quantity: i32) -> PurchasedItemView {
    PurchasedItemView {
      course_id: Uuid::new_v4(),
      title: title.to_string(),
      description: "About this course".to_string(),
      thumbnail_url: String::new(),
      price,
      quantity,
    }
  }

  fn metadata() -> OrderMetadata {
    OrderMetadata {
      order_id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      order_number: "ORD-1-0001".to_string(),
    }
  }

  #[test]
  fn line_items_cover_courses_shipping_and_tax() {
    let lines = build_line_items(&[item("Rust Basics", 1000, 1)], 500, 180);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0].unit_amount_minor, 100_000);
    assert_eq!(lines[1].name, "Shipping");
    assert_eq!(lines[1].unit_amount_minor, 50_000);
    assert_eq!(lines[2].name, "Tax (GST)");
    assert_eq!(lines[2].unit_amount_minor, 18_000);
  }

  #[test]
  fn zero_shipping_gets_no_synthetic_line() {
    let lines = build_line_items(&[item("Advanced Rust", 60_000, 1)], 0, 10_800);
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.name != "Shipping"));
  }

  #[test]
  fn long_descriptions_are_truncated() {
    let mut long = item("Course", 100, 1);
    long.description = "x".repeat(2000);
    let lines = build_line_items(&[long], 0, 0);
    assert_eq!(lines[0].description.as_ref().unwrap().len(), MAX_DESCRIPTION_LEN);
  }

  #[test]
  fn pending_guard_rejects_in_flight_orders() {
    assert!(ensure_payment_pending(PaymentStatus::Pending).is_ok());
    assert!(ensure_payment_pending(PaymentStatus::Processing).is_err());
    assert!(ensure_payment_pending(PaymentStatus::Completed).is_err());
  }

  #[tokio::test]
  async fn simulated_intent_settles_to_succeeded() {
    let gw = SimulatedGateway::new("https://pay.example");
    let intent = gw
      .create_payment_intent(PaymentIntentRequest {
        amount_minor: 168_000,
        currency: "inr".to_string(),
        metadata: metadata(),
      })
      .await
      .unwrap();
    assert_eq!(intent.status, "requires_action");

    let settled = gw.retrieve_payment_intent(&intent.id).await.unwrap();
    assert_eq!(settled.status, "succeeded");
    assert_eq!(settled.charges.len(), 1);
  }

  #[tokio::test]
  async fn simulated_intent_declines_marked_amounts() {
    let gw = SimulatedGateway::new("https://pay.example");
    let intent = gw
      .create_payment_intent(PaymentIntentRequest {
        amount_minor: 5123,
        currency: "inr".to_string(),
        metadata: metadata(),
      })
      .await
      .unwrap();

    let settled = gw.retrieve_payment_intent(&intent.id).await.unwrap();
    assert_eq!(settled.status, "failed");
    assert!(settled.last_error.is_some());
  }

  #[tokio::test]
  async fn unknown_intent_is_a_gateway_error() {
    let gw = SimulatedGateway::new("https://pay.example");
    assert!(gw.retrieve_payment_intent("sim_pi_missing").await.is_err());
  }
}
