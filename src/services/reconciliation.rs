// src/services/reconciliation.rs

//! Payment reconciliation engine: maps external payment outcomes back onto
//! the order state machine exactly once. Both entry points (the hosted
//! checkout redirect and the intent verification path) converge on the same
//! terminal semantics. The pending-to-completed transition is a single
//! conditional UPDATE; side effects (cart clear, enrollment grant, emails)
//! fire only in the branch that won that row.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, PaymentStatus, StatusHistoryEntry};
use crate::services::gateway::PaymentIntent;
use crate::services::{notifications, orders};
use crate::state::AppState;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Permissive success rule for gateway intent states: providers disagree on
/// vocabulary, so `succeeded`, a still-settling `processing`, or any
/// succeeded charge all count.
pub fn intent_indicates_success(intent: &PaymentIntent) -> bool {
  intent.status == "succeeded"
    || intent.status == "processing"
    || intent.charges.iter().any(|charge| charge.status == "succeeded")
}

/// Attempt the one-and-only completion transition. Returns whether this call
/// won the row; a `false` means some earlier confirmation already did, and
/// the caller must not fire side effects.
async fn try_complete(
  pool: &PgPool,
  order_id: Uuid,
  allow_processing: bool,
  transaction_id: Option<&str>,
) -> Result<bool> {
  let result = sqlx::query(
    "UPDATE orders \
     SET payment_status = 'completed', status = 'confirmed', \
         paid_at = NOW(), completed_at = NOW(), \
         transaction_id = COALESCE($3, transaction_id), updated_at = NOW() \
     WHERE id = $1 \
       AND (payment_status = 'pending' OR (payment_status = 'processing' AND $2))",
  )
  .bind(order_id)
  .bind(allow_processing)
  .bind(transaction_id)
  .execute(pool)
  .await?;

  Ok(result.rows_affected() == 1)
}

/// Record a definitive gateway failure. Never overwrites a completed payment.
async fn mark_failed(pool: &PgPool, order_id: Uuid, reason: &str) -> Result<()> {
  sqlx::query(
    "UPDATE orders SET payment_status = 'failed', failure_reason = $2, updated_at = NOW() \
     WHERE id = $1 AND payment_status <> 'completed'",
  )
  .bind(order_id)
  .bind(reason)
  .execute(pool)
  .await?;
  Ok(())
}

pub async fn clear_user_cart(pool: &PgPool, user_id: Uuid) -> Result<u64> {
  let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(user_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected())
}

/// Post-completion effects, run once per order by the confirmation call that
/// won the transition: clear the buyer's cart, grant purchased enrollments,
/// and hand the emails to the dispatcher (never blocks this request).
async fn fire_completion_side_effects(state: &AppState, order: &Order) -> Result<()> {
  let removed = clear_user_cart(&state.db_pool, order.user_id).await?;
  info!(order_number = %order.order_number, removed, "Cart cleared after successful payment");

  sqlx::query(
    "INSERT INTO enrollments (user_id, course_id, kind) \
     SELECT $1, oi.course_id, 'purchased'::enrollment_kind_enum \
     FROM order_items oi WHERE oi.order_id = $2 \
     ON CONFLICT (user_id, course_id) DO NOTHING",
  )
  .bind(order.user_id)
  .bind(order.id)
  .execute(&state.db_pool)
  .await?;

  let items = orders::load_purchased_items(&state.db_pool, order.id).await?;
  notifications::dispatch_purchase_emails(state, order.clone(), items);
  Ok(())
}

/// Redirect-based confirmation (`checkout-success`): the order is found by
/// its checkout session id (or order id when the session id is absent) and
/// completed when the caller asserts success and payment is still pending.
/// Calling this again for an already-completed order returns its current
/// state without re-firing side effects.
#[instrument(name = "reconcile::checkout_redirect", skip(state), fields(session_id = ?session_id, order_id = ?order_id))]
pub async fn confirm_checkout_redirect(
  state: &AppState,
  requesting_user: Option<Uuid>,
  session_id: Option<&str>,
  order_id: Option<Uuid>,
  success_asserted: bool,
) -> Result<Order> {
  // The session id is the trusted correlation key. A bare order id is only
  // honored for the authenticated owner.
  let order = match (session_id, order_id) {
    (Some(sid), _) => orders::find_order_by_session(&state.db_pool, sid).await?,
    (None, Some(oid)) => match requesting_user {
      Some(uid) => orders::find_order_for_user(&state.db_pool, oid, uid).await?,
      None => orders::find_order(&state.db_pool, oid).await?,
    },
    (None, None) => {
      return Err(AppError::Validation("Session ID or Order ID is required".to_string()));
    }
  };
  let order = order.ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  if success_asserted && order.payment_status == PaymentStatus::Pending {
    if try_complete(&state.db_pool, order.id, false, None).await? {
      let completed = orders::find_order(&state.db_pool, order.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
      fire_completion_side_effects(state, &completed).await?;
      return Ok(completed);
    }
    // Lost the transition: someone confirmed first. Fall through to the
    // current state.
  }

  orders::find_order(&state.db_pool, order.id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// Intent-based confirmation (`payment-success`): re-verifies the intent's
/// authoritative status with the gateway before completing; a definite
/// failure is written back and surfaced with enough detail for a retry.
/// Confirmations without an intent id (the alternative payment methods)
/// complete directly (trust-on-redirect, a documented limitation).
#[instrument(name = "reconcile::payment_intent", skip(state), fields(user_id = %user_id, intent_id = ?intent_id, order_id = ?order_id))]
pub async fn confirm_payment_intent(
  state: &AppState,
  user_id: Uuid,
  intent_id: Option<&str>,
  order_id: Option<Uuid>,
) -> Result<Order> {
  let order = match (intent_id, order_id) {
    (Some(pid), _) => orders::find_order_by_intent(&state.db_pool, pid, user_id).await?,
    (None, Some(oid)) => orders::find_order_for_user(&state.db_pool, oid, user_id).await?,
    (None, None) => {
      return Err(AppError::Validation("Payment intent ID or Order ID is required".to_string()));
    }
  };
  let order = order.ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  // Idempotence: a second confirmation of a settled order is a no-op.
  if order.payment_status == PaymentStatus::Completed {
    info!(order_number = %order.order_number, "Order already completed; confirmation is a no-op");
    return Ok(order);
  }

  if let Some(pid) = intent_id {
    let intent = state.gateway.retrieve_payment_intent(pid).await.map_err(|e| {
      warn!(error = %e, "Gateway intent verification failed");
      AppError::Gateway("Could not verify payment".to_string())
    })?;

    if intent_indicates_success(&intent) {
      if try_complete(&state.db_pool, order.id, true, Some(&intent.id)).await? {
        let completed = orders::find_order(&state.db_pool, order.id)
          .await?
          .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        fire_completion_side_effects(state, &completed).await?;
        return Ok(completed);
      }
    } else {
      let mut reason = format!("Payment status: {}", intent.status);
      if let Some(err) = &intent.last_error {
        reason.push_str(&format!(" - {}", err));
      }
      mark_failed(&state.db_pool, order.id, &reason).await?;
      warn!(order_number = %order.order_number, %reason, "Payment verification failed");
      return Err(AppError::PaymentFailed {
        status: intent.status,
        reason: intent.last_error,
      });
    }
  } else if try_complete(&state.db_pool, order.id, true, None).await? {
    let completed = orders::find_order(&state.db_pool, order.id)
      .await?
      .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    fire_completion_side_effects(state, &completed).await?;
    return Ok(completed);
  }

  orders::find_order(&state.db_pool, order.id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// User-initiated cancellation, permitted only before payment completes. The
/// gateway is not contacted to void anything (documented limitation).
#[instrument(name = "reconcile::cancel_order", skip(state), fields(user_id = %user_id, order_id = %order_id))]
pub async fn cancel_order(state: &AppState, user_id: Uuid, order_id: Uuid) -> Result<Order> {
  let order = orders::find_order_for_user(&state.db_pool, order_id, user_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  if order.payment_status == PaymentStatus::Completed {
    return Err(AppError::State("Cannot cancel paid order".to_string()));
  }

  let cancelled: Order = sqlx::query_as(
    "UPDATE orders SET status = 'cancelled', cancelled_at = NOW(), updated_at = NOW() \
     WHERE id = $1 RETURNING *",
  )
  .bind(order.id)
  .fetch_one(&state.db_pool)
  .await?;

  info!(order_number = %cancelled.order_number, "Order cancelled");
  Ok(cancelled)
}

const ADMIN_STATUSES: [OrderStatus; 6] = [
  OrderStatus::Pending,
  OrderStatus::Confirmed,
  OrderStatus::Processing,
  OrderStatus::Shipped,
  OrderStatus::Delivered,
  OrderStatus::Cancelled,
];

/// Admin-driven fulfillment transition, independent of payment status. Every
/// change is appended to the audit trail with the acting identity.
#[instrument(name = "reconcile::admin_update_status", skip(state, notes), fields(admin_id = %admin_id, order_id = %order_id, status = %status_raw))]
pub async fn admin_update_status(
  state: &AppState,
  admin_id: Uuid,
  order_id: Uuid,
  status_raw: &str,
  notes: Option<String>,
) -> Result<Order> {
  let status = OrderStatus::parse(status_raw)
    .filter(|s| ADMIN_STATUSES.contains(s))
    .ok_or_else(|| AppError::Validation("Invalid status".to_string()))?;

  let order = orders::find_order(&state.db_pool, order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  let mut tx = state.db_pool.begin().await?;

  let updated: Order = sqlx::query_as(
    "UPDATE orders SET status = $2, \
       completed_at = CASE WHEN $2 = 'delivered'::order_status_enum THEN NOW() ELSE completed_at END, \
       cancelled_at = CASE WHEN $2 = 'cancelled'::order_status_enum THEN NOW() ELSE cancelled_at END, \
       updated_at = NOW() \
     WHERE id = $1 RETURNING *",
  )
  .bind(order.id)
  .bind(status)
  .fetch_one(&mut *tx)
  .await?;

  sqlx::query("INSERT INTO order_status_history (order_id, status, notes, changed_by) VALUES ($1, $2, $3, $4)")
    .bind(order.id)
    .bind(status)
    .bind(notes.unwrap_or_default())
    .bind(admin_id)
    .execute(&mut *tx)
    .await?;

  tx.commit().await?;

  info!(order_number = %updated.order_number, new_status = ?updated.status, "Order status updated");
  Ok(updated)
}

pub async fn load_status_history(pool: &PgPool, order_id: Uuid) -> Result<Vec<StatusHistoryEntry>> {
  let history = sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY changed_at")
    .bind(order_id)
    .fetch_all(pool)
    .await?;
  Ok(history)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::gateway::ChargeSummary;

  fn intent(status: &str, charges: Vec<ChargeSummary>) -> PaymentIntent {
    PaymentIntent {
      id: "sim_pi_test".to_string(),
      client_secret: None,
      status: status.to_string(),
      amount_minor: 100_000,
      charges,
      last_error: None,
    }
  }

  fn charge(status: &str) -> ChargeSummary {
    ChargeSummary {
      id: "sim_ch_test".to_string(),
      status: status.to_string(),
    }
  }

  #[test]
  fn succeeded_and_processing_statuses_count_as_success() {
    assert!(intent_indicates_success(&intent("succeeded", vec![])));
    assert!(intent_indicates_success(&intent("processing", vec![])));
  }

  #[test]
  fn a_succeeded_charge_counts_even_under_an_odd_status() {
    assert!(intent_indicates_success(&intent(
      "requires_capture",
      vec![charge("succeeded")]
    )));
  }

  #[test]
  fn failures_and_pending_states_do_not_count() {
    assert!(!intent_indicates_success(&intent("failed", vec![])));
    assert!(!intent_indicates_success(&intent("requires_action", vec![])));
    assert!(!intent_indicates_success(&intent("canceled", vec![charge("failed")])));
  }

  #[test]
  fn admin_status_vocabulary_excludes_refunded() {
    assert!(OrderStatus::parse("shipped").is_some_and(|s| ADMIN_STATUSES.contains(&s)));
    assert!(OrderStatus::parse("refunded").is_some_and(|s| !ADMIN_STATUSES.contains(&s)));
    assert!(OrderStatus::parse("bogus").is_none());
  }
}
