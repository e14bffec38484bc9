// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CustomerInfo, PaymentMethod};
use crate::services::orders::DirectItem;
use crate::services::{gateway, orders, reconciliation};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  /// Some clients send the snapshot as `shippingAddress`, others as
  /// `customerInfo`; the former wins when both are present.
  pub shipping_address: Option<CustomerInfo>,
  pub customer_info: Option<CustomerInfo>,
  pub payment_method: PaymentMethod,
  pub items: Option<Vec<DirectItem>>,
}

#[instrument(name = "handler::create_order", skip(app_state, req_payload, auth_user), fields(user_id = %auth_user.id()))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CreateOrderRequest>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let customer_info = payload
    .shipping_address
    .or(payload.customer_info)
    .ok_or_else(|| AppError::MissingField { field: "customerInfo".to_string() })?;

  let (order, items) = orders::create_order(
    &app_state,
    auth_user.id(),
    &customer_info,
    payload.payment_method,
    payload.items,
  )
  .await?;

  Ok(HttpResponse::Created().json(json!({
      "message": "Order created successfully",
      "order": order,
      "items": items
  })))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequestBody {
  pub order_id: Uuid,
}

#[instrument(
    name = "handler::create_checkout_session",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.id(), order_id = %req_payload.order_id)
)]
pub async fn create_checkout_session_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CheckoutSessionRequestBody>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let session = gateway::create_checkout_session_for_order(&app_state, req_payload.order_id, auth_user.id()).await?;

  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "sessionId": session.id,
      "url": session.url
  })))
}

#[derive(Deserialize, Debug)]
pub struct CheckoutSuccessQuery {
  pub session_id: Option<String>,
  pub order_id: Option<Uuid>,
  pub payment_success: Option<String>,
}

#[instrument(name = "handler::checkout_success", skip(app_state, query, auth_user), fields(user_id = %auth_user.id()))]
pub async fn checkout_success_handler(
  app_state: web::Data<AppState>,
  query: web::Query<CheckoutSuccessQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let success_asserted = query.payment_success.as_deref() == Some("true");

  let order = reconciliation::confirm_checkout_redirect(
    &app_state,
    Some(auth_user.id()),
    query.session_id.as_deref(),
    query.order_id,
    success_asserted,
  )
  .await?;
  let items = orders::load_purchased_items(&app_state.db_pool, order.id).await?;

  let message = if success_asserted {
    "Payment successful! You can now access your courses."
  } else {
    "Payment status updated."
  };

  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "message": message,
      "order": order,
      "items": items
  })))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentRequestBody {
  pub order_id: Uuid,
  pub payment_method: PaymentMethod,
}

#[instrument(
    name = "handler::create_payment_intent",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.id(), order_id = %req_payload.order_id)
)]
pub async fn create_payment_intent_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PaymentIntentRequestBody>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let initiation = gateway::create_payment_intent_for_order(
    &app_state,
    req_payload.order_id,
    auth_user.id(),
    req_payload.payment_method,
  )
  .await?;

  Ok(HttpResponse::Ok().json(initiation))
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccessRequestBody {
  pub payment_intent_id: Option<String>,
  pub order_id: Option<Uuid>,
}

#[instrument(name = "handler::payment_success", skip(app_state, req_payload, auth_user), fields(user_id = %auth_user.id()))]
pub async fn payment_success_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<PaymentSuccessRequestBody>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = reconciliation::confirm_payment_intent(
    &app_state,
    auth_user.id(),
    req_payload.payment_intent_id.as_deref(),
    req_payload.order_id,
  )
  .await?;

  Ok(HttpResponse::Ok().json(json!({
      "message": "Payment successful! You can now access your courses.",
      "order": order
  })))
}

#[instrument(name = "handler::orders_clear_cart", skip(app_state, auth_user), fields(user_id = %auth_user.id()))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let deleted = reconciliation::clear_user_cart(&app_state.db_pool, auth_user.id()).await?;
  info!(deleted, "Manual cart clear");
  Ok(HttpResponse::Ok().json(json!({
      "message": "Cart cleared successfully",
      "deletedCount": deleted
  })))
}

#[derive(Deserialize, Debug)]
pub struct PageQuery {
  pub page: Option<i64>,
  pub limit: Option<i64>,
}

#[instrument(name = "handler::my_orders", skip(app_state, query, auth_user), fields(user_id = %auth_user.id()))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<PageQuery>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let page = query.page.unwrap_or(1).max(1);
  let limit = query.limit.unwrap_or(10).clamp(1, 100);

  let (orders, total) = orders::list_user_orders(&app_state.db_pool, auth_user.id(), page, limit).await?;

  Ok(HttpResponse::Ok().json(json!({
      "orders": orders,
      "pagination": {
          "current": page,
          "pages": (total + limit - 1) / limit,
          "total": total
      }
  })))
}

#[instrument(
    name = "handler::get_order",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.id(), order_id = %path.as_ref())
)]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();

  let order = orders::find_order_for_user(&app_state.db_pool, order_id, auth_user.id())
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  let items = orders::load_purchased_items(&app_state.db_pool, order.id).await?;

  Ok(HttpResponse::Ok().json(json!({ "order": order, "items": items })))
}

#[instrument(
    name = "handler::cancel_order",
    skip(app_state, path, auth_user),
    fields(user_id = %auth_user.id(), order_id = %path.as_ref())
)]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let order = reconciliation::cancel_order(&app_state, auth_user.id(), order_id).await?;

  Ok(HttpResponse::Ok().json(json!({
      "message": "Order cancelled successfully",
      "order": order
  })))
}
