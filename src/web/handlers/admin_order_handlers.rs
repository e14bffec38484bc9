// src/web/handlers/admin_order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{OrderStatus, PaymentStatus};
use crate::services::orders::{self, AdminOrderFilter};
use crate::services::reconciliation;
use crate::state::AppState;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
  pub page: Option<i64>,
  pub limit: Option<i64>,
  pub status: Option<String>,
  pub payment_status: Option<String>,
  pub search: Option<String>,
}

fn parse_filter(query: &ListOrdersQuery) -> Result<AdminOrderFilter, AppError> {
  let status = match query.status.as_deref() {
    None | Some("all") | Some("") => None,
    Some(raw) => Some(OrderStatus::parse(raw).ok_or_else(|| AppError::Validation("Invalid status filter".to_string()))?),
  };
  let payment_status = match query.payment_status.as_deref() {
    None | Some("all") | Some("") => None,
    Some(raw) => {
      Some(PaymentStatus::parse(raw).ok_or_else(|| AppError::Validation("Invalid payment status filter".to_string()))?)
    }
  };
  Ok(AdminOrderFilter {
    status,
    payment_status,
    search: query.search.clone().filter(|s| !s.is_empty()),
  })
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, query, admin), fields(admin_id = %admin.id()))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ListOrdersQuery>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let page = query.page.unwrap_or(1).max(1);
  let limit = query.limit.unwrap_or(10).clamp(1, 100);
  let filter = parse_filter(&query)?;

  let (orders, total) = orders::list_all_orders(&app_state.db_pool, &filter, page, limit).await?;
  let pages = (total + limit - 1) / limit;

  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "orders": orders,
      "pagination": {
          "current": page,
          "pages": pages,
          "total": total,
          "hasNext": page < pages,
          "hasPrev": page > 1
      }
  })))
}

#[instrument(
    name = "handler::admin_get_order",
    skip(app_state, path, admin),
    fields(admin_id = %admin.id(), order_id = %path.as_ref())
)]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();

  let order = orders::find_order(&app_state.db_pool, order_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  let items = orders::load_purchased_items(&app_state.db_pool, order.id).await?;
  let history = reconciliation::load_status_history(&app_state.db_pool, order.id).await?;

  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "order": order,
      "items": items,
      "statusHistory": history
  })))
}

#[derive(Deserialize, Debug)]
pub struct UpdateStatusRequest {
  pub status: String,
  pub notes: Option<String>,
}

#[instrument(
    name = "handler::admin_update_order_status",
    skip(app_state, path, req_payload, admin),
    fields(admin_id = %admin.id(), order_id = %path.as_ref())
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateStatusRequest>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let payload = req_payload.into_inner();

  let order = reconciliation::admin_update_status(&app_state, admin.id(), order_id, &payload.status, payload.notes).await?;

  Ok(HttpResponse::Ok().json(json!({
      "success": true,
      "message": "Order status updated successfully",
      "order": order
  })))
}
