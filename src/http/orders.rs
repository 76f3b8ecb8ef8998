//! Order endpoints: checkout, lookup, admin listing, status updates,
//! cancellation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::domain::order::{OrderItem, DEFAULT_SHIPPING_FEE};
use crate::domain::shipping::ShippingPayload;
use crate::domain::{OrderStatus, PaymentStatus, PaymentType};
use crate::error::{ApiError, ApiResult};
use crate::store::{NewOrder, OrderFilter, OrderStore, Pagination};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub shipping_data: Option<ShippingPayload>,
    pub payment_type: PaymentType,
    pub subtotal: i64,
    #[serde(default = "default_shipping_fee")]
    pub shipping: i64,
    pub total: i64,
}

fn default_shipping_fee() -> i64 {
    DEFAULT_SHIPPING_FEE
}

/// `POST /api/orders`: the checkout workflow.
///
/// Client-supplied totals are stored as sent; recomputing them from
/// authoritative prices is a known hardening gap (see DESIGN.md).
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if req.items.is_empty() {
        return Err(ApiError::validation("Items are required"));
    }
    if req.items.iter().any(|item| item.qty < 1) {
        return Err(ApiError::validation("Item quantity must be at least 1"));
    }
    let shipping = req
        .shipping_data
        .ok_or_else(|| ApiError::validation("Shipping data is required"))?;
    if let Err(errors) = shipping.validate() {
        return Err(ApiError::validation(first_validation_message(&errors)));
    }

    let order = state
        .store
        .place_order(NewOrder {
            items: req.items,
            shipping,
            payment_type: req.payment_type,
            subtotal: req.subtotal,
            shipping_fee: req.shipping,
            total: req.total,
        })
        .await
        .map_err(ApiError::from)?;

    let shipping_data_id = order.shipping_data.id;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Order created successfully",
            "data": {
                "order": order,
                "shippingDataId": shipping_data_id,
            },
        })),
    ))
}

fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .filter_map(|err| err.message.as_ref())
        .map(|msg| msg.to_string())
        .next()
        .unwrap_or_else(|| "Invalid shipping data".to_owned())
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// `GET /api/orders`: flattened admin listing with pagination.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> ApiResult<Json<Value>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).max(1);

    // "All" clears the filter; an unknown status matches nothing, like an
    // exact-match filter against a value no order carries.
    let status = match query.status.as_deref().filter(|s| *s != "All") {
        Some(raw) => match raw.parse::<OrderStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return Ok(Json(json!({
                    "success": true,
                    "data": [],
                    "pagination": Pagination::new(page, limit, 0),
                })))
            }
        },
        None => None,
    };

    let result = state
        .store
        .list_orders(&OrderFilter {
            page,
            limit,
            status,
            search: query.search.filter(|s| !s.trim().is_empty()),
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": result.rows,
        "pagination": result.pagination,
    })))
}

/// `GET /api/orders/:orderNumber`: lookup by the display identifier, with
/// products and shipping populated for the confirmation page.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ApiResult<Json<Value>> {
    let order = state
        .store
        .get_order_by_number(&order_number)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;
    Ok(Json(json!({ "success": true, "data": order })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

/// `PUT /api/orders/:id/status`: partial update by internal id. Unlike the
/// lookup route, this one addresses the internal identifier.
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Value>> {
    let id = parse_order_id(&id)?;
    let status = req
        .status
        .map(|raw| {
            raw.parse::<OrderStatus>()
                .map_err(|_| ApiError::validation(format!("Invalid order status: {raw}")))
        })
        .transpose()?;
    let payment_status = req
        .payment_status
        .map(|raw| {
            raw.parse::<PaymentStatus>()
                .map_err(|_| ApiError::validation(format!("Invalid payment status: {raw}")))
        })
        .transpose()?;

    let order = state
        .store
        .update_order_status(id, status, payment_status)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(json!({
        "success": true,
        "message": "Order updated successfully",
        "data": order,
    })))
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

/// `POST /api/orders/:id/cancel`: rejected once delivered; restores the
/// line items' stock otherwise.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<CancelOrderRequest>>,
) -> ApiResult<Json<Value>> {
    let id = parse_order_id(&id)?;
    let reason = body
        .map(|Json(req)| req.reason)
        .unwrap_or_default()
        .filter(|r| !r.trim().is_empty());

    let order = state
        .store
        .cancel_order(id, reason)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(json!({
        "success": true,
        "message": "Order cancelled successfully",
        "data": order,
    })))
}

/// `GET /api/orders/shipping/:id`.
pub async fn get_shipping_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::not_found("Shipping data not found"))?;
    let shipping = state
        .store
        .get_shipping_data(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Shipping data not found"))?;
    Ok(Json(json!({ "success": true, "data": shipping })))
}

fn parse_order_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Order not found"))
}
