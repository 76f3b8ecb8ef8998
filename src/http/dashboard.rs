//! Dashboard endpoints: read-only reporting for the admin UI.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::dashboard::format_graph_stats;
use crate::error::ApiResult;
use crate::store::DashboardStore;

use super::AppState;

/// `GET /api/dashboard/sales-stats`.
pub async fn sales_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = state.store.sales_stats().await?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

/// `GET /api/dashboard/graph-stats`: the chart payload: `Jan`..`Dec`
/// revenue series, color-tagged category and payment breakdowns.
pub async fn graph_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let raw = state.store.graph_stats(Utc::now()).await?;
    Ok(Json(json!({ "success": true, "data": format_graph_stats(raw) })))
}

/// `GET /api/dashboard/recent-orders`: latest 10, flattened.
pub async fn recent_orders(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let orders = state.store.recent_orders(10).await?;
    Ok(Json(json!({ "success": true, "data": orders })))
}
