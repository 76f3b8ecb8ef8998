//! HTTP surface: shared state and the route table.

pub mod categories;
pub mod dashboard;
pub mod forms;
pub mod orders;
pub mod products;
pub mod users;

use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::auth::AuthKeys;
use crate::images::ImageStore;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub images: Arc<dyn ImageStore>,
    pub auth: Arc<AuthKeys>,
}

/// Builds the application router. `media_root`, when given, serves uploaded
/// images under `/media`.
pub fn router(state: AppState, media_root: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/", get(health))
        // auth
        .route("/api/auth/register", post(users::register))
        .route("/api/auth/login", post(users::login))
        .route("/api/auth/refresh-token", post(users::refresh_token))
        .route("/api/auth/logout", post(users::logout))
        .route(
            "/api/auth/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .route("/api/auth/all", get(users::list_users))
        .route("/api/auth/:id", axum::routing::delete(users::delete_user))
        // catalog
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/categories/:id",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/api/products/new-arrivals", get(products::new_arrivals))
        .route(
            "/api/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route(
            "/api/products/:id/inventory",
            patch(products::update_inventory),
        )
        // orders
        .route(
            "/api/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/api/orders/shipping/:id", get(orders::get_shipping_data))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/status", put(orders::update_order_status))
        .route("/api/orders/:id/cancel", post(orders::cancel_order))
        // dashboard
        .route("/api/dashboard/sales-stats", get(dashboard::sales_stats))
        .route("/api/dashboard/graph-stats", get(dashboard::graph_stats))
        .route("/api/dashboard/recent-orders", get(dashboard::recent_orders))
        .with_state(state);

    match media_root {
        Some(root) => api.nest_service("/media", ServeDir::new(root)),
        None => api,
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "Server is running!" }))
}
