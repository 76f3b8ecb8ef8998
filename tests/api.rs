//! End-to-end tests over the router with the in-memory store.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::{seed_category, seed_product};
use ebazaar::auth::AuthKeys;
use ebazaar::config::Config;
use ebazaar::http::{router, AppState};
use ebazaar::images::NullImageStore;
use ebazaar::store::MemoryStore;

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        port: 0,
        jwt_access_secret: "test-access-secret".into(),
        jwt_refresh_secret: "test-refresh-secret".into(),
        jwt_access_expires_in: 3600,
        jwt_refresh_expires_in: 7 * 24 * 3600,
        media_root: "media".into(),
        public_base_url: "http://localhost".into(),
        cors_origins: vec![],
    }
}

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        store: store.clone(),
        images: Arc::new(NullImageStore),
        auth: Arc::new(AuthKeys::from_config(&test_config())),
    };
    (router(state, None), store)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body").to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn order_body(product_id: uuid::Uuid, qty: i32) -> Value {
    json!({
        "items": [{ "productId": product_id, "qty": qty }],
        "shippingData": {
            "name": "Jane Doe",
            "email": "jane@example.com",
            "phone": "0300-1234567",
            "address": "12 Mall Road",
            "city": "Lahore",
            "country": "Pakistan"
        },
        "paymentType": "cod",
        "subtotal": 300,
        "shipping": 499,
        "total": 799
    })
}

#[tokio::test]
async fn health_probe_answers() {
    let (app, _) = test_app();
    let (status, body) = send(
        &app,
        Request::builder().uri("/").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Server is running!");
}

#[tokio::test]
async fn checkout_round_trip_through_the_api() {
    let (app, store) = test_app();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/orders", &order_body(product.id, 3)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Order created successfully");

    let order = &body["data"]["order"];
    let number = order["orderNumber"].as_str().expect("order number");
    assert!(number.starts_with("eb"));
    assert!(number[2..].chars().all(|c| c.is_ascii_digit()));
    assert!(number.len() >= 5);
    assert_eq!(order["subtotal"], 300);
    assert_eq!(order["shipping"], 499);
    assert_eq!(order["total"], 799);
    assert_eq!(order["shippingData"]["name"], "Jane Doe");
    assert!(body["data"]["shippingDataId"].is_string());

    // confirmation-page lookup by the display identifier
    let (status, body) = send(
        &app,
        Request::builder()
            .uri(format!("/api/orders/{number}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["shippingData"]["name"], "Jane Doe");
    assert_eq!(body["data"]["items"][0]["productId"]["name"], "Runner");
    assert_eq!(body["data"]["items"][0]["qty"], 3);
}

#[tokio::test]
async fn empty_cart_and_missing_shipping_are_rejected() {
    let (app, _) = test_app();

    let body = json!({
        "items": [],
        "paymentType": "cod",
        "subtotal": 0,
        "total": 499
    });
    let (status, body) = send(&app, json_request("POST", "/api/orders", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Items are required");

    let body = json!({
        "items": [{ "productId": uuid::Uuid::new_v4(), "qty": 1 }],
        "paymentType": "cod",
        "subtotal": 100,
        "total": 599
    });
    let (status, body) = send(&app, json_request("POST", "/api/orders", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Shipping data is required");
}

#[tokio::test]
async fn insufficient_stock_is_a_400_naming_the_product() {
    let (app, store) = test_app();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Soldout", 100, 0).await;

    let (status, body) = send(
        &app,
        json_request("POST", "/api/orders", &order_body(product.id, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Insufficient stock for Soldout");
}

#[tokio::test]
async fn unknown_product_is_a_404_naming_the_id() {
    let (app, _) = test_app();
    let missing = uuid::Uuid::new_v4();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/orders", &order_body(missing, 1)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["message"],
        format!("Product not found with ID: {missing}")
    );
}

async fn admin_token(app: &Router) -> String {
    let body = json!({
        "name": "Admin",
        "email": "admin@example.com",
        "password": "s3cret-pass",
        "role": "admin"
    });
    let (status, body) = send(app, json_request("POST", "/api/auth/register", &body)).await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["accessToken"]
        .as_str()
        .expect("access token")
        .to_owned()
}

#[tokio::test]
async fn category_deletion_is_blocked_while_products_reference_it() {
    let (app, store) = test_app();
    let category = seed_category(&store, "Shoes").await;
    seed_product(&store, category.id, "Runner", 100, 5).await;
    let token = admin_token(&app).await;

    let (status, body) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/categories/{}", category.id))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Cannot delete category. There are 1 products associated with it."
    );
}

#[tokio::test]
async fn admin_routes_reject_missing_and_non_admin_tokens() {
    let (app, store) = test_app();
    let category = seed_category(&store, "Shoes").await;

    let (status, body) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/categories/{}", category.id))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No token provided, authorization denied");

    let register = json!({
        "name": "Shopper",
        "email": "shopper@example.com",
        "password": "plain-pass"
    });
    let (_, body) = send(&app, json_request("POST", "/api/auth/register", &register)).await;
    let token = body["data"]["accessToken"].as_str().expect("token");

    let (status, body) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/categories/{}", category.id))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied. Admin privileges required.");
}

#[tokio::test]
async fn login_and_refresh_rotate_tokens() {
    let (app, _) = test_app();
    let _ = admin_token(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": "admin@example.com", "password": "s3cret-pass" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    let refresh = body["data"]["refreshToken"].as_str().expect("refresh token");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/refresh-token",
            &json!({ "refreshToken": refresh }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["accessToken"].is_string());

    // a bad password is a 401, not a different message
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/login",
            &json!({ "email": "admin@example.com", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn order_listing_filters_and_paginates() {
    let (app, store) = test_app();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 50).await;

    for _ in 0..3 {
        let (status, _) = send(
            &app,
            json_request("POST", "/api/orders", &order_body(product.id, 1)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/api/orders?page=1&limit=2&status=All")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["hasNextPage"], true);
    assert_eq!(body["pagination"]["hasPrevPage"], false);
    assert_eq!(body["data"][0]["customerName"], "Jane Doe");

    // search matches the order number substring
    let (_, body) = send(
        &app,
        Request::builder()
            .uri("/api/orders?search=eb002")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"][0]["orderNumber"], "eb002");
}

#[tokio::test]
async fn delivered_orders_refuse_cancellation_over_http() {
    let (app, store) = test_app();
    let category = seed_category(&store, "Shoes").await;
    let product = seed_product(&store, category.id, "Runner", 100, 5).await;

    let (_, body) = send(
        &app,
        json_request("POST", "/api/orders", &order_body(product.id, 1)),
    )
    .await;
    let order_id = body["data"]["order"]["id"].as_str().expect("id").to_owned();

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/orders/{order_id}/status"),
            &json!({ "status": "delivered" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/orders/{order_id}/cancel"),
            &json!({ "reason": "too late" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot cancel delivered orders");
}
