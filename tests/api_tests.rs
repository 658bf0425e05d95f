//! End-to-end tests for the auth, product, order and stats flows.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use pickarr::config::Config;
use pickarr::state::SharedState;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app() -> (Router, Arc<SharedState>) {
    let db_path = std::env::temp_dir().join(format!("pickarr-api-test-{}.db", uuid::Uuid::new_v4()));
    let images_path = std::env::temp_dir().join(format!("pickarr-api-img-{}", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.general.images_path = images_path.display().to_string();
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;

    let shared = Arc::new(
        SharedState::new(config)
            .await
            .expect("failed to create app state"),
    );
    let router = pickarr::api::router(shared.clone()).await;
    (router, shared)
}

async fn request_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn login(app: &Router, username: &str, password: &str) -> (String, String) {
    let (status, body) = request_json(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        body["data"]["access_token"].as_str().unwrap().to_string(),
        body["data"]["refresh_token"].as_str().unwrap().to_string(),
    )
}

async fn admin_token(app: &Router) -> String {
    login(app, "admin", "admin123").await.0
}

/// Multipart form for product create/update, built by hand so the tests
/// exercise the real request path.
fn product_multipart(fields: &[(&str, &str)]) -> (String, Vec<u8>) {
    let boundary = "X-PICKARR-TEST-BOUNDARY";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}

async fn create_product(app: &Router, token: &str, name: &str, price: &str, quantity: &str) -> i64 {
    let (content_type, body) = product_multipart(&[
        ("name", name),
        ("price", price),
        ("quantity", quantity),
        ("description", "test product"),
    ]);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/products")
                .header("Authorization", format!("Bearer {token}"))
                .header("Content-Type", content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_register_login_me() {
    let (app, _state) = spawn_app().await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({ "username": "customer", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "customer");
    assert_eq!(body["data"]["is_admin"], false);

    // Duplicate usernames are rejected.
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({ "username": "customer", "password": "secret456" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (token, _) = login(&app, "customer", "secret123").await;

    let (status, body) = request_json(&app, "GET", "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "customer");

    // No token, no /me.
    let (status, _) = request_json(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Bad password.
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "username": "customer", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_seeded_and_required() {
    let (app, _state) = spawn_app().await;
    let admin = admin_token(&app).await;

    let (status, body) = request_json(&app, "GET", "/api/auth/me", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_admin"], true);

    // A regular user cannot reach admin routes.
    request_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({ "username": "shopper", "password": "secret123" })),
    )
    .await;
    let (user_token, _) = login(&app, "shopper", "secret123").await;

    let (status, _) = request_json(&app, "GET", "/api/orders", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request_json(&app, "GET", "/api/stats", Some(&user_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // And not without any token either.
    let (status, _) = request_json(&app, "GET", "/api/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_crud() {
    let (app, _state) = spawn_app().await;
    let admin = admin_token(&app).await;

    let id = create_product(&app, &admin, "Latte", "4.50", "10").await;

    // Product listing is public.
    let (status, body) = request_json(&app, "GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "Latte");
    assert_eq!(body["data"][0]["price"], 4.5);

    // Partial update through the multipart form.
    let (content_type, form) = product_multipart(&[("price", "5.00")]);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/products/{id}"))
                .header("Authorization", format!("Bearer {admin}"))
                .header("Content-Type", content_type)
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = request_json(&app, "GET", &format!("/api/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 5.0);
    assert_eq!(body["data"]["name"], "Latte");

    // Unknown product is a 404.
    let (status, _) = request_json(&app, "GET", "/api/products/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Creating products requires the admin role.
    let (content_type, form) = product_multipart(&[("name", "Nope"), ("price", "1"), ("quantity", "1")]);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/products")
                .header("Content-Type", content_type)
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Delete works while no orders reference the product.
    let (status, _) =
        request_json(&app, "DELETE", &format!("/api/products/{id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request_json(&app, "GET", &format!("/api/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_flow_end_to_end() {
    let (app, _state) = spawn_app().await;
    let admin = admin_token(&app).await;

    let latte = create_product(&app, &admin, "Latte", "4.50", "10").await;
    let muffin = create_product(&app, &admin, "Muffin", "2.25", "5").await;

    request_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({ "username": "buyer", "password": "secret123" })),
    )
    .await;
    let (buyer, _) = login(&app, "buyer", "secret123").await;

    // Authenticated checkout with two items.
    let (status, body) = request_json(
        &app,
        "POST",
        "/api/orders",
        Some(&buyer),
        Some(serde_json::json!([
            { "product_id": latte, "quantity": 2 },
            { "product_id": muffin, "quantity": 1 },
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let code = body["data"]["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total"], 11.25);
    assert_eq!(body["data"]["collected"], false);

    // Stock was decremented.
    let (_, body) = request_json(&app, "GET", &format!("/api/products/{latte}"), None, None).await;
    assert_eq!(body["data"]["quantity"], 8);

    // Products with order history cannot be deleted.
    let (status, _) =
        request_json(&app, "DELETE", &format!("/api/products/{latte}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Over-ordering fails and changes nothing.
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/orders",
        None,
        Some(serde_json::json!([{ "product_id": muffin, "quantity": 100 }])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = request_json(&app, "GET", &format!("/api/products/{muffin}"), None, None).await;
    assert_eq!(body["data"]["quantity"], 4);

    // The buyer sees their order, case-insensitively by code.
    let (status, body) = request_json(&app, "GET", "/api/orders/mine", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let lowercase = code.to_lowercase();
    let (status, body) = request_json(
        &app,
        "GET",
        &format!("/api/orders/mine/{lowercase}"),
        Some(&buyer),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["code"], code);

    // Admin looks the order up and hands it over.
    let (status, body) =
        request_json(&app, "GET", &format!("/api/orders/{code}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["username"], "buyer");

    let (status, body) = request_json(
        &app,
        "PATCH",
        &format!("/api/orders/{code}/collected"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["collected"], true);

    let (status, _) = request_json(
        &app,
        "PATCH",
        "/api/orders/ZZZZZZ/collected",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Stats over the collected order.
    let (status, body) = request_json(&app, "GET", "/api/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_orders"], 1);
    assert_eq!(body["data"]["total_revenue"], 11.25);
    assert!(!body["data"]["top_products"].as_array().unwrap().is_empty());

    let (status, _) = request_json(
        &app,
        "GET",
        "/api/stats?range=custom&start_date=nope&end_date=2026-01-01",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_guest_checkout_has_no_user() {
    let (app, _state) = spawn_app().await;
    let admin = admin_token(&app).await;
    let product = create_product(&app, &admin, "Tea", "3.00", "3").await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/orders",
        None,
        Some(serde_json::json!([{ "product_id": product, "quantity": 1 }])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("user").is_none() || body["data"]["user"].is_null());

    // A garbage bearer token is rejected rather than treated as a guest.
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/orders",
        Some("not-a-jwt"),
        Some(serde_json::json!([{ "product_id": product, "quantity": 1 }])),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotation_and_logout() {
    let (app, _state) = spawn_app().await;

    request_json(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(serde_json::json!({ "username": "rotator", "password": "secret123" })),
    )
    .await;
    let (access, refresh) = login(&app, "rotator", "secret123").await;

    let (status, body) = request_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(serde_json::json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(new_refresh, refresh);

    // Replaying the rotated-out token fails.
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(serde_json::json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Logout revokes the access token.
    let (status, _) = request_json(
        &app,
        "POST",
        "/api/auth/logout",
        Some(&access),
        Some(serde_json::json!({ "refresh_token": new_refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request_json(&app, "GET", "/api/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request_json(
        &app,
        "POST",
        "/api/auth/refresh",
        None,
        Some(serde_json::json!({ "refresh_token": new_refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
