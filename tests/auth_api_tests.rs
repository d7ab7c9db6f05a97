//! Account API contract tests
mod common;

use axum::http::{header, Method, StatusCode};
use common::{get_request, json_request, spawn_app, spawn_app_with, StubAnalyzer};
use fixmystreet::analyzer::DamageAssessment;
use serde_json::json;

fn analyzer() -> std::sync::Arc<StubAnalyzer> {
    StubAnalyzer::returning(DamageAssessment::default())
}

#[tokio::test]
async fn test_register_returns_user_and_token() {
    let app = spawn_app(analyzer()).await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/register",
            None,
            json!({
                "name": "Asha Rao",
                "email": "Asha@Example.com",
                "password": "password123",
                "password_confirmation": "password123",
                "employee_id": "EMP-7",
                "date_of_birth": "1990-05-17"
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert_eq!(body["user"]["employee_id"], "EMP-7");
    assert_eq!(body["user"]["is_admin"], false);
    assert!(body["user"].get("password_hash").is_none());

    let token = body["token"].as_str().unwrap();
    let (id, secret) = token.split_once('|').unwrap();
    assert!(id.parse::<i64>().is_ok());
    assert_eq!(secret.len(), 40);
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = spawn_app(analyzer()).await;
    app.register("dup@example.com", false).await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/register",
            None,
            json!({
                "name": "Second",
                "email": "DUP@example.com",
                "password": "password123",
                "password_confirmation": "password123"
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["email"][0], "The email has already been taken.");
    assert_eq!(body["message"], "The email has already been taken.");
}

#[tokio::test]
async fn test_register_password_confirmation_mismatch() {
    let app = spawn_app(analyzer()).await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/register",
            None,
            json!({
                "name": "Asha",
                "email": "asha@example.com",
                "password": "password123",
                "password_confirmation": "password321"
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["password"][0],
        "The password field confirmation does not match."
    );
}

#[tokio::test]
async fn test_register_empty_body_lists_all_fields() {
    let app = spawn_app(analyzer()).await;

    let (status, body) = app
        .send(json_request(Method::POST, "/api/register", None, json!({})))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "The name field is required. (and 2 more errors)");
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());
}

#[tokio::test]
async fn test_register_field_types() {
    let app = spawn_app(analyzer()).await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/register",
            None,
            json!({
                "name": "Ward Officer",
                "email": "officer@example.gov",
                "password": "password123",
                "password_confirmation": "password123",
                "is_admin": 1
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["is_admin"], true);

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/register",
            None,
            json!({
                "name": 42,
                "email": "typed@example.com",
                "password": "password123",
                "password_confirmation": "password123",
                "is_admin": "maybe"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["name"][0], "The name field must be a string.");
    assert_eq!(
        body["errors"]["is_admin"][0],
        "The is admin field must be true or false."
    );
    assert!(body["errors"].get("body").is_none());
}

#[tokio::test]
async fn test_token_lifecycle() {
    let app = spawn_app(analyzer()).await;
    let token = app.register("citizen@example.com", false).await;

    let (status, body) = app.send(get_request("/api/user", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "citizen@example.com");

    let (status, body) = app
        .send(json_request(Method::POST, "/api/logout", Some(&token), json!({})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully");

    let (status, body) = app.send(get_request("/api/user", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthenticated.");
}

#[tokio::test]
async fn test_logout_keeps_other_tokens() {
    let app = spawn_app(analyzer()).await;
    let first = app.register("two@example.com", false).await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/login",
            None,
            json!({ "email": "two@example.com", "password": "password123" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let second = body["token"].as_str().unwrap().to_string();

    app.send(json_request(Method::POST, "/api/logout", Some(&first), json!({})))
        .await;

    let (status, _) = app.send(get_request("/api/user", Some(&second))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = spawn_app(analyzer()).await;
    app.register("login@example.com", false).await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/login",
            None,
            json!({ "email": "login@example.com", "password": "wrong-password" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["email"][0],
        "The provided credentials are incorrect."
    );
}

#[tokio::test]
async fn test_missing_or_malformed_token() {
    let app = spawn_app(analyzer()).await;

    let (status, _) = app.send(get_request("/api/user", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(get_request("/api/user", Some("7|nope"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let app = spawn_app(analyzer()).await;

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_misc_routes() {
    let app = spawn_app(analyzer()).await;

    let (status, body) = app.send(get_request("/api/test", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "API is working!");

    let (status, body) = app.send(get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send(get_request("/health/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    let (status, body) = app.send(get_request("/health/detailed", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["complaints"], 0);

    let (status, body) = app.send(get_request("/no/such/route", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");

    let (status, _, body) = app.send_raw(get_request("/metrics", None)).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let app = spawn_app_with(analyzer(), |config| {
        config.rate_limit.enabled = true;
        config.rate_limit.unauthenticated_rps = 1;
        config.rate_limit.burst_size = 1;
    })
    .await;

    let (status, _) = app.send(get_request("/api/test", None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, body) = app.send_raw(get_request("/api/test", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(headers.contains_key(header::RETRY_AFTER));
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["message"], "Too Many Attempts.");

    // Health probes are never throttled
    let (status, _) = app.send(get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_authorization_counts_as_anonymous() {
    let app = spawn_app_with(analyzer(), |config| {
        config.rate_limit.enabled = true;
        config.rate_limit.authenticated_rps = 100;
        config.rate_limit.unauthenticated_rps = 1;
        config.rate_limit.burst_size = 5;
    })
    .await;

    let with_header = |value: &str| {
        axum::http::Request::builder()
            .uri("/api/test")
            .header(header::AUTHORIZATION, value)
            .body(axum::body::Body::empty())
            .unwrap()
    };

    // Bearer-shaped headers draw from the larger bucket
    for _ in 0..3 {
        let (status, _) = app.send(with_header("Bearer 1|not-checked-here")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = app.send(with_header("garbage")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(with_header("garbage")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}
