//! Shared helpers for HTTP contract tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use fixmystreet::{
    analyzer::{DamageAnalyzer, DamageAssessment},
    config::ServerConfig,
    context::AppContext,
    db,
    error::{FmsError, FmsResult},
    server::build_router,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PUBLIC_URL: &str = "http://fms.test";

// 1x1 RGBA PNG
pub const PNG_PIXEL: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Analyzer double with a canned answer
pub struct StubAnalyzer {
    response: Option<DamageAssessment>,
    calls: AtomicUsize,
}

impl StubAnalyzer {
    pub fn returning(assessment: DamageAssessment) -> Arc<Self> {
        Arc::new(Self {
            response: Some(assessment),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            response: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DamageAnalyzer for StubAnalyzer {
    async fn analyze(
        &self,
        _image: Vec<u8>,
        _file_name: &str,
        _mime_type: &str,
    ) -> FmsResult<DamageAssessment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .clone()
            .ok_or_else(|| FmsError::Analyzer("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub ctx: AppContext,
    pub upload_dir: TempDir,
}

pub fn test_config(upload_dir: &TempDir) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.service.public_url = PUBLIC_URL.to_string();
    config.storage.upload_directory = upload_dir.path().to_path_buf();
    config.rate_limit.enabled = false;
    config
}

pub async fn spawn_app(analyzer: Arc<dyn DamageAnalyzer>) -> TestApp {
    spawn_app_with(analyzer, |_| {}).await
}

pub async fn spawn_app_with(
    analyzer: Arc<dyn DamageAnalyzer>,
    configure: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let upload_dir = TempDir::new().unwrap();
    let mut config = test_config(&upload_dir);
    configure(&mut config);

    let pool = db::create_memory_pool().await.unwrap();
    let ctx = AppContext::from_parts(config, pool, analyzer);
    let router = build_router(ctx.clone());

    TestApp {
        router,
        ctx,
        upload_dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, body) = self.send_raw(request).await;
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn send_raw(
        &self,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, body.to_vec())
    }

    pub async fn register(&self, email: &str, is_admin: bool) -> String {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                "/api/register",
                None,
                json!({
                    "name": "Test Citizen",
                    "email": email,
                    "password": "password123",
                    "password_confirmation": "password123",
                    "is_admin": is_admin,
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn submit(&self, token: &str, issue_type: &str) -> (StatusCode, Value) {
        let form = MultipartForm::new()
            .text("latitude", "12.9715987")
            .text("longitude", "77.5945627")
            .text("issue_type", issue_type)
            .text("details", "Large pothole in the left lane")
            .file("image", "pothole.png", "image/png", PNG_PIXEL);
        self.send(form.request("/api/complaints", Some(token))).await
    }
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Hand-built multipart/form-data body
pub struct MultipartForm {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self {
            boundary: "----fixmystreet-test-boundary",
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn request(mut self, uri: &str, token: Option<&str>) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .header(header::ACCEPT, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(self.body)).unwrap()
    }
}
