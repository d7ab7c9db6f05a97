/// Health, readiness and metrics endpoints
///
/// Supports two types of probes:
/// - Liveness: Is the application alive? (restart if not)
/// - Readiness: Can the application serve traffic? (remove from load balancer if not)

use crate::{
    context::AppContext,
    error::{FmsError, FmsResult},
    metrics,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Stored complaints; absent when the database is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complaints: Option<i64>,
    pub checks: Vec<ComponentHealth>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build health check routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health_basic))
        .route("/health/ready", get(readiness_probe))
        .route("/health/detailed", get(health_detailed))
        .route("/metrics", get(metrics_handler))
        .route("/api/test", get(api_test))
}

/// Basic liveness check
pub async fn health_basic(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": ctx.config.service.version
    }))
}

/// Smoke route kept for existing clients
pub async fn api_test() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "API is working!" }))
}

/// Readiness probe
///
/// Returns 200 if the database answers, 503 otherwise.
pub async fn readiness_probe(
    State(ctx): State<AppContext>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = check_database(&ctx).await {
        tracing::warn!(error = %e, "readiness_probe_failed: database check failed");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ready",
        "version": ctx.config.service.version
    })))
}

/// Detailed health check with all component statuses
pub async fn health_detailed(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let checks = vec![
        component("database", check_database(&ctx)).await,
        component("image_storage", check_image_storage(&ctx)).await,
    ];

    let healthy = checks.iter().all(|c| c.status == "healthy");
    let complaints = ctx.complaint_manager.count().await.ok();
    let health = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        version: ctx.config.service.version.clone(),
        uptime_seconds: metrics::uptime_seconds(),
        complaints,
        checks,
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// Prometheus text exposition
pub async fn metrics_handler() -> FmsResult<impl IntoResponse> {
    let body = metrics::render_metrics()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

async fn component(
    name: &str,
    check: impl std::future::Future<Output = FmsResult<()>>,
) -> ComponentHealth {
    let start = Instant::now();
    let result = check.await;
    let elapsed = Some(start.elapsed().as_millis() as u64);

    match result {
        Ok(()) => ComponentHealth {
            name: name.to_string(),
            status: "healthy".to_string(),
            response_time_ms: elapsed,
            error: None,
        },
        Err(e) => ComponentHealth {
            name: name.to_string(),
            status: "unhealthy".to_string(),
            response_time_ms: elapsed,
            error: Some(e.to_string()),
        },
    }
}

async fn check_database(ctx: &AppContext) -> FmsResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;
    Ok(())
}

async fn check_image_storage(ctx: &AppContext) -> FmsResult<()> {
    let root = ctx.image_store.root();
    let meta = tokio::fs::metadata(root).await?;
    if !meta.is_dir() {
        return Err(FmsError::ImageStorage(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_serialization() {
        let health = HealthStatus {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            uptime_seconds: 3600,
            complaints: Some(4),
            checks: vec![ComponentHealth {
                name: "database".to_string(),
                status: "healthy".to_string(),
                response_time_ms: Some(5),
                error: None,
            }],
        };

        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["complaints"], 4);
        assert_eq!(json["checks"][0]["name"], "database");
        assert!(json["checks"][0].get("error").is_none());
    }

    #[tokio::test]
    async fn test_component_reports_failure() {
        let check = async { Err(FmsError::Internal("disk gone".to_string())) };
        let health = component("image_storage", check).await;
        assert_eq!(health.status, "unhealthy");
        assert!(health.error.unwrap().contains("disk gone"));
    }
}
