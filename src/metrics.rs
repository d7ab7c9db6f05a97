/// Metrics for the FixMyStreet API
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Account registrations and logins
/// - Complaint submissions and status updates
/// - Damage analyzer calls

use crate::error::{FmsError, FmsResult};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    Encoder, Histogram, HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Account Metrics ==========

    /// Accounts created, split by admin flag
    pub static ref ACCOUNTS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "accounts_created_total",
        "Total number of accounts created",
        &["admin"]
    )
    .unwrap();

    /// Login attempts by outcome
    pub static ref LOGINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "logins_total",
        "Total number of login attempts",
        &["outcome"]
    )
    .unwrap();

    // ========== Complaint Metrics ==========

    /// Complaints submitted by issue type
    pub static ref COMPLAINTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "complaints_submitted_total",
        "Total number of complaints submitted",
        &["issue_type", "severity"]
    )
    .unwrap();

    /// Status updates by new status
    pub static ref COMPLAINT_STATUS_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "complaint_status_updates_total",
        "Total number of complaint status updates",
        &["status"]
    )
    .unwrap();

    // ========== Analyzer Metrics ==========

    /// Analyzer calls by outcome
    pub static ref ANALYZER_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "analyzer_requests_total",
        "Total number of damage analyzer requests",
        &["outcome"]
    )
    .unwrap();

    /// Analyzer call duration in seconds
    pub static ref ANALYZER_DURATION_SECONDS: Histogram = register_histogram!(
        "analyzer_duration_seconds",
        "Damage analyzer latencies in seconds",
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // ========== System Metrics ==========

    /// Process uptime in seconds
    pub static ref UPTIME_SECONDS: IntGauge = register_int_gauge!(
        "uptime_seconds",
        "Seconds since the server started"
    )
    .unwrap();

    static ref STARTED_AT: Instant = Instant::now();
}

/// Pin the uptime clock to now
pub fn init() {
    lazy_static::initialize(&STARTED_AT);
}

pub fn uptime_seconds() -> u64 {
    STARTED_AT.elapsed().as_secs()
}

/// Render all metrics in Prometheus text format
pub fn render_metrics() -> FmsResult<String> {
    UPTIME_SECONDS.set(uptime_seconds() as i64);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| FmsError::Internal(format!("Failed to encode metrics: {}", e)))?;

    String::from_utf8(buffer)
        .map_err(|e| FmsError::Internal(format!("Metrics are not UTF-8: {}", e)))
}

pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

pub fn record_account_creation(is_admin: bool) {
    ACCOUNTS_CREATED_TOTAL
        .with_label_values(&[if is_admin { "true" } else { "false" }])
        .inc();
}

pub fn record_login(success: bool) {
    LOGINS_TOTAL
        .with_label_values(&[if success { "success" } else { "failure" }])
        .inc();
}

pub fn record_complaint_submitted(issue_type: &str, severity: &str) {
    COMPLAINTS_SUBMITTED_TOTAL
        .with_label_values(&[issue_type, severity])
        .inc();
}

pub fn record_status_update(status: &str) {
    COMPLAINT_STATUS_UPDATES_TOTAL
        .with_label_values(&[status])
        .inc();
}

pub fn record_analyzer_call(success: bool, duration: f64) {
    ANALYZER_REQUESTS_TOTAL
        .with_label_values(&[if success { "success" } else { "failure" }])
        .inc();
    ANALYZER_DURATION_SECONDS.observe(duration);
}
