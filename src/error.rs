/// Unified error types for the FixMyStreet API
use crate::validation::FieldErrors;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Main error type for the API
#[derive(Error, Debug)]
pub enum FmsError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Request data failed validation (one or more fields)
    #[error("Validation failed: {}", .0.summary())]
    Validation(FieldErrors),

    /// Missing, unknown or expired bearer token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authenticated but not allowed
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Malformed request that is not a field-level validation problem
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body over the configured limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image storage errors
    #[error("Image storage error: {0}")]
    ImageStorage(String),

    /// Damage analyzer call failed
    #[error("Analyzer error: {0}")]
    Analyzer(String),

    /// Password hashing errors
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FmsError {
    /// Shorthand for a validation error on a single field
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        FmsError::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FmsError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FmsError::Authentication(_) => StatusCode::UNAUTHORIZED,
            FmsError::Authorization(_) => StatusCode::FORBIDDEN,
            FmsError::BadRequest(_) => StatusCode::BAD_REQUEST,
            FmsError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            FmsError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            FmsError::NotFound(_) => StatusCode::NOT_FOUND,
            FmsError::Database(_)
            | FmsError::ImageStorage(_)
            | FmsError::Analyzer(_)
            | FmsError::PasswordHash(_)
            | FmsError::Config(_)
            | FmsError::Internal(_)
            | FmsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body, shaped like the original framework's responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Convert FmsError to HTTP response
impl IntoResponse for FmsError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            FmsError::Validation(errors) => ErrorResponse {
                message: errors.summary(),
                errors: Some(errors.to_map()),
            },
            FmsError::Authentication(_) => ErrorResponse {
                message: "Unauthenticated.".to_string(),
                errors: None,
            },
            FmsError::Authorization(_) => ErrorResponse {
                message: "This action is unauthorized.".to_string(),
                errors: None,
            },
            FmsError::RateLimitExceeded { .. } => ErrorResponse {
                message: "Too Many Attempts.".to_string(),
                errors: None,
            },
            FmsError::NotFound(msg) | FmsError::BadRequest(msg) | FmsError::PayloadTooLarge(msg) => {
                ErrorResponse {
                    message: msg.clone(),
                    errors: None,
                }
            }
            _ => {
                // Details go to the log, never to the client
                tracing::error!(error = %self, "request_failed");
                ErrorResponse {
                    message: "Server Error".to_string(),
                    errors: None,
                }
            }
        };

        let mut response = (status, Json(body)).into_response();

        if let FmsError::RateLimitExceeded { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Result type alias for API operations
pub type FmsResult<T> = Result<T, FmsError>;
