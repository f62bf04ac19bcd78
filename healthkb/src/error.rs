use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ErrorResponse;

#[derive(Error, Debug)]
pub enum HealthKbError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{service} request failed (HTTP {status}, {code}): {message}")]
    Aws {
        service: String,
        status: u16,
        code: String,
        message: String,
    },

    #[error("{service} throttled the request")]
    Throttled { service: String },

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl HealthKbError {
    /// Whether a retry of the same upstream call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            HealthKbError::Throttled { .. } => true,
            HealthKbError::Aws { status, .. } => *status >= 500,
            HealthKbError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

impl IntoResponse for HealthKbError {
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, HealthKbError>;
