//! Error contract shared by every route.
//!
//! Success bodies are route-specific (`{question, response}`, a dialog
//! directive, `{ingestionJob}`); failures always look like:
//!
//! ```json
//! { "error": { "code": "upstream_error", "message": "..." } }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::HealthKbError;

/// Machine-readable error code, serialized as snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// HTTP 400.
    InvalidRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 404.
    NotFound,
    /// HTTP 409.
    Conflict,
    /// HTTP 413.
    PayloadTooLarge,
    /// A knowledge-base or table call failed. HTTP 502.
    UpstreamError,
    /// The flow is not configured, or upstream is throttling. HTTP 503.
    ServiceUnavailable,
    /// HTTP 500.
    InternalError,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UpstreamError => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Safe to show to end users; internal details are never included.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ApiError,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ApiError {
                code,
                message: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.error.code.status()
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<HealthKbError> for ErrorResponse {
    /// Client-caused errors keep their message. Upstream and internal
    /// failures are logged here and replaced with a generic message.
    fn from(err: HealthKbError) -> Self {
        match err {
            HealthKbError::Validation(msg) => ErrorResponse::new(ErrorCode::InvalidRequest, msg),
            HealthKbError::MalformedEvent(msg) => {
                ErrorResponse::new(ErrorCode::InvalidRequest, format!("Malformed event: {msg}"))
            }
            HealthKbError::Unauthorized(msg) => ErrorResponse::new(ErrorCode::Unauthorized, msg),
            HealthKbError::NotFound(msg) => {
                ErrorResponse::new(ErrorCode::NotFound, format!("{msg} not found"))
            }
            HealthKbError::Conflict(msg) => ErrorResponse::new(ErrorCode::Conflict, msg),
            HealthKbError::PayloadTooLarge(msg) => {
                ErrorResponse::new(ErrorCode::PayloadTooLarge, msg)
            }
            HealthKbError::NotConfigured(msg) => ErrorResponse::new(
                ErrorCode::ServiceUnavailable,
                format!("{msg} is not configured"),
            ),
            ref throttled @ HealthKbError::Throttled { .. } => {
                tracing::warn!(error = %throttled, "Upstream throttling");
                ErrorResponse::new(
                    ErrorCode::ServiceUnavailable,
                    "The service is busy, please retry later",
                )
            }
            ref upstream @ (HealthKbError::Aws { .. } | HealthKbError::Http(_)) => {
                tracing::error!(error = %upstream, "Upstream call failed");
                ErrorResponse::new(ErrorCode::UpstreamError, "An upstream service call failed")
            }
            ref internal @ (HealthKbError::Config(_)
            | HealthKbError::Database(_)
            | HealthKbError::Json(_)
            | HealthKbError::UrlParse(_)
            | HealthKbError::Internal(_)) => {
                tracing::error!(error = %internal, "Internal error");
                ErrorResponse::new(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}
