//! Optional Bearer authentication for every route except health and the
//! OpenAPI document.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::HealthKbError;

use super::state::AppState;

/// With `HEALTHKB_API_KEYS` unset every request passes. Otherwise the
/// request needs `Authorization: Bearer <key>` with one of the keys.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let keys = &state.config.server.api_keys;
    if keys.is_empty() {
        return next.run(request).await;
    }

    let token = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(token) => token.trim(),
            None => {
                return HealthKbError::Unauthorized(
                    "Invalid authorization header format. Expected: Bearer <token>".to_string(),
                )
                .into_response();
            }
        },
        None => {
            return HealthKbError::Unauthorized("Missing authorization header".to_string())
                .into_response();
        }
    };

    if keys.iter().any(|k| k == token) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "Rejected request with unknown API key");
        HealthKbError::Unauthorized("Invalid API key".to_string()).into_response()
    }
}
