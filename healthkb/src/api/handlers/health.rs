use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Query and dialog routes are served.
    pub query: bool,
    /// Storage events start ingestion jobs.
    pub ingestion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_store: Option<&'static str>,
}

/// Liveness plus which flows this instance serves. Makes no upstream
/// calls.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let query = state.query().ok();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        query: query.is_some(),
        ingestion: state.ingestion().is_ok(),
        chat_store: query.map(|q| q.store_backend()),
    })
}
