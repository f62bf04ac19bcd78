use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};

use crate::api::extractors::InvocationId;
use crate::api::response::ErrorResponse;
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{IngestionAck, IngestionJob, StorageEvent};

/// Object-storage notification: start a full ingestion job.
///
/// The body is read only for logging; the job's client token comes from
/// the invocation's request id.
#[utoipa::path(
    post,
    path = "/events/storage",
    tag = "ingestion",
    request_body(content = Object, description = "Storage notification (any JSON)"),
    responses(
        (status = 200, description = "Job started, or `null` for a test event", body = IngestionAck),
        (status = 502, description = "Ingestion could not be started", body = ErrorResponse),
        (status = 503, description = "Ingestion flow not configured", body = ErrorResponse),
    )
)]
pub async fn storage_event(
    State(state): State<AppState>,
    InvocationId(request_id): InvocationId,
    body: Bytes,
) -> Result<Json<IngestionAck>> {
    let ingestion = state.ingestion()?;
    let event = StorageEvent::parse_lenient(&body);

    if event.is_test_event() {
        tracing::info!(request_id = %request_id, "Storage test event acknowledged");
        return Ok(Json(IngestionAck {
            ingestion_job: None,
        }));
    }

    tracing::info!(
        request_id = %request_id,
        records = event.records.len(),
        objects = ?event.object_keys(),
        "Storage change received"
    );
    let job = ingestion.start(&request_id).await?;

    Ok(Json(IngestionAck {
        ingestion_job: Some(job),
    }))
}

#[utoipa::path(
    get,
    path = "/ingestion-jobs/{jobId}",
    tag = "ingestion",
    params(("jobId" = String, Path, description = "Ingestion job id")),
    responses(
        (status = 200, description = "Job descriptor", body = IngestionJob),
        (status = 502, description = "Lookup failed", body = ErrorResponse),
    )
)]
pub async fn get_ingestion_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<IngestionJob>> {
    let job = state.ingestion()?.status(&job_id).await?;
    Ok(Json(job))
}
