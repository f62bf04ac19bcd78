use axum::Json;
use utoipa::OpenApi;

use super::handlers;
use super::response;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HealthKB API",
        description = "Question answering over a health knowledge base, a conversational-bot dialog hook, and storage-triggered re-ingestion.",
    ),
    paths(
        handlers::health::health_check,
        handlers::query::query,
        handlers::query::get_chat,
        handlers::dialog::dialog_hook,
        handlers::ingestion::storage_event,
        handlers::ingestion::get_ingestion_job,
    ),
    components(schemas(
        response::ErrorCode,
        response::ApiError,
        response::ErrorResponse,
        models::QueryRequest,
        models::QueryResult,
        models::ChatRecord,
        models::DialogEvent,
        models::DialogResponse,
        models::SessionState,
        models::Intent,
        models::InvocationSource,
        models::DialogAction,
        models::DialogActionType,
        models::Message,
        models::IngestionJob,
        models::IngestionAck,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "query", description = "Knowledge-base questions and stored answers"),
        (name = "dialog", description = "Conversational-bot dialog code hook"),
        (name = "ingestion", description = "Storage-triggered data-source ingestion"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
