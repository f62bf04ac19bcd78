use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::extractors::QuestionBody;
use crate::api::response::ErrorResponse;
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{ChatRecord, QueryRequest, QueryResult};

/// Answer a question from the knowledge base and record the exchange.
#[utoipa::path(
    post,
    path = "/query",
    tag = "query",
    request_body(
        content = QueryRequest,
        description = "`{\"question\"}` as JSON, or the raw question text with any other content type",
    ),
    responses(
        (status = 200, description = "Generated answer", body = QueryResult),
        (status = 400, description = "Empty question", body = ErrorResponse),
        (status = 502, description = "Knowledge base or chat store failed", body = ErrorResponse),
        (status = 503, description = "Query flow not configured", body = ErrorResponse),
    )
)]
pub async fn query(
    State(state): State<AppState>,
    QuestionBody(question): QuestionBody,
) -> Result<Json<QueryResult>> {
    let result = state.query()?.answer(&question).await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/chats/{id}",
    tag = "query",
    params(("id" = String, Path, description = "Chat record id")),
    responses(
        (status = 200, description = "Stored chat record", body = ChatRecord),
        (status = 404, description = "No such record", body = ErrorResponse),
    )
)]
pub async fn get_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatRecord>> {
    let record = state.query()?.get_record(&id).await?;
    Ok(Json(record))
}
