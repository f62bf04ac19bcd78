use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::extract::rejection::BytesRejection;
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use serde::Deserialize;

use crate::error::HealthKbError;
use crate::models::QueryRequest;

const LAMBDA_CONTEXT: &str = "x-amzn-lambda-context";
const LAMBDA_REQUEST_ID: &str = "lambda-runtime-aws-request-id";
const AMZ_REQUEST_ID: &str = "x-amz-request-id";
const REQUEST_ID: &str = "x-request-id";

/// The invocation's request id, the source of ingestion idempotency.
///
/// Function-runtime ids win over the generic `x-request-id` so that a
/// platform redelivery, which reuses its id, maps to the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationId(pub String);

#[derive(Deserialize)]
struct LambdaContext {
    request_id: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl InvocationId {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let from_context = header_str(headers, LAMBDA_CONTEXT)
            .and_then(|raw| serde_json::from_str::<LambdaContext>(raw).ok())
            .and_then(|ctx| ctx.request_id)
            .filter(|id| !id.trim().is_empty());

        from_context
            .or_else(|| {
                [LAMBDA_REQUEST_ID, AMZ_REQUEST_ID, REQUEST_ID]
                    .into_iter()
                    .find_map(|name| header_str(headers, name))
                    .map(str::to_string)
            })
            .map(InvocationId)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for InvocationId {
    type Rejection = HealthKbError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        InvocationId::from_headers(&parts.headers).ok_or_else(|| {
            HealthKbError::Validation("request has no request id".to_string())
        })
    }
}

/// Question from a `POST /query` body: `{"question": ...}` when the
/// content type is JSON, otherwise the raw body text.
#[derive(Debug, Clone)]
pub struct QuestionBody(pub String);

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

fn map_json_error(err: serde_json::Error) -> HealthKbError {
    let message = err.to_string();
    match extract_missing_field(&message) {
        Some(field) => HealthKbError::Validation(format!("Missing required field: {field}")),
        None => HealthKbError::Validation(format!("Invalid JSON: {message}")),
    }
}

fn map_body_error(err: BytesRejection) -> HealthKbError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        HealthKbError::PayloadTooLarge(err.body_text())
    } else {
        HealthKbError::Validation(format!("Failed to read request body: {err}"))
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}

impl<S: Send + Sync> FromRequest<S> for QuestionBody {
    type Rejection = HealthKbError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let json = is_json(req.headers());
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(map_body_error)?;

        if json {
            let request: QueryRequest = serde_json::from_slice(&bytes).map_err(map_json_error)?;
            return Ok(QuestionBody(request.question));
        }

        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| HealthKbError::Validation("body is not valid UTF-8".to_string()))?;
        Ok(QuestionBody(text))
    }
}
