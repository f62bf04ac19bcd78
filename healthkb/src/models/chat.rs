use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("question must not be empty".into());
        return Err(err);
    }
    Ok(())
}

/// Free-text question from an HTTP body or a dialog slot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct QueryRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub question: String,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
        }
    }
}

/// Body returned by `POST /query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QueryResult {
    /// The question as supplied by the caller.
    pub question: String,
    /// Text generated from the knowledge base.
    pub response: String,
}

/// Persisted question/answer pair. One record per answered query; records
/// are never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChatRecord {
    /// UUID v4.
    pub id: String,
    pub question: String,
    pub response: String,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl ChatRecord {
    pub fn new(question: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            response: response.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveAndGenerateRequest {
    pub text: String,
    pub knowledge_base_id: String,
    pub model_arn: String,
}

/// Output of a retrieve-and-generate call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    /// Upstream conversation session, when the service returns one.
    pub session_id: Option<String>,
    pub citations: Vec<Citation>,
}

/// A span of the generated answer and the documents it was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citation {
    pub text: Option<String>,
    pub sources: Vec<String>,
}
