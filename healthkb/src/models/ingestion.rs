use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aws::signing::hex_sha256;
use crate::error::{HealthKbError, Result};

const CLIENT_TOKEN_PREFIX: &str = "healthkb-";

/// Idempotency token for `StartIngestionJob`.
///
/// Derived from the invocation's request id: a redelivered notification
/// carries the same id and therefore the same token, so the service never
/// starts a second job for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientToken(String);

impl ClientToken {
    pub fn from_request_id(request_id: &str) -> Result<Self> {
        let request_id = request_id.trim();
        if request_id.is_empty() {
            return Err(HealthKbError::Validation(
                "request id must not be empty".to_string(),
            ));
        }
        Ok(Self(format!(
            "{CLIENT_TOKEN_PREFIX}{}",
            hex_sha256(request_id.as_bytes())
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionJobRequest {
    pub knowledge_base_id: String,
    pub data_source_id: String,
    pub client_token: ClientToken,
}

/// Job descriptor returned by the knowledge-base service.
///
/// Identity and status are typed; everything else the service sends
/// (timestamps, statistics, failure reasons) is kept as-is so callers see
/// the full descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestionJob {
    pub knowledge_base_id: String,
    pub data_source_id: String,
    pub ingestion_job_id: String,
    /// `STARTING`, `IN_PROGRESS`, `COMPLETE`, `FAILED`, ...
    pub status: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

/// Body returned by the ingestion routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestionAck {
    /// `null` when the notification did not start a job.
    pub ingestion_job: Option<IngestionJob>,
}

/// Object-storage notification.
///
/// Only read for logging: any change triggers a full ingestion job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StorageRecord>,
    /// Set on the `s3:TestEvent` sent when a notification is configured.
    #[serde(rename = "Event")]
    pub event: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Bucket {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Object {
    #[serde(default)]
    pub key: String,
}

impl StorageEvent {
    /// Parse a notification body. Anything unreadable is treated as an
    /// event with no records.
    pub fn parse_lenient(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn is_test_event(&self) -> bool {
        self.event.as_deref() == Some("s3:TestEvent")
    }

    /// `bucket/key` for each record, for logging.
    pub fn object_keys(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.s3.as_ref())
            .map(|s3| format!("{}/{}", s3.bucket.name, s3.object.key))
            .collect()
    }
}
