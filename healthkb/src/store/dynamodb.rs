use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use url::Url;

use crate::aws::{resolve_endpoint, AwsClient, AwsRequest};
use crate::config::AwsConfig;
use crate::error::{HealthKbError, Result};
use crate::models::ChatRecord;

use super::ChatStore;

const SERVICE: &str = "dynamodb";
const CONTENT_TYPE: &str = "application/x-amz-json-1.0";
const TARGET_PREFIX: &str = "DynamoDB_20120810";

/// Chat records in a DynamoDB table keyed by `id` (string partition key).
#[derive(Clone)]
pub struct DynamoDbChatStore {
    aws: AwsClient,
    endpoint: Url,
    table_name: String,
}

impl DynamoDbChatStore {
    pub fn new(aws: AwsClient, config: &AwsConfig, table_name: String) -> Result<Self> {
        let endpoint = resolve_endpoint(config.dynamodb_endpoint.as_deref(), SERVICE, &config.region)?;
        Ok(Self::with_endpoint(aws, endpoint, table_name))
    }

    pub fn with_endpoint(aws: AwsClient, endpoint: Url, table_name: String) -> Self {
        Self {
            aws,
            endpoint,
            table_name,
        }
    }

    async fn call(&self, operation: &str, body: Value) -> Result<Value> {
        let request = AwsRequest::new(SERVICE, SERVICE, Method::POST, self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", format!("{TARGET_PREFIX}.{operation}"))
            .json(body);
        self.aws.send(&request).await
    }
}

fn to_item(record: &ChatRecord) -> Value {
    json!({
        "id": { "S": record.id },
        "question": { "S": record.question },
        "response": { "S": record.response },
        "created_at": { "S": record.created_at.to_rfc3339() },
    })
}

fn string_attr(item: &Value, name: &str) -> Result<String> {
    item[name]["S"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| HealthKbError::Internal(format!("chat item is missing string attribute '{name}'")))
}

fn from_item(item: &Value) -> Result<ChatRecord> {
    // Items written before created_at existed only carry the three core
    // attributes.
    let created_at = item["created_at"]["S"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    Ok(ChatRecord {
        id: string_attr(item, "id")?,
        question: string_attr(item, "question")?,
        response: string_attr(item, "response")?,
        created_at,
    })
}

#[async_trait]
impl ChatStore for DynamoDbChatStore {
    async fn put_record(&self, record: &ChatRecord) -> Result<()> {
        let body = json!({
            "TableName": self.table_name,
            "Item": to_item(record),
            "ConditionExpression": "attribute_not_exists(id)",
        });

        match self.call("PutItem", body).await {
            Ok(_) => Ok(()),
            Err(HealthKbError::Aws { code, .. }) if code == "ConditionalCheckFailedException" => {
                // A retried attempt fails the condition when an earlier
                // attempt committed but its response was lost.
                match self.get_record(&record.id).await? {
                    Some(stored)
                        if stored.question == record.question
                            && stored.response == record.response =>
                    {
                        tracing::debug!(id = %record.id, "Chat record already written by an earlier attempt");
                        Ok(())
                    }
                    _ => Err(HealthKbError::Conflict(format!(
                        "chat record {} already exists",
                        record.id
                    ))),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn get_record(&self, id: &str) -> Result<Option<ChatRecord>> {
        let body = json!({
            "TableName": self.table_name,
            "Key": { "id": { "S": id } },
            "ConsistentRead": true,
        });

        let response = self.call("GetItem", body).await?;
        match response.get("Item") {
            Some(item) if item.is_object() => from_item(item).map(Some),
            _ => Ok(None),
        }
    }

    fn backend(&self) -> &'static str {
        "dynamodb"
    }
}
