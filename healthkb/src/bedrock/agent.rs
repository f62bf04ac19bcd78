use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::aws::{resolve_endpoint, AwsClient, AwsRequest};
use crate::config::AwsConfig;
use crate::error::{HealthKbError, Result};
use crate::models::{IngestionJob, IngestionJobRequest};

use super::IngestionClient;

const SERVICE: &str = "bedrock-agent";
const SIGNING_NAME: &str = "bedrock";

/// Ingestion-job control plane of the Bedrock agent REST API.
#[derive(Clone)]
pub struct BedrockAgentClient {
    aws: AwsClient,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestionJobEnvelope {
    ingestion_job: Option<IngestionJob>,
}

impl BedrockAgentClient {
    pub fn new(aws: AwsClient, config: &AwsConfig) -> Result<Self> {
        let endpoint =
            resolve_endpoint(config.bedrock_agent_endpoint.as_deref(), SERVICE, &config.region)?;
        Ok(Self::with_endpoint(aws, endpoint))
    }

    pub fn with_endpoint(aws: AwsClient, endpoint: Url) -> Self {
        Self { aws, endpoint }
    }

    /// `/knowledgebases/{kb}/datasources/{ds}/ingestionjobs/` followed by
    /// `tail`. Identifiers are percent-encoded as path segments.
    fn jobs_url(&self, knowledge_base_id: &str, data_source_id: &str, tail: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                HealthKbError::Config(format!("invalid {SERVICE} endpoint: {}", self.endpoint))
            })?
            .pop_if_empty()
            .extend([
                "knowledgebases",
                knowledge_base_id,
                "datasources",
                data_source_id,
                "ingestionjobs",
                tail,
            ]);
        Ok(url)
    }

    async fn send(&self, request: AwsRequest) -> Result<IngestionJob> {
        let value = self.aws.send(&request).await?;
        let envelope: IngestionJobEnvelope =
            serde_json::from_value(value).map_err(|e| invalid_response(e.to_string()))?;
        envelope
            .ingestion_job
            .ok_or_else(|| invalid_response("response has no ingestionJob".to_string()))
    }
}

#[async_trait]
impl IngestionClient for BedrockAgentClient {
    async fn start_ingestion_job(&self, request: &IngestionJobRequest) -> Result<IngestionJob> {
        let url = self.jobs_url(&request.knowledge_base_id, &request.data_source_id, "")?;
        let body = json!({ "clientToken": request.client_token.as_str() });

        self.send(
            AwsRequest::new(SERVICE, SIGNING_NAME, Method::PUT, url)
                .header("content-type", "application/json")
                .json(body),
        )
        .await
    }

    async fn get_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        ingestion_job_id: &str,
    ) -> Result<IngestionJob> {
        let url = self.jobs_url(knowledge_base_id, data_source_id, ingestion_job_id)?;
        match self
            .send(AwsRequest::new(SERVICE, SIGNING_NAME, Method::GET, url))
            .await
        {
            Err(HealthKbError::Aws { code, .. }) if code == "ResourceNotFoundException" => Err(
                HealthKbError::NotFound(format!("ingestion job {ingestion_job_id}")),
            ),
            other => other,
        }
    }
}

fn invalid_response(message: String) -> HealthKbError {
    HealthKbError::Aws {
        service: SERVICE.to_string(),
        status: 200,
        code: "InvalidResponse".to_string(),
        message,
    }
}
