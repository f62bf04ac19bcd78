use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::aws::{resolve_endpoint, AwsClient, AwsRequest};
use crate::config::AwsConfig;
use crate::error::{HealthKbError, Result};
use crate::models::{Citation, Generation, RetrieveAndGenerateRequest};

use super::KnowledgeBase;

const SERVICE: &str = "bedrock-agent-runtime";
const SIGNING_NAME: &str = "bedrock";

/// `RetrieveAndGenerate` over the Bedrock agent runtime REST API.
#[derive(Clone)]
pub struct BedrockAgentRuntimeClient {
    aws: AwsClient,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveAndGenerateResponse {
    output: Option<Output>,
    session_id: Option<String>,
    #[serde(default)]
    citations: Vec<RawCitation>,
}

#[derive(Debug, Deserialize)]
struct Output {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCitation {
    generated_response_part: Option<GeneratedResponsePart>,
    #[serde(default)]
    retrieved_references: Vec<RetrievedReference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedResponsePart {
    text_response_part: Option<Output>,
}

#[derive(Debug, Deserialize)]
struct RetrievedReference {
    location: Option<serde_json::Value>,
}

impl RetrievedReference {
    /// The typed location block holds the uri (`s3Location.uri`,
    /// `webLocation.url`, ...); take whichever is present.
    fn source(&self) -> Option<String> {
        let location = self.location.as_ref()?.as_object()?;
        location
            .values()
            .filter_map(|v| v.as_object())
            .find_map(|inner| inner.get("uri").or_else(|| inner.get("url")))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

impl From<RawCitation> for Citation {
    fn from(raw: RawCitation) -> Self {
        Citation {
            text: raw
                .generated_response_part
                .and_then(|p| p.text_response_part)
                .and_then(|p| p.text),
            sources: raw
                .retrieved_references
                .iter()
                .filter_map(RetrievedReference::source)
                .collect(),
        }
    }
}

impl BedrockAgentRuntimeClient {
    pub fn new(aws: AwsClient, config: &AwsConfig) -> Result<Self> {
        let endpoint = resolve_endpoint(
            config.bedrock_agent_runtime_endpoint.as_deref(),
            SERVICE,
            &config.region,
        )?;
        Ok(Self::with_endpoint(aws, endpoint))
    }

    pub fn with_endpoint(aws: AwsClient, endpoint: Url) -> Self {
        Self { aws, endpoint }
    }

    /// Appends to the endpoint path, so an override with a path prefix
    /// keeps it.
    fn operation_url(&self) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                HealthKbError::Config(format!("invalid {SERVICE} endpoint: {}", self.endpoint))
            })?
            .pop_if_empty()
            .push("retrieveAndGenerate");
        Ok(url)
    }
}

#[async_trait]
impl KnowledgeBase for BedrockAgentRuntimeClient {
    async fn retrieve_and_generate(
        &self,
        request: &RetrieveAndGenerateRequest,
    ) -> Result<Generation> {
        let url = self.operation_url()?;
        let body = json!({
            "input": { "text": request.text },
            "retrieveAndGenerateConfiguration": {
                "type": "KNOWLEDGE_BASE",
                "knowledgeBaseConfiguration": {
                    "knowledgeBaseId": request.knowledge_base_id,
                    "modelArn": request.model_arn,
                }
            }
        });

        tracing::debug!(
            knowledge_base_id = %request.knowledge_base_id,
            question_len = request.text.len(),
            "Calling retrieve-and-generate"
        );

        let value = self
            .aws
            .send(
                &AwsRequest::new(SERVICE, SIGNING_NAME, Method::POST, url)
                    .header("content-type", "application/json")
                    .json(body),
            )
            .await?;

        let response: RetrieveAndGenerateResponse =
            serde_json::from_value(value).map_err(|e| invalid_response(e.to_string()))?;

        let text = response
            .output
            .and_then(|o| o.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| invalid_response("response has no output text".to_string()))?;

        Ok(Generation {
            text,
            session_id: response.session_id,
            citations: response.citations.into_iter().map(Citation::from).collect(),
        })
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::{AwsCredentials, RetryPolicy, SigV4Signer};
    use std::time::Duration;

    fn client(endpoint: &str) -> BedrockAgentRuntimeClient {
        let signer = SigV4Signer::new(
            AwsCredentials {
                access_key_id: "AKID".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
            },
            "us-east-1",
        );
        let aws = AwsClient::with_signer(signer, Duration::from_secs(5), RetryPolicy::none()).unwrap();
        BedrockAgentRuntimeClient::with_endpoint(aws, Url::parse(endpoint).unwrap())
    }

    #[test]
    fn operation_url_on_bare_host() {
        let url = client("https://bedrock-agent-runtime.us-east-1.amazonaws.com")
            .operation_url()
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://bedrock-agent-runtime.us-east-1.amazonaws.com/retrieveAndGenerate"
        );
    }

    #[test]
    fn operation_url_keeps_path_prefix() {
        for endpoint in ["http://proxy.local/bedrock", "http://proxy.local/bedrock/"] {
            let url = client(endpoint).operation_url().unwrap();
            assert_eq!(url.path(), "/bedrock/retrieveAndGenerate", "endpoint {endpoint}");
        }
    }
}
