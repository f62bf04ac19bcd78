#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map};

use healthkb::api::AppState;
use healthkb::aws::{AwsClient, AwsCredentials, RetryPolicy, SigV4Signer};
use healthkb::bedrock::{IngestionClient, KnowledgeBase};
use healthkb::config::{
    AwsConfig, ChatStoreConfig, Config, IngestionConfig, QueryConfig, ServerConfig,
};
use healthkb::error::{HealthKbError, Result};
use healthkb::models::{
    ChatRecord, Generation, IngestionJob, IngestionJobRequest, RetrieveAndGenerateRequest,
};
use healthkb::services::{IngestionService, QueryService};
use healthkb::store::ChatStore;

pub const KB_ID: &str = "kb1";
pub const DS_ID: &str = "ds1";
pub const MODEL_ARN: &str = "arn:aws:bedrock:us-east-1::foundation-model/anthropic.claude-v2";

/// Knowledge base that answers with a fixed text, or fails.
#[derive(Default)]
pub struct StubKnowledgeBase {
    answer: Option<String>,
    pub requests: Mutex<Vec<RetrieveAndGenerateRequest>>,
}

impl StubKnowledgeBase {
    pub fn answering(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<RetrieveAndGenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeBase for StubKnowledgeBase {
    async fn retrieve_and_generate(&self, request: &RetrieveAndGenerateRequest) -> Result<Generation> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.answer {
            Some(text) => Ok(Generation {
                text: text.clone(),
                session_id: Some("kb-session".to_string()),
                citations: Vec::new(),
            }),
            None => Err(HealthKbError::Aws {
                service: "bedrock-agent-runtime".to_string(),
                status: 500,
                code: "InternalServerException".to_string(),
                message: "model unavailable".to_string(),
            }),
        }
    }
}

/// In-memory chat store; optionally rejects every write.
#[derive(Default)]
pub struct StubChatStore {
    fail_writes: bool,
    pub records: Mutex<HashMap<String, ChatRecord>>,
}

impl StubChatStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_writes: true,
            records: Mutex::new(HashMap::new()),
        })
    }

    pub fn all(&self) -> Vec<ChatRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl ChatStore for StubChatStore {
    async fn put_record(&self, record: &ChatRecord) -> Result<()> {
        if self.fail_writes {
            return Err(HealthKbError::Aws {
                service: "dynamodb".to_string(),
                status: 400,
                code: "ResourceNotFoundException".to_string(),
                message: "Requested resource not found".to_string(),
            });
        }
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(HealthKbError::Conflict(record.id.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<ChatRecord>> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Ingestion client that echoes the request back as the job descriptor.
#[derive(Default)]
pub struct StubIngestionClient {
    pub requests: Mutex<Vec<IngestionJobRequest>>,
}

impl StubIngestionClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn tokens(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.client_token.as_str().to_string())
            .collect()
    }
}

pub fn echo_job(knowledge_base_id: &str, data_source_id: &str, job_id: &str, token: &str) -> IngestionJob {
    let mut extra = Map::new();
    extra.insert("clientToken".to_string(), json!(token));
    IngestionJob {
        knowledge_base_id: knowledge_base_id.to_string(),
        data_source_id: data_source_id.to_string(),
        ingestion_job_id: job_id.to_string(),
        status: "STARTING".to_string(),
        extra,
    }
}

#[async_trait]
impl IngestionClient for StubIngestionClient {
    async fn start_ingestion_job(&self, request: &IngestionJobRequest) -> Result<IngestionJob> {
        self.requests.lock().unwrap().push(request.clone());
        let token = request.client_token.as_str();
        Ok(echo_job(
            &request.knowledge_base_id,
            &request.data_source_id,
            &format!("job-{}", &token[token.len() - 10..]),
            token,
        ))
    }

    async fn get_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        ingestion_job_id: &str,
    ) -> Result<IngestionJob> {
        if ingestion_job_id == "missing" {
            return Err(HealthKbError::NotFound(format!("ingestion job {ingestion_job_id}")));
        }
        let mut job = echo_job(knowledge_base_id, data_source_id, ingestion_job_id, "");
        job.status = "COMPLETE".to_string();
        job.extra.clear();
        Ok(job)
    }
}

pub fn aws_config() -> AwsConfig {
    AwsConfig {
        region: "us-east-1".to_string(),
        access_key_id: Some("AKIDEXAMPLE".to_string()),
        secret_access_key: Some("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string()),
        session_token: None,
        bedrock_agent_runtime_endpoint: None,
        bedrock_agent_endpoint: None,
        dynamodb_endpoint: None,
        timeout_secs: 5,
        retry_max_elapsed_secs: 0,
    }
}

/// Signed client with no retries, for pointing at a mock server.
pub fn aws_client() -> AwsClient {
    aws_client_with_retry(RetryPolicy::none())
}

pub fn aws_client_with_retry(retry: RetryPolicy) -> AwsClient {
    let signer = SigV4Signer::new(
        AwsCredentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            session_token: None,
        },
        "us-east-1",
    );
    AwsClient::with_signer(signer, Duration::from_secs(5), retry).unwrap()
}

pub fn query_config() -> QueryConfig {
    QueryConfig {
        knowledge_base_id: KB_ID.to_string(),
        model_arn: MODEL_ARN.to_string(),
        chat_store: ChatStoreConfig::DynamoDb {
            table_name: "health-table".to_string(),
        },
    }
}

pub fn ingestion_config() -> IngestionConfig {
    IngestionConfig {
        knowledge_base_id: KB_ID.to_string(),
        data_source_id: DS_ID.to_string(),
    }
}

pub fn test_config(api_keys: Vec<String>) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_keys,
            max_body_bytes: 64 * 1024,
        },
        aws: aws_config(),
        query: Some(query_config()),
        ingestion: Some(ingestion_config()),
    }
}

pub fn query_service(kb: Arc<StubKnowledgeBase>, store: Arc<StubChatStore>) -> QueryService {
    QueryService::new(kb, store, &query_config())
}

pub fn ingestion_service(client: Arc<StubIngestionClient>) -> IngestionService {
    IngestionService::new(client, &ingestion_config())
}

/// Fully wired state over stubs.
pub fn stub_state(
    kb: Arc<StubKnowledgeBase>,
    store: Arc<StubChatStore>,
    ingestion: Arc<StubIngestionClient>,
    api_keys: Vec<String>,
) -> AppState {
    AppState::new(
        test_config(api_keys),
        Some(query_service(kb, store)),
        Some(ingestion_service(ingestion)),
    )
}

pub fn init_test_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("healthkb=debug")
        .with_test_writer()
        .try_init();
}
