use std::sync::Arc;

use crate::aws::AwsClient;
use crate::bedrock::{BedrockAgentClient, BedrockAgentRuntimeClient};
use crate::config::Config;
use crate::error::{HealthKbError, Result};
use crate::services::{DialogService, IngestionService, QueryService};
use crate::store;

/// Shared handler state. A flow whose configuration section is absent has
/// no service and its routes answer 503.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    query: Option<QueryService>,
    dialog: Option<DialogService>,
    ingestion: Option<IngestionService>,
}

impl AppState {
    pub fn new(
        config: Config,
        query: Option<QueryService>,
        ingestion: Option<IngestionService>,
    ) -> Self {
        let dialog = query.clone().map(DialogService::new);
        Self {
            config: Arc::new(config),
            query,
            dialog,
            ingestion,
        }
    }

    /// Build the AWS-backed services for every enabled flow. Clients are
    /// constructed once here and shared by all requests.
    pub async fn from_config(config: Config) -> Result<Self> {
        let aws = AwsClient::new(&config.aws)?;

        let query = match &config.query {
            Some(query_config) => {
                let knowledge_base = Arc::new(BedrockAgentRuntimeClient::new(aws.clone(), &config.aws)?);
                let chat_store = store::connect(&query_config.chat_store, &aws, &config.aws).await?;
                tracing::info!(
                    knowledge_base_id = %query_config.knowledge_base_id,
                    chat_store = chat_store.backend(),
                    "Query flow enabled"
                );
                Some(QueryService::new(knowledge_base, chat_store, query_config))
            }
            None => None,
        };

        let ingestion = match &config.ingestion {
            Some(ingestion_config) => {
                let client = Arc::new(BedrockAgentClient::new(aws.clone(), &config.aws)?);
                tracing::info!(
                    knowledge_base_id = %ingestion_config.knowledge_base_id,
                    data_source_id = %ingestion_config.data_source_id,
                    "Ingestion flow enabled"
                );
                Some(IngestionService::new(client, ingestion_config))
            }
            None => None,
        };

        Ok(Self::new(config, query, ingestion))
    }

    pub fn query(&self) -> Result<&QueryService> {
        self.query
            .as_ref()
            .ok_or_else(|| HealthKbError::NotConfigured("query flow".to_string()))
    }

    pub fn dialog(&self) -> Result<&DialogService> {
        self.dialog
            .as_ref()
            .ok_or_else(|| HealthKbError::NotConfigured("dialog flow".to_string()))
    }

    pub fn ingestion(&self) -> Result<&IngestionService> {
        self.ingestion
            .as_ref()
            .ok_or_else(|| HealthKbError::NotConfigured("ingestion flow".to_string()))
    }
}
