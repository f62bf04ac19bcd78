use std::sync::Arc;

use crate::bedrock::IngestionClient;
use crate::config::IngestionConfig;
use crate::error::Result;
use crate::models::{ClientToken, IngestionJob, IngestionJobRequest};

/// Starts full re-ingestion of the configured data source.
///
/// Never retries on its own: redelivery of the triggering notification is
/// the retry, and the request-id-derived token makes it idempotent.
#[derive(Clone)]
pub struct IngestionService {
    client: Arc<dyn IngestionClient>,
    knowledge_base_id: String,
    data_source_id: String,
}

impl IngestionService {
    pub fn new(client: Arc<dyn IngestionClient>, config: &IngestionConfig) -> Self {
        Self {
            client,
            knowledge_base_id: config.knowledge_base_id.clone(),
            data_source_id: config.data_source_id.clone(),
        }
    }

    pub async fn start(&self, request_id: &str) -> Result<IngestionJob> {
        let request = IngestionJobRequest {
            knowledge_base_id: self.knowledge_base_id.clone(),
            data_source_id: self.data_source_id.clone(),
            client_token: ClientToken::from_request_id(request_id)?,
        };

        let job = self.client.start_ingestion_job(&request).await?;
        tracing::info!(
            request_id,
            client_token = %request.client_token,
            job_id = %job.ingestion_job_id,
            status = %job.status,
            "Ingestion job started"
        );
        Ok(job)
    }

    pub async fn status(&self, ingestion_job_id: &str) -> Result<IngestionJob> {
        self.client
            .get_ingestion_job(&self.knowledge_base_id, &self.data_source_id, ingestion_job_id)
            .await
    }
}
