//! Knowledge-base clients: retrieve-and-generate queries and data-source
//! ingestion jobs.

mod agent;
mod runtime;

pub use agent::BedrockAgentClient;
pub use runtime::BedrockAgentRuntimeClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Generation, IngestionJob, IngestionJobRequest, RetrieveAndGenerateRequest};

/// Semantic retrieval over the knowledge base combined with a generative
/// model.
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    async fn retrieve_and_generate(&self, request: &RetrieveAndGenerateRequest)
        -> Result<Generation>;
}

/// Control plane for re-indexing a data source into the knowledge base.
#[async_trait]
pub trait IngestionClient: Send + Sync {
    async fn start_ingestion_job(&self, request: &IngestionJobRequest) -> Result<IngestionJob>;

    async fn get_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        ingestion_job_id: &str,
    ) -> Result<IngestionJob>;
}
