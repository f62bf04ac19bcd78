use std::sync::Arc;

use validator::Validate;

use crate::bedrock::KnowledgeBase;
use crate::config::QueryConfig;
use crate::error::{HealthKbError, Result};
use crate::models::{ChatRecord, Generation, QueryRequest, QueryResult, RetrieveAndGenerateRequest};
use crate::store::ChatStore;

/// Question answering over the knowledge base, with every answer recorded.
#[derive(Clone)]
pub struct QueryService {
    knowledge_base: Arc<dyn KnowledgeBase>,
    store: Arc<dyn ChatStore>,
    knowledge_base_id: String,
    model_arn: String,
}

impl QueryService {
    pub fn new(
        knowledge_base: Arc<dyn KnowledgeBase>,
        store: Arc<dyn ChatStore>,
        config: &QueryConfig,
    ) -> Self {
        Self {
            knowledge_base,
            store,
            knowledge_base_id: config.knowledge_base_id.clone(),
            model_arn: config.model_arn.clone(),
        }
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Retrieve-and-generate for `question`. Blank input is rejected before
    /// any upstream call.
    pub async fn generate(&self, question: &str) -> Result<Generation> {
        QueryRequest::new(question)
            .validate()
            .map_err(|e| HealthKbError::Validation(e.to_string()))?;

        let request = RetrieveAndGenerateRequest {
            text: question.trim().to_string(),
            knowledge_base_id: self.knowledge_base_id.clone(),
            model_arn: self.model_arn.clone(),
        };
        let generation = self.knowledge_base.retrieve_and_generate(&request).await?;

        tracing::info!(
            question_len = request.text.len(),
            response_len = generation.text.len(),
            citations = generation.citations.len(),
            session_id = generation.session_id.as_deref().unwrap_or("-"),
            "Generated answer"
        );
        tracing::debug!(question = %request.text, "Question text");

        Ok(generation)
    }

    /// Generate, then persist a new [`ChatRecord`], then return the result.
    ///
    /// The write happens after generation and must succeed for the call to
    /// succeed. A failed write is not compensated; the generation has
    /// already happened.
    pub async fn answer(&self, question: &str) -> Result<QueryResult> {
        let generation = self.generate(question).await?;

        let record = ChatRecord::new(question, generation.text);
        self.store.put_record(&record).await.inspect_err(|e| {
            tracing::error!(record_id = %record.id, error = %e, "Failed to persist chat record");
        })?;
        tracing::info!(record_id = %record.id, store = self.store.backend(), "Chat record stored");

        Ok(QueryResult {
            question: record.question,
            response: record.response,
        })
    }

    pub async fn get_record(&self, id: &str) -> Result<ChatRecord> {
        self.store
            .get_record(id)
            .await?
            .ok_or_else(|| HealthKbError::NotFound(format!("chat record {id}")))
    }
}
