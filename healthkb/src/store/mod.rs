//! ChatRecord persistence.

mod dynamodb;
mod sqlite;

pub use dynamodb::DynamoDbChatStore;
pub use sqlite::LibSqlChatStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::aws::AwsClient;
use crate::config::{AwsConfig, ChatStoreConfig};
use crate::error::Result;
use crate::models::ChatRecord;

/// Append-only store of answered questions.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Insert a new record. Fails with `Conflict` if the id already exists;
    /// existing records are never overwritten.
    async fn put_record(&self, record: &ChatRecord) -> Result<()>;

    async fn get_record(&self, id: &str) -> Result<Option<ChatRecord>>;

    /// Short backend name for health output and logs.
    fn backend(&self) -> &'static str;
}

/// Build the configured store. The AWS client is only used for DynamoDB.
pub async fn connect(
    config: &ChatStoreConfig,
    aws: &AwsClient,
    aws_config: &AwsConfig,
) -> Result<Arc<dyn ChatStore>> {
    match config {
        ChatStoreConfig::DynamoDb { table_name } => {
            let store = DynamoDbChatStore::new(aws.clone(), aws_config, table_name.clone())?;
            Ok(Arc::new(store))
        }
        ChatStoreConfig::LibSql(db) => Ok(Arc::new(LibSqlChatStore::new(db).await?)),
    }
}
