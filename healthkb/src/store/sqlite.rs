use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Builder, Connection};

use crate::config::DatabaseConfig;
use crate::error::{HealthKbError, Result};
use crate::models::ChatRecord;

use super::ChatStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chat_records (
    id TEXT PRIMARY KEY,
    question TEXT NOT NULL,
    response TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chat_records_created_at ON chat_records(created_at);
"#;

/// Chat records in a local SQLite file or a remote libsql server.
#[derive(Clone)]
pub struct LibSqlChatStore {
    db: Arc<libsql::Database>,
}

impl LibSqlChatStore {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            Builder::new_remote(
                config.url.clone(),
                config.auth_token.clone().unwrap_or_default(),
            )
            .build()
            .await?
        } else if config.url == ":memory:" {
            Builder::new_local(":memory:").build().await?
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let store = Self { db: Arc::new(db) };
        store.connect()?.execute_batch(SCHEMA).await?;
        tracing::info!(url = %config.url, "Chat store ready");

        Ok(store)
    }

    fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    fn row_to_record(row: &libsql::Row) -> Result<ChatRecord> {
        Ok(ChatRecord {
            id: row.get(0)?,
            question: row.get(1)?,
            response: row.get(2)?,
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(3)?)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| HealthKbError::Internal(format!("bad created_at: {e}")))?,
        })
    }
}

#[async_trait]
impl ChatStore for LibSqlChatStore {
    async fn put_record(&self, record: &ChatRecord) -> Result<()> {
        let conn = self.connect()?;
        let inserted = conn
            .execute(
                r#"
                INSERT INTO chat_records (id, question, response, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO NOTHING
                "#,
                params![
                    record.id.clone(),
                    record.question.clone(),
                    record.response.clone(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await?;

        if inserted == 0 {
            return Err(HealthKbError::Conflict(format!(
                "chat record {} already exists",
                record.id
            )));
        }
        Ok(())
    }

    async fn get_record(&self, id: &str) -> Result<Option<ChatRecord>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, question, response, created_at FROM chat_records WHERE id = ?1",
                params![id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_record(&row)?))
        } else {
            Ok(None)
        }
    }

    fn backend(&self) -> &'static str {
        "libsql"
    }
}
