use std::env;

use crate::aws::AwsCredentials;
use crate::error::{HealthKbError, Result};

/// Read a variable, treating unset and blank values the same way.
fn env_value(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a variable that must be present, failing with a message naming it.
pub fn required_env(var: &str) -> Result<String> {
    env_value(var).ok_or_else(|| {
        HealthKbError::Config(format!("{var} is required but not set"))
    })
}

pub(crate) fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env_value(var) {
        Some(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        None => default,
    }
}

fn any_set(vars: &[&str]) -> bool {
    vars.iter().any(|var| env_value(var).is_some())
}

const QUERY_VARS: &[&str] = &["KB_ID", "KB_MODEL_ARN", "TABLE_NAME"];
const INGESTION_VARS: &[&str] = &["KNOWLEDGE_BASE_ID", "DATA_SOURCE_ID"];

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub aws: AwsConfig,
    /// Query and dialog flows. `None` when none of their variables are set.
    pub query: Option<QueryConfig>,
    /// Storage-triggered ingestion flow.
    pub ingestion: Option<IngestionConfig>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: Vec<String>,
    pub max_body_bytes: usize,
}

#[derive(Clone)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub bedrock_agent_runtime_endpoint: Option<String>,
    pub bedrock_agent_endpoint: Option<String>,
    pub dynamodb_endpoint: Option<String>,
    pub timeout_secs: u64,
    /// Upper bound on time spent retrying transient upstream failures.
    /// Zero disables retries.
    pub retry_max_elapsed_secs: u64,
}

impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("bedrock_agent_runtime_endpoint", &self.bedrock_agent_runtime_endpoint)
            .field("bedrock_agent_endpoint", &self.bedrock_agent_endpoint)
            .field("dynamodb_endpoint", &self.dynamodb_endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_max_elapsed_secs", &self.retry_max_elapsed_secs)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub knowledge_base_id: String,
    pub model_arn: String,
    pub chat_store: ChatStoreConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStoreConfig {
    DynamoDb { table_name: String },
    LibSql(DatabaseConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub knowledge_base_id: String,
    pub data_source_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_value("HEALTHKB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_env_or("HEALTHKB_PORT", 3000),
            api_keys: env_value("HEALTHKB_API_KEYS")
                .map(|keys| {
                    keys.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            max_body_bytes: parse_env_or("HEALTHKB_MAX_BODY_BYTES", 1024 * 1024),
        }
    }
}

impl AwsConfig {
    fn from_env() -> Self {
        Self {
            region: env_value("AWS_REGION")
                .or_else(|| env_value("AWS_DEFAULT_REGION"))
                .unwrap_or_else(|| "us-east-1".to_string()),
            access_key_id: env_value("AWS_ACCESS_KEY_ID"),
            secret_access_key: env_value("AWS_SECRET_ACCESS_KEY"),
            session_token: env_value("AWS_SESSION_TOKEN"),
            bedrock_agent_runtime_endpoint: env_value("BEDROCK_AGENT_RUNTIME_ENDPOINT"),
            bedrock_agent_endpoint: env_value("BEDROCK_AGENT_ENDPOINT"),
            dynamodb_endpoint: env_value("DYNAMODB_ENDPOINT"),
            timeout_secs: parse_env_or("AWS_TIMEOUT_SECS", 60),
            retry_max_elapsed_secs: parse_env_or("AWS_RETRY_MAX_ELAPSED_SECS", 10),
        }
    }

    /// Credentials for signing. Both key parts must be present.
    pub fn credentials(&self) -> Result<AwsCredentials> {
        let access_key_id = self.access_key_id.clone().ok_or_else(|| {
            HealthKbError::Config("AWS_ACCESS_KEY_ID is required but not set".to_string())
        })?;
        let secret_access_key = self.secret_access_key.clone().ok_or_else(|| {
            HealthKbError::Config("AWS_SECRET_ACCESS_KEY is required but not set".to_string())
        })?;

        Ok(AwsCredentials {
            access_key_id,
            secret_access_key,
            session_token: self.session_token.clone(),
        })
    }
}

impl QueryConfig {
    fn from_env() -> Result<Option<Self>> {
        if !any_set(QUERY_VARS) {
            return Ok(None);
        }

        let chat_store = match env_value("CHAT_STORE")
            .unwrap_or_else(|| "dynamodb".to_string())
            .to_lowercase()
            .as_str()
        {
            "dynamodb" => ChatStoreConfig::DynamoDb {
                table_name: required_env("TABLE_NAME")?,
            },
            "libsql" => ChatStoreConfig::LibSql(DatabaseConfig {
                url: env_value("DATABASE_URL").unwrap_or_else(|| "file:healthkb.db".to_string()),
                auth_token: env_value("DATABASE_AUTH_TOKEN"),
            }),
            other => {
                return Err(HealthKbError::Config(format!(
                    "CHAT_STORE must be 'dynamodb' or 'libsql', got '{other}'"
                )))
            }
        };

        Ok(Some(Self {
            knowledge_base_id: required_env("KB_ID")?,
            model_arn: required_env("KB_MODEL_ARN")?,
            chat_store,
        }))
    }
}

impl IngestionConfig {
    fn from_env() -> Result<Option<Self>> {
        if !any_set(INGESTION_VARS) {
            return Ok(None);
        }

        Ok(Some(Self {
            knowledge_base_id: required_env("KNOWLEDGE_BASE_ID")?,
            data_source_id: required_env("DATA_SOURCE_ID")?,
        }))
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// A flow is enabled as soon as any of its variables is set; from then on
    /// every variable it requires must be present. At least one flow must be
    /// enabled.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env(),
            aws: AwsConfig::from_env(),
            query: QueryConfig::from_env()?,
            ingestion: IngestionConfig::from_env()?,
        };

        if config.query.is_none() && config.ingestion.is_none() {
            return Err(HealthKbError::Config(format!(
                "no flow configured: set {} for queries or {} for ingestion",
                QUERY_VARS[..2].join("/"),
                INGESTION_VARS.join("/")
            )));
        }

        Ok(config)
    }

    /// Read before the rest of the configuration so that config errors are
    /// already logged in the requested format.
    pub fn log_format_from_env() -> LogFormat {
        parse_env_or("LOG_FORMAT", LogFormat::Text)
    }
}
