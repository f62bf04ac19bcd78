use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::config::AwsConfig;
use crate::error::{HealthKbError, Result};

use super::signing::SigV4Signer;

/// A single signed call against an AWS JSON endpoint.
#[derive(Debug, Clone)]
pub struct AwsRequest {
    /// Name used in errors and logs (`bedrock-agent-runtime`, `dynamodb`, ...).
    pub label: &'static str,
    /// Signing name from the credential scope (`bedrock`, `dynamodb`).
    pub signing_service: &'static str,
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl AwsRequest {
    pub fn new(label: &'static str, signing_service: &'static str, method: Method, url: Url) -> Self {
        Self {
            label,
            signing_service,
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_elapsed: Duration::ZERO,
        }
    }

    fn backoff(&self) -> backoff::ExponentialBackoff {
        backoff::ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_elapsed: Duration::from_secs(10),
        }
    }
}

/// Shared HTTP client that signs every attempt with SigV4 and retries
/// throttling, 5xx and connection failures with exponential backoff.
///
/// Construct once at startup and clone into each service client.
#[derive(Clone)]
pub struct AwsClient {
    http: reqwest::Client,
    signer: Arc<SigV4Signer>,
    retry: RetryPolicy,
}

impl AwsClient {
    pub fn new(config: &AwsConfig) -> Result<Self> {
        let signer = SigV4Signer::new(config.credentials()?, config.region.clone());
        let retry = RetryPolicy {
            max_elapsed: Duration::from_secs(config.retry_max_elapsed_secs),
            ..RetryPolicy::default()
        };
        Self::with_signer(signer, Duration::from_secs(config.timeout_secs), retry)
    }

    pub fn with_signer(signer: SigV4Signer, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HealthKbError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            signer: Arc::new(signer),
            retry,
        })
    }

    /// Send the request, retrying transient failures, and decode the JSON
    /// response body. An empty success body decodes to `Value::Null`.
    pub async fn send(&self, request: &AwsRequest) -> Result<Value> {
        let this = self;
        let op = || async move {
            this.send_once(request).await.map_err(|e| {
                if e.is_transient() {
                    tracing::warn!(service = request.label, error = %e, "Transient upstream failure, retrying");
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        };

        backoff::future::retry(self.retry.backoff(), op).await
    }

    async fn send_once(&self, request: &AwsRequest) -> Result<Value> {
        let body = match &request.body {
            Some(value) => serde_json::to_vec(value)?,
            None => Vec::new(),
        };

        let signed = self.signer.sign(
            request.method.as_str(),
            &request.url,
            &request.headers,
            &body,
            request.signing_service,
            Utc::now(),
        );

        let mut builder = self.http.request(request.method.clone(), request.url.clone());
        for (name, value) in request.headers.iter().chain(signed.iter()) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if request.body.is_some() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let error_type = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        if status.is_success() {
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes).map_err(|e| HealthKbError::Aws {
                service: request.label.to_string(),
                status: status.as_u16(),
                code: "InvalidResponse".to_string(),
                message: format!("Failed to decode response body: {e}"),
            });
        }

        Err(decode_error(
            request.label,
            status.as_u16(),
            error_type.as_deref(),
            &bytes,
        ))
    }
}

/// Map an AWS error response onto [`HealthKbError`].
///
/// The error code comes from `x-amzn-ErrorType` (REST services) or the
/// `__type` body field (JSON 1.0 services). Both may carry a namespace or
/// URL suffix that is stripped.
pub(crate) fn decode_error(
    service: &str,
    status: u16,
    error_type: Option<&str>,
    body: &[u8],
) -> HealthKbError {
    let parsed: Value = serde_json::from_slice(body).unwrap_or(Value::Null);

    let raw_code = error_type
        .map(str::to_string)
        .or_else(|| parsed["__type"].as_str().map(str::to_string))
        .or_else(|| parsed["code"].as_str().map(str::to_string))
        .unwrap_or_else(|| "UnknownError".to_string());
    let code = raw_code
        .split(':')
        .next()
        .unwrap_or_default()
        .rsplit('#')
        .next()
        .unwrap_or_default()
        .to_string();

    let message = parsed["message"]
        .as_str()
        .or_else(|| parsed["Message"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            String::from_utf8_lossy(body)
                .chars()
                .take(500)
                .collect::<String>()
        });

    let throttled = status == 429
        || code.contains("Throttling")
        || code == "ProvisionedThroughputExceededException"
        || code == "RequestLimitExceeded";
    if throttled {
        return HealthKbError::Throttled {
            service: service.to_string(),
        };
    }

    HealthKbError::Aws {
        service: service.to_string(),
        status,
        code,
        message,
    }
}
