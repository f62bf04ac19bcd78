//! Signed JSON transport for the AWS services behind the knowledge base:
//! Bedrock agent runtime (retrieve-and-generate), Bedrock agent (ingestion
//! jobs) and DynamoDB (chat records).

mod client;
pub(crate) mod signing;

pub use client::{AwsClient, AwsRequest, RetryPolicy};
pub use signing::{AwsCredentials, SigV4Signer};

use url::Url;

use crate::error::Result;

/// Resolve a service endpoint, preferring an explicit override
/// (LocalStack, VPC endpoints, test servers).
pub fn resolve_endpoint(endpoint_override: Option<&str>, prefix: &str, region: &str) -> Result<Url> {
    let raw = match endpoint_override {
        Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
        None => format!("https://{prefix}.{region}.amazonaws.com"),
    };
    Ok(Url::parse(&raw)?)
}
