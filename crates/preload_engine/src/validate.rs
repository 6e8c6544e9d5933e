use std::time::Duration;

use preload_core::{SnapshotMetadata, ValidationError, ValidationResult};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

/// Answers true iff the snapshot described by `raw` should be downloaded.
pub const VALIDATE_SNAPSHOT_QUERY: &str =
    "query validateSnapshot($raw: String!) { validation { metadata(raw: $raw) } }";

#[async_trait::async_trait]
pub trait SnapshotValidator: Send + Sync {
    async fn validate(
        &self,
        metadata: &SnapshotMetadata,
    ) -> Result<ValidationResult, ValidationError>;
}

/// Asks the snapshot validation service whether a snapshot is usable.
#[derive(Debug, Clone)]
pub struct GraphQlSnapshotValidator {
    endpoint: String,
    timeout: Duration,
}

impl GraphQlSnapshotValidator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Reply {
    data: Option<ReplyData>,
    #[serde(default)]
    errors: Vec<ReplyError>,
}

#[derive(Debug, Deserialize)]
struct ReplyData {
    validation: Option<Validation>,
}

#[derive(Debug, Deserialize)]
struct Validation {
    metadata: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ReplyError {
    message: String,
}

#[async_trait::async_trait]
impl SnapshotValidator for GraphQlSnapshotValidator {
    async fn validate(
        &self,
        metadata: &SnapshotMetadata,
    ) -> Result<ValidationResult, ValidationError> {
        let body = serde_json::json!({
            "query": VALIDATE_SNAPSHOT_QUERY,
            "variables": { "raw": String::from_utf8_lossy(metadata.as_bytes()) },
        });
        let body = serde_json::to_vec(&body).map_err(unavailable)?;

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(unavailable)?;
        let response = client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ValidationError::Unavailable(format!("http status {status}")));
        }
        let bytes = response.bytes().await.map_err(unavailable)?;
        let reply: Reply = serde_json::from_slice(&bytes).map_err(unavailable)?;

        if let Some(error) = reply.errors.first() {
            return Err(ValidationError::Unavailable(error.message.clone()));
        }
        reply
            .data
            .and_then(|data| data.validation)
            .and_then(|validation| validation.metadata)
            .map(|usable| ValidationResult { usable })
            .ok_or_else(|| {
                ValidationError::Unavailable("response has no validation.metadata".into())
            })
    }
}

fn unavailable(err: impl std::fmt::Display) -> ValidationError {
    ValidationError::Unavailable(err.to_string())
}
