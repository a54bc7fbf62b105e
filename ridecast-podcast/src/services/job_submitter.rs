//! Generation job submission
//!
//! Hands the formatted script to the audio synthesis worker. Submission is
//! fire-and-forget: the worker answers once it accepted the job, and the
//! finished audio later appears in the artifact store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::error::PipelineError;
use crate::models::{ArtifactKey, FormattedScript};

const USER_AGENT: &str = concat!("ridecast-podcast/", env!("CARGO_PKG_VERSION"));

/// Job payload sent to the synthesis worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub script: String,
    pub owner_id: String,
    pub analysis_id: String,
}

impl SubmissionRequest {
    pub fn new(script: &FormattedScript, key: &ArtifactKey) -> Self {
        Self {
            script: script.as_str().to_string(),
            owner_id: key.owner_id().to_string(),
            analysis_id: key.analysis_id().to_string(),
        }
    }
}

/// Worker acknowledgement
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubmissionAck {
    pub job_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkerResponse {
    success: Option<bool>,
    job_id: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Submission failure
///
/// `status` is `None` when the worker could not be reached at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct SubmissionError {
    pub status: Option<u16>,
    pub message: String,
}

impl From<SubmissionError> for PipelineError {
    fn from(err: SubmissionError) -> Self {
        PipelineError::Submission {
            status: err.status,
            message: err.message,
        }
    }
}

/// Audio synthesis worker
#[async_trait]
pub trait SynthesisWorker: Send + Sync {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionAck, SubmissionError>;
}

/// Synthesis worker reached over HTTP
pub struct HttpSynthesisWorker {
    http_client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
}

impl HttpSynthesisWorker {
    pub fn new(endpoint: &str, api_token: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
            api_token,
        })
    }
}

#[async_trait]
impl SynthesisWorker for HttpSynthesisWorker {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionAck, SubmissionError> {
        let mut builder = self.http_client.post(&self.endpoint).json(request);
        if let Some(token) = &self.api_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| SubmissionError {
            status: None,
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = serde_json::from_str::<WorkerResponse>(&body)
                .ok()
                .and_then(|r| r.error.or(r.message))
                .unwrap_or_else(|| {
                    if body.trim().is_empty() {
                        status.canonical_reason().unwrap_or("request failed").to_string()
                    } else {
                        body.trim().to_string()
                    }
                });
            return Err(SubmissionError {
                status: Some(status.as_u16()),
                message,
            });
        }

        // A 2xx with an empty or non-JSON body still counts as accepted
        let Ok(parsed) = serde_json::from_str::<WorkerResponse>(&body) else {
            return Ok(SubmissionAck::default());
        };

        if parsed.success == Some(false) {
            return Err(SubmissionError {
                status: Some(status.as_u16()),
                message: parsed
                    .error
                    .or(parsed.message)
                    .unwrap_or_else(|| "worker reported failure".to_string()),
            });
        }

        Ok(SubmissionAck {
            job_id: parsed.job_id,
            message: parsed.message,
        })
    }
}

/// Submit the formatted script for `key`
pub async fn submit_job(
    worker: &dyn SynthesisWorker,
    script: &FormattedScript,
    key: &ArtifactKey,
) -> Result<SubmissionAck, PipelineError> {
    let request = SubmissionRequest::new(script, key);

    match worker.submit(&request).await {
        Ok(ack) => {
            tracing::info!(
                artifact = %key,
                job_id = ack.job_id.as_deref().unwrap_or("-"),
                "Podcast job accepted"
            );
            Ok(ack)
        }
        Err(e) => {
            tracing::error!(artifact = %key, status = ?e.status, error = %e, "Podcast job rejected");
            Err(e.into())
        }
    }
}
