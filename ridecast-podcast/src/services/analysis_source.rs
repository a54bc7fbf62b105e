//! Analysis record lookup
//!
//! Analysis records are produced elsewhere and read here only. The HTTP
//! source fetches `{base}/{analysis_id}`; the in-memory source backs the CLI
//! and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::PipelineError;
use crate::models::artifact::check_path_segment;
use crate::models::AnalysisRecord;

const USER_AGENT: &str = concat!("ridecast-podcast/", env!("CARGO_PKG_VERSION"));

/// Read-only access to analysis records
#[async_trait]
pub trait AnalysisSource: Send + Sync {
    async fn load(&self, analysis_id: &str) -> Result<AnalysisRecord, PipelineError>;
}

/// Analysis records served over HTTP as JSON
pub struct HttpAnalysisSource {
    http_client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpAnalysisSource {
    pub fn new(base_url: &str, api_token: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }
}

#[async_trait]
impl AnalysisSource for HttpAnalysisSource {
    async fn load(&self, analysis_id: &str) -> Result<AnalysisRecord, PipelineError> {
        if analysis_id.trim().is_empty() {
            return Err(PipelineError::MissingIdentity("analysis id".to_string()));
        }
        check_path_segment("analysis id", analysis_id)?;

        // The id is pushed as one percent-encoded segment
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| PipelineError::AnalysisSource(format!("Invalid analysis source URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| {
                PipelineError::AnalysisSource(format!("Analysis source URL cannot hold a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(analysis_id);

        let mut request = self.http_client.get(url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::AnalysisSource(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PipelineError::AnalysisNotFound(analysis_id.to_string()));
        }
        if !status.is_success() {
            return Err(PipelineError::AnalysisSource(format!(
                "HTTP {} while loading analysis {}",
                status.as_u16(),
                analysis_id
            )));
        }

        let mut record: AnalysisRecord = response
            .json()
            .await
            .map_err(|e| PipelineError::AnalysisSource(format!("Invalid analysis record: {}", e)))?;

        // Some sources omit the id from the document body
        if record.analysis_id.trim().is_empty() {
            record.analysis_id = analysis_id.to_string();
        }

        Ok(record)
    }
}

/// Analysis records held in memory
#[derive(Clone, Default)]
pub struct InMemoryAnalysisSource {
    records: Arc<RwLock<HashMap<String, AnalysisRecord>>>,
}

impl InMemoryAnalysisSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: AnalysisRecord) {
        self.records
            .write()
            .await
            .insert(record.analysis_id.clone(), record);
    }
}

#[async_trait]
impl AnalysisSource for InMemoryAnalysisSource {
    async fn load(&self, analysis_id: &str) -> Result<AnalysisRecord, PipelineError> {
        self.records
            .read()
            .await
            .get(analysis_id)
            .cloned()
            .ok_or_else(|| PipelineError::AnalysisNotFound(analysis_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_lookup() {
        let source = InMemoryAnalysisSource::new();
        source
            .insert(AnalysisRecord {
                owner_id: "u1".to_string(),
                analysis_id: "a1".to_string(),
                ..Default::default()
            })
            .await;

        assert_eq!(source.load("a1").await.unwrap().owner_id, "u1");
        assert!(matches!(
            source.load("missing").await,
            Err(PipelineError::AnalysisNotFound(id)) if id == "missing"
        ));
    }
}
