//! Artifact store access and existence checks
//!
//! The artifact store is addressable by `{base}/{owner}_{analysis}/{filename}`.
//! It supports a HEAD-style existence probe and a binary fetch; the pipeline
//! never deletes or overwrites.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::ArtifactKey;

const USER_AGENT: &str = concat!("ridecast-podcast/", env!("CARGO_PKG_VERSION"));

/// Existence probe failure (distinct from "absent")
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected status {0} from artifact store")]
    UnexpectedStatus(u16),
}

/// Binary fetch failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Artifact store returned HTTP {0}")]
    Status(u16),
}

/// Artifact store operations used by the pipeline
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// `Ok(true)` when a finished artifact exists at `url`
    async fn probe(&self, url: &str) -> Result<bool, ProbeError>;

    /// Fetch the artifact bytes; any non-2xx response is a failure
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Artifact store reached over HTTP (public bucket URLs)
pub struct HttpArtifactStore {
    http_client: reqwest::Client,
}

impl HttpArtifactStore {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn probe(&self, url: &str) -> Result<bool, ProbeError> {
        let response = self
            .http_client
            .head(url)
            .send()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        // Public buckets answer 403 for objects that do not exist yet
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(false);
        }
        Err(ProbeError::UnexpectedStatus(status.as_u16()))
    }

    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}

/// Result of an existence check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Finished artifact exists at this URL
    Present(String),
    /// Nothing there yet; safe to generate
    Absent,
    /// Could not tell; must not proceed to generation
    ProbeFailed(ProbeError),
}

/// Computes artifact URLs and checks whether they exist
#[derive(Clone)]
pub struct ArtifactLocator {
    store: Arc<dyn ArtifactStore>,
    base_url: String,
    artifact_filename: String,
}

impl ArtifactLocator {
    pub fn new(store: Arc<dyn ArtifactStore>, base_url: &str, artifact_filename: &str) -> Self {
        Self {
            store,
            base_url: base_url.trim_end_matches('/').to_string(),
            artifact_filename: artifact_filename.to_string(),
        }
    }

    /// Deterministic artifact URL for `key`
    pub fn url_for(&self, key: &ArtifactKey) -> String {
        format!("{}/{}", self.base_url, key.storage_path(&self.artifact_filename))
    }

    /// Probe the artifact location once
    pub async fn locate(&self, key: &ArtifactKey) -> ArtifactStatus {
        let url = self.url_for(key);
        match self.store.probe(&url).await {
            Ok(true) => {
                tracing::info!(artifact = %key, url = %url, "Existing podcast found");
                ArtifactStatus::Present(url)
            }
            Ok(false) => {
                tracing::debug!(artifact = %key, "No existing podcast");
                ArtifactStatus::Absent
            }
            Err(e) => {
                tracing::warn!(artifact = %key, error = %e, "Podcast existence check failed");
                ArtifactStatus::ProbeFailed(e)
            }
        }
    }

    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }
}
