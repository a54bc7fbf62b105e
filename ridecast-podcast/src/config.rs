//! Configuration resolution for ridecast-podcast
//!
//! Resolves secrets with ENV → TOML priority and wires the pipeline's HTTP
//! collaborators from the resolved `TomlConfig`.

use ridecast_common::config::TomlConfig;
use ridecast_common::events::EventBus;
use ridecast_common::{Error, Result};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{info, warn};

use crate::services::{
    ArtifactDelivery, ArtifactLocator, ArtifactStore, CompletionPoller, HttpAnalysisSource,
    HttpArtifactStore, HttpSynthesisWorker, HttpTextGenerator, PodcastPipeline,
    TransientObjectRegistry,
};

/// Environment variable carrying the collaborator API token
pub const API_TOKEN_ENV_VAR: &str = "RIDECAST_API_TOKEN";

/// Resolve the bearer token sent to collaborators
///
/// **Priority:** ENV → TOML. A missing token is not an error; collaborators
/// that need one will reject the request.
pub fn resolve_api_token(toml_config: &TomlConfig) -> Option<String> {
    let env_token = std::env::var(API_TOKEN_ENV_VAR)
        .ok()
        .filter(|t| is_valid_token(t));
    let toml_token = toml_config
        .endpoints
        .api_token
        .clone()
        .filter(|t| is_valid_token(t));

    if env_token.is_some() && toml_token.is_some() {
        warn!(
            "API token found in environment and TOML config. Using {} (highest priority).",
            API_TOKEN_ENV_VAR
        );
    }

    if let Some(token) = env_token {
        info!("API token loaded from environment variable");
        return Some(token);
    }
    if let Some(token) = toml_token {
        info!("API token loaded from TOML config");
        return Some(token);
    }

    info!("No API token configured; collaborators are called unauthenticated");
    None
}

/// Non-empty, non-whitespace
pub fn is_valid_token(token: &str) -> bool {
    !token.trim().is_empty()
}

/// Pipeline plus the collaborators the service surface also needs
pub struct PipelineComponents {
    pub pipeline: PodcastPipeline,
    pub analysis_source: HttpAnalysisSource,
    pub downloads: TransientObjectRegistry,
}

/// Build the HTTP-backed pipeline from configuration
pub fn build_components(config: &TomlConfig, event_bus: EventBus) -> Result<PipelineComponents> {
    config.validate()?;

    let api_token = resolve_api_token(config);
    let endpoints = &config.endpoints;
    let pipeline_config = &config.pipeline;
    let timeout = pipeline_config.http_timeout();

    let rps = NonZeroU32::new(pipeline_config.text_generation_rps).ok_or_else(|| {
        Error::Config("pipeline.text_generation_rps must be at least 1".to_string())
    })?;

    let generator = HttpTextGenerator::new(
        &endpoints.text_generation_url,
        api_token.clone(),
        rps,
        timeout,
    )
    .map_err(|e| Error::Internal(format!("Failed to create text generation client: {}", e)))?;

    let worker = HttpSynthesisWorker::new(&endpoints.synthesis_worker_url, api_token.clone(), timeout)
        .map_err(|e| Error::Internal(format!("Failed to create synthesis worker client: {}", e)))?;

    let store: Arc<dyn ArtifactStore> = Arc::new(
        HttpArtifactStore::new(timeout)
            .map_err(|e| Error::Internal(format!("Failed to create artifact store client: {}", e)))?,
    );

    let analysis_source = HttpAnalysisSource::new(&endpoints.analysis_source_url, api_token, timeout)
        .map_err(|e| Error::Internal(format!("Failed to create analysis source client: {}", e)))?;

    let downloads = TransientObjectRegistry::new();
    let locator = ArtifactLocator::new(
        Arc::clone(&store),
        &endpoints.artifact_base_url,
        &pipeline_config.artifact_filename,
    );
    let poller = CompletionPoller::new(pipeline_config.poll_interval(), pipeline_config.poll_deadline());
    let delivery = ArtifactDelivery::new(store, downloads.clone(), pipeline_config.download_release());

    info!(
        text_generation_url = %endpoints.text_generation_url,
        synthesis_worker_url = %endpoints.synthesis_worker_url,
        artifact_base_url = %endpoints.artifact_base_url,
        poll_interval_secs = pipeline_config.poll_interval_secs,
        poll_deadline_secs = pipeline_config.poll_deadline_secs,
        "Podcast pipeline configured"
    );

    Ok(PipelineComponents {
        pipeline: PodcastPipeline::new(
            Arc::new(generator),
            Arc::new(worker),
            locator,
            poller,
            delivery,
            event_bus,
        ),
        analysis_source,
        downloads,
    })
}
