//! Script generation client
//!
//! Calls the text-generation service once per stage prompt, strictly in
//! sequence, and concatenates the results into a draft script. Later stages
//! read as a continuation of earlier ones, so the calls are never issued in
//! parallel.
//!
//! A failure at any stage aborts the whole generation and the partial text
//! is dropped. There is no retry here; a failed run is restarted by the user.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

use crate::error::PipelineError;
use crate::models::{DraftScript, StagePrompt};

const USER_AGENT: &str = concat!("ridecast-podcast/", env!("CARGO_PKG_VERSION"));

/// Text-generation client errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Service returned no text")]
    EmptyResponse,
}

/// One-prompt-in, text-out generation service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

/// Accepts the common response shapes: `{"text"}`, `{"content"}`, `{"response"}`
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(alias = "content", alias = "response")]
    text: Option<String>,
}

/// Text-generation endpoint reached over HTTP
pub struct HttpTextGenerator {
    http_client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    rate_limiter: RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpTextGenerator {
    /// # Arguments
    /// * `endpoint` - Full URL of the generation endpoint
    /// * `api_token` - Optional bearer token
    /// * `requests_per_second` - Client-side request budget
    /// * `timeout` - Per-request timeout
    pub fn new(
        endpoint: &str,
        api_token: Option<String>,
        requests_per_second: NonZeroU32,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
            api_token,
            rate_limiter: RateLimiter::direct(Quota::per_second(requests_per_second)),
        })
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.rate_limiter.until_ready().await;

        let mut request = self
            .http_client
            .post(&self.endpoint)
            .json(&GenerateRequest { prompt });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError(status.as_u16(), error_text));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;

        match body.text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(GenerationError::EmptyResponse),
        }
    }
}

/// Generate the draft script, one stage at a time
pub async fn generate_script(
    generator: &dyn TextGenerator,
    prompts: &[StagePrompt],
) -> Result<DraftScript, PipelineError> {
    let mut draft = DraftScript::new();

    for stage_prompt in prompts {
        tracing::debug!(stage = %stage_prompt.stage, "Generating script stage");

        let text = generator
            .generate(&stage_prompt.prompt)
            .await
            .and_then(|text| {
                if text.trim().is_empty() {
                    Err(GenerationError::EmptyResponse)
                } else {
                    Ok(text)
                }
            })
            .map_err(|e| {
                tracing::warn!(stage = %stage_prompt.stage, error = %e, "Script stage failed");
                PipelineError::StageGeneration {
                    stage: stage_prompt.stage.name().to_string(),
                    message: e.to_string(),
                }
            })?;

        draft.push_stage(stage_prompt.stage, &text);
    }

    tracing::info!(
        stages = draft.stages().len(),
        chars = draft.as_str().len(),
        "Podcast script generated"
    );

    Ok(draft)
}
