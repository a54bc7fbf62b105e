//! Podcast run API handlers
//!
//! POST /podcasts/:analysis_id, GET /podcasts/:analysis_id/status,
//! POST /podcasts/:analysis_id/cancel

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use ridecast_common::events::PipelineState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{PipelineRun, RunError},
    services::{DeliveryStrategy, PodcastRequest},
    AppState,
};

/// Browser delivery override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryPreference {
    Attachment,
    Inline,
}

/// POST /podcasts/:analysis_id request
///
/// The body is optional; when present it must parse, unknown fields included.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartPodcastRequest {
    /// Fills in a record without an owner; must match otherwise
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Overrides the record's document name for the download filename
    #[serde(default)]
    pub document_name: Option<String>,
    /// Skips User-Agent detection
    #[serde(default)]
    pub delivery: Option<DeliveryPreference>,
}

/// POST /podcasts/:analysis_id response
#[derive(Debug, Serialize)]
pub struct StartPodcastResponse {
    pub run_id: Uuid,
    pub state: PipelineState,
    pub started_at: DateTime<Utc>,
}

/// GET /podcasts/:analysis_id/status response
#[derive(Debug, Serialize)]
pub struct PodcastStatusResponse {
    pub run_id: Uuid,
    pub owner_id: String,
    pub analysis_id: String,
    pub state: PipelineState,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: u64,
    pub reused_existing: bool,
    pub filename: Option<String>,
    pub download_url: Option<String>,
    pub error: Option<RunError>,
}

impl From<&PipelineRun> for PodcastStatusResponse {
    fn from(run: &PipelineRun) -> Self {
        Self {
            run_id: run.run_id,
            owner_id: run.key.owner_id().to_string(),
            analysis_id: run.key.analysis_id().to_string(),
            state: run.state,
            message: run.message.clone(),
            started_at: run.started_at,
            ended_at: run.ended_at,
            elapsed_seconds: run.elapsed_seconds(),
            reused_existing: run.reused_existing,
            filename: run.delivered.as_ref().map(|d| d.filename.clone()),
            download_url: run
                .delivered
                .as_ref()
                .and_then(|d| d.download_url())
                .map(str::to_string),
            error: run.error.clone(),
        }
    }
}

/// POST /podcasts/:analysis_id/cancel response
#[derive(Debug, Serialize)]
pub struct CancelPodcastResponse {
    pub run_id: Uuid,
    pub state: PipelineState,
    pub cancel_requested: bool,
    pub cancelled_at: DateTime<Utc>,
}

/// POST /podcasts/:analysis_id
///
/// Start a run. Returns 202 Accepted with the run ID; the pipeline itself
/// runs on a background task.
pub async fn start_podcast(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<StartPodcastResponse>)> {
    let request = parse_start_request(&body)?;

    let mut record = state.analysis_source.load(&analysis_id).await?;

    if let Some(owner_id) = request.owner_id.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
        if record.owner_id.trim().is_empty() {
            record.owner_id = owner_id.to_string();
        } else if record.owner_id.trim() != owner_id {
            return Err(ApiError::BadRequest(format!(
                "Analysis {} does not belong to owner {}",
                analysis_id, owner_id
            )));
        }
    }

    // Identity and readiness are checked before anything is spawned
    let key = record.artifact_key()?;
    record.ensure_completed()?;

    let strategy = match request.delivery {
        Some(DeliveryPreference::Attachment) => DeliveryStrategy::Attachment,
        Some(DeliveryPreference::Inline) => DeliveryStrategy::Inline,
        None => {
            let user_agent = headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok());
            DeliveryStrategy::for_user_agent(user_agent)
        }
    };

    let run = PipelineRun::new(key.clone());
    let response = StartPodcastResponse {
        run_id: run.run_id,
        state: run.state,
        started_at: run.started_at,
    };
    let run = run.shared();

    let cancel = state
        .active_runs
        .try_begin(key.clone(), run.clone(), &state.shutdown)
        .await
        .map_err(|e| ApiError::Conflict(e.to_string()))?;

    tracing::info!(
        run_id = %response.run_id,
        artifact = %key,
        strategy = ?strategy,
        "Podcast run accepted"
    );

    let podcast_request = PodcastRequest {
        document_name: request.document_name,
        strategy,
    };
    let run_id = response.run_id;
    tokio::spawn(async move {
        let result = state
            .pipeline
            .run(run, &record, &podcast_request, &cancel)
            .await;

        match result {
            Ok(delivered) => {
                tracing::debug!(run_id = %run_id, filename = %delivered.filename, "Background podcast task finished");
            }
            Err(crate::PipelineError::Cancelled) => {}
            Err(e) => {
                *state.last_error.write().await = Some(e.to_string());
            }
        }
    });

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Empty body means defaults; anything else must be a valid request
fn parse_start_request(body: &[u8]) -> ApiResult<StartPodcastRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartPodcastRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

/// GET /podcasts/:analysis_id/status
pub async fn get_podcast_status(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> ApiResult<Json<PodcastStatusResponse>> {
    let entry = state
        .active_runs
        .find_by_analysis(&analysis_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No podcast run for analysis: {}", analysis_id)))?;

    let run = entry.run.read().await;
    Ok(Json(PodcastStatusResponse::from(&*run)))
}

/// POST /podcasts/:analysis_id/cancel
pub async fn cancel_podcast(
    State(state): State<AppState>,
    Path(analysis_id): Path<String>,
) -> ApiResult<Json<CancelPodcastResponse>> {
    let entry = state
        .active_runs
        .find_by_analysis(&analysis_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No podcast run for analysis: {}", analysis_id)))?;

    let (run_id, run_state) = {
        let run = entry.run.read().await;
        if run.is_terminal() {
            return Err(ApiError::Conflict(format!(
                "Podcast run {} already finished ({})",
                run.run_id, run.state
            )));
        }
        (run.run_id, run.state)
    };

    entry.cancel.cancel();
    tracing::info!(run_id = %run_id, analysis_id = %analysis_id, "Podcast run cancellation requested");

    Ok(Json(CancelPodcastResponse {
        run_id,
        state: run_state,
        cancel_requested: true,
        cancelled_at: Utc::now(),
    }))
}

/// Build podcast routes
pub fn podcast_routes() -> Router<AppState> {
    Router::new()
        .route("/podcasts/:analysis_id", post(start_podcast))
        .route("/podcasts/:analysis_id/status", get(get_podcast_status))
        .route("/podcasts/:analysis_id/cancel", post(cancel_podcast))
}
