//! Error types for ridecast-podcast
//!
//! `PipelineError` is the taxonomy every pipeline component reports in;
//! `ApiError` maps it (and request validation failures) onto HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ridecast_common::human_time::format_elapsed;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::services::artifact_locator::ProbeError;

/// Pipeline error taxonomy
///
/// Only `Probe` failures during polling are retried (on the next tick);
/// every other variant ends the run.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Owner or analysis id is blank or unusable
    #[error("Analysis record is missing required identity: {0}")]
    MissingIdentity(String),

    #[error("Analysis not found: {0}")]
    AnalysisNotFound(String),

    /// Analysis exists but has not finished processing
    #[error("Analysis {analysis_id} is not completed yet (status: {status})")]
    AnalysisNotReady { analysis_id: String, status: String },

    /// Analysis data source unreachable or returned garbage
    #[error("Could not load analysis: {0}")]
    AnalysisSource(String),

    /// Text generation failed for one stage; no partial script is kept
    #[error("Script generation failed at stage '{stage}': {message}")]
    StageGeneration { stage: String, message: String },

    /// Synthesis worker rejected the job or could not be reached
    #[error("Podcast submission rejected{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Submission { status: Option<u16>, message: String },

    /// Artifact did not appear before the polling deadline
    #[error("Podcast generation is taking longer than expected (waited {}). Please try again later.", format_elapsed(*waited))]
    GenerationTimeout { waited: Duration },

    /// Artifact fetch failed
    #[error("Podcast download failed{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Delivery { status: Option<u16>, message: String },

    /// Existence check could not tell present from absent
    #[error("Could not check for an existing podcast: {0}")]
    Probe(#[from] ProbeError),

    /// Run torn down before finishing
    #[error("Podcast generation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Stable, machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingIdentity(_) => "missing_identity",
            PipelineError::AnalysisNotFound(_) => "analysis_not_found",
            PipelineError::AnalysisNotReady { .. } => "analysis_not_ready",
            PipelineError::AnalysisSource(_) => "analysis_source_error",
            PipelineError::StageGeneration { .. } => "stage_generation_error",
            PipelineError::Submission { .. } => "submission_error",
            PipelineError::GenerationTimeout { .. } => "generation_timeout",
            PipelineError::Delivery { .. } => "delivery_error",
            PipelineError::Probe(_) => "probe_error",
            PipelineError::Cancelled => "cancelled",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::MissingIdentity(_) => StatusCode::BAD_REQUEST,
            PipelineError::AnalysisNotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::AnalysisNotReady { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Cancelled => StatusCode::CONFLICT,
            PipelineError::AnalysisSource(_)
            | PipelineError::StageGeneration { .. }
            | PipelineError::Submission { .. }
            | PipelineError::Delivery { .. }
            | PipelineError::Probe(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., podcast already generating for this analysis
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Pipeline error surfaced synchronously
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND".to_string(), msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST".to_string(), msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT".to_string(), msg),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR".to_string(),
                msg,
            ),
            ApiError::Pipeline(ref err) => (
                err.status_code(),
                err.kind().to_uppercase(),
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_message_includes_status() {
        let err = PipelineError::Submission {
            status: Some(429),
            message: "quota exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Podcast submission rejected (HTTP 429): quota exceeded"
        );

        let err = PipelineError::Submission {
            status: None,
            message: "connection refused".to_string(),
        };
        assert_eq!(err.to_string(), "Podcast submission rejected: connection refused");
    }

    #[test]
    fn test_timeout_message_advises_retry_later() {
        let err = PipelineError::GenerationTimeout {
            waited: Duration::from_secs(600),
        };
        let message = err.to_string();
        assert!(message.contains("10:00"));
        assert!(message.contains("try again later"));
        assert_eq!(err.kind(), "generation_timeout");
    }

    #[test]
    fn test_pipeline_error_status_codes() {
        assert_eq!(
            ApiError::from(PipelineError::AnalysisNotFound("a1".into()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(PipelineError::MissingIdentity("owner id".into()))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("busy".into()).into_response().status(),
            StatusCode::CONFLICT
        );
    }
}
