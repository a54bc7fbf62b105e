//! Pipeline run record (in-memory only)
//!
//! A generation job has no persisted record; this struct exists so the
//! service can answer status queries while a run is in flight.

use chrono::{DateTime, Utc};
use ridecast_common::events::PipelineState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::{ArtifactKey, DeliveredArtifact};

/// Run record shared between the orchestrator task and API handlers
pub type SharedRun = Arc<RwLock<PipelineRun>>;

/// Terminal error of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    /// Stable kind, e.g. "submission_error"
    pub kind: String,
    pub message: String,
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// One pipeline run for an artifact key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub key: ArtifactKey,
    pub state: PipelineState,
    /// Progress text for the UI
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub error: Option<RunError>,
    pub delivered: Option<DeliveredArtifact>,
    /// True when an existing artifact was reused
    pub reused_existing: bool,
}

impl PipelineRun {
    pub fn new(key: ArtifactKey) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            key,
            state: PipelineState::Idle,
            message: PipelineState::Idle.progress_message().to_string(),
            started_at: Utc::now(),
            ended_at: None,
            error: None,
            delivered: None,
            reused_existing: false,
        }
    }

    /// Wrap into the shared handle
    pub fn shared(self) -> SharedRun {
        Arc::new(RwLock::new(self))
    }

    /// Transition to new state, resetting the progress message
    pub fn transition_to(&mut self, new_state: PipelineState) -> StateTransition {
        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        self.message = new_state.progress_message().to_string();

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        transition
    }

    /// Record successful delivery
    pub fn complete(&mut self, delivered: DeliveredArtifact, reused_existing: bool) {
        self.delivered = Some(delivered);
        self.reused_existing = reused_existing;
        self.transition_to(PipelineState::Completed);
    }

    /// Record a terminal error; cancellation is its own terminal state
    pub fn fail(&mut self, error: &PipelineError) {
        if matches!(error, PipelineError::Cancelled) {
            self.transition_to(PipelineState::Cancelled);
            return;
        }
        self.error = Some(RunError {
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
        self.transition_to(PipelineState::Failed);
        self.message = error.to_string();
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Seconds since the run started (or until it ended)
    pub fn elapsed_seconds(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds().max(0) as u64
    }
}
