//! Event types for the Ridecast event system
//!
//! Provides shared event definitions and the EventBus used to fan pipeline
//! progress out to SSE clients and log observers.

mod pipeline_types;

pub use pipeline_types::PipelineState;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Ridecast event types
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A pipeline run was accepted for an (owner, analysis) pair
    PodcastRunStarted {
        run_id: Uuid,
        owner_id: String,
        analysis_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The run entered a new state
    ///
    /// `message` is the human-readable progress text for the UI.
    PodcastProgress {
        run_id: Uuid,
        owner_id: String,
        analysis_id: String,
        state: PipelineState,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Artifact delivered
    PodcastCompleted {
        run_id: Uuid,
        owner_id: String,
        analysis_id: String,
        /// Download filename presented to the user
        filename: String,
        /// Transient download URL (absent for save-to-disk delivery)
        download_url: Option<String>,
        /// True when an existing artifact was reused and nothing was generated
        reused_existing: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Run stopped on an error
    PodcastFailed {
        run_id: Uuid,
        owner_id: String,
        analysis_id: String,
        /// Stable error kind (e.g. "submission_error")
        error_kind: String,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Run torn down before it finished
    PodcastCancelled {
        run_id: Uuid,
        owner_id: String,
        analysis_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PipelineEvent {
    /// Event type name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            PipelineEvent::PodcastRunStarted { .. } => "PodcastRunStarted",
            PipelineEvent::PodcastProgress { .. } => "PodcastProgress",
            PipelineEvent::PodcastCompleted { .. } => "PodcastCompleted",
            PipelineEvent::PodcastFailed { .. } => "PodcastFailed",
            PipelineEvent::PodcastCancelled { .. } => "PodcastCancelled",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over a tokio broadcast channel. Cloning shares the channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PipelineEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow receivers lag
    ///
    /// # Examples
    ///
    /// ```
    /// use ridecast_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of receivers if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PipelineEvent,
    ) -> Result<usize, broadcast::error::SendError<PipelineEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress events are informational; a run must not fail because
    /// nobody is watching it.
    pub fn emit_lossy(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
