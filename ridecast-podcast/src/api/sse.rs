//! Server-Sent Events for pipeline progress
//!
//! Streams events:
//! - PodcastRunStarted
//! - PodcastProgress (one per state transition)
//! - PodcastCompleted
//! - PodcastFailed
//! - PodcastCancelled

use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use ridecast_common::events::PipelineEvent;
use serde::Deserialize;
use std::convert::Infallible;

use crate::AppState;

/// Optional stream filter
#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only forward events for this analysis
    pub analysis_id: Option<String>,
}

/// GET /podcasts/events
pub async fn podcast_event_stream(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    ridecast_common::sse::create_event_sse_stream(
        "ridecast-podcast",
        &state.event_bus,
        move |event| match &filter.analysis_id {
            None => true,
            Some(wanted) => event_analysis_id(event) == wanted,
        },
    )
}

fn event_analysis_id(event: &PipelineEvent) -> &str {
    match event {
        PipelineEvent::PodcastRunStarted { analysis_id, .. }
        | PipelineEvent::PodcastProgress { analysis_id, .. }
        | PipelineEvent::PodcastCompleted { analysis_id, .. }
        | PipelineEvent::PodcastFailed { analysis_id, .. }
        | PipelineEvent::PodcastCancelled { analysis_id, .. } => analysis_id,
    }
}

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/podcasts/events", get(podcast_event_stream))
}
