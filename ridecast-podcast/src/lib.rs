//! ridecast-podcast library interface
//!
//! Exposes the pipeline, its collaborators and the HTTP service for the
//! binary and for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, PipelineError};

use axum::Router;
use chrono::{DateTime, Utc};
use ridecast_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::{ActiveRuns, AnalysisSource, PodcastPipeline, TransientObjectRegistry};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PodcastPipeline>,
    pub analysis_source: Arc<dyn AnalysisSource>,
    /// One entry per artifact key; guards against concurrent runs
    pub active_runs: ActiveRuns,
    /// Transient download handles
    pub downloads: TransientObjectRegistry,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Parent of every run's cancellation token
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<PodcastPipeline>,
        analysis_source: Arc<dyn AnalysisSource>,
        downloads: TransientObjectRegistry,
        event_bus: EventBus,
    ) -> Self {
        Self {
            pipeline,
            analysis_source,
            active_runs: ActiveRuns::new(),
            downloads,
            event_bus,
            shutdown: CancellationToken::new(),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::podcast_routes())
        .merge(api::download_routes())
        .merge(api::event_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
