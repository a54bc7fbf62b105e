//! HTTP API handlers for ridecast-podcast
//!
//! REST endpoints to start, inspect and cancel runs, a download endpoint for
//! transient handles, and an SSE stream of pipeline events.

pub mod downloads;
pub mod health;
pub mod podcasts;
pub mod sse;

pub use downloads::download_routes;
pub use health::health_routes;
pub use podcasts::podcast_routes;
pub use sse::event_routes;
