//! # Ridecast Common Library
//!
//! Shared code for the Ridecast podcast services:
//! - Error type
//! - Service configuration (TOML) and config file resolution
//! - Pipeline event types and the broadcast EventBus
//! - SSE helpers
//! - Human-readable elapsed time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod sse;

pub use error::{Error, Result};
