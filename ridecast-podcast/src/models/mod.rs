//! Data models for ridecast-podcast
//!
//! - Analysis records (read-only input)
//! - Artifact identity
//! - Script stages
//! - Pipeline run tracking and delivery results

pub mod analysis;
pub mod artifact;
pub mod delivery;
pub mod pipeline_run;
pub mod script;

pub use analysis::{AnalysisRecord, AnalysisStatus, Discipline, MovementScore};
pub use artifact::ArtifactKey;
pub use delivery::{DeliveredArtifact, DeliveryLocation, Disposition};
pub use pipeline_run::{PipelineRun, RunError, SharedRun, StateTransition};
pub use script::{DraftScript, FormattedScript, PromptStage, StagePrompt, PARAGRAPH_SEPARATOR};
