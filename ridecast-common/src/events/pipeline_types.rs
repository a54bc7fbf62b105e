//! Pipeline state types shared between the orchestrator and its observers

use serde::{Deserialize, Serialize};

/// Podcast pipeline state
///
/// IDLE → CHECKING_ARTIFACT → GENERATING_SCRIPT → FORMATTING_SCRIPT →
/// SUBMITTING_JOB → POLLING → DOWNLOADING → COMPLETED
///
/// CHECKING_ARTIFACT jumps straight to DOWNLOADING when the artifact
/// already exists. Any state may end in FAILED or CANCELLED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    /// Run created, nothing started
    Idle,
    /// Probing the artifact store for a finished podcast
    CheckingArtifact,
    /// Calling the text-generation service stage by stage
    GeneratingScript,
    /// Applying narration markup
    FormattingScript,
    /// Handing the script to the synthesis worker
    SubmittingJob,
    /// Waiting for the worker to publish the artifact
    Polling,
    /// Fetching the finished artifact
    Downloading,
    /// Artifact delivered
    Completed,
    /// Run stopped on an error
    Failed,
    /// Run torn down before finishing
    Cancelled,
}

impl PipelineState {
    /// Human-readable progress text shown while in this state
    pub fn progress_message(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Waiting to start...",
            PipelineState::CheckingArtifact => "Checking for existing podcast...",
            PipelineState::GeneratingScript => "Generating podcast script...",
            PipelineState::FormattingScript => "Formatting script for narration...",
            PipelineState::SubmittingJob => "Submitting podcast for audio generation...",
            PipelineState::Polling => "Generating audio... This may take a few minutes.",
            PipelineState::Downloading => "Downloading podcast...",
            PipelineState::Completed => "Podcast ready.",
            PipelineState::Failed => "Podcast generation failed.",
            PipelineState::Cancelled => "Podcast generation cancelled.",
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Failed | PipelineState::Cancelled
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Idle => "IDLE",
            PipelineState::CheckingArtifact => "CHECKING_ARTIFACT",
            PipelineState::GeneratingScript => "GENERATING_SCRIPT",
            PipelineState::FormattingScript => "FORMATTING_SCRIPT",
            PipelineState::SubmittingJob => "SUBMITTING_JOB",
            PipelineState::Polling => "POLLING",
            PipelineState::Downloading => "DOWNLOADING",
            PipelineState::Completed => "COMPLETED",
            PipelineState::Failed => "FAILED",
            PipelineState::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}
