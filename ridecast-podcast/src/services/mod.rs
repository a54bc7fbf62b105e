//! Service modules for podcast generation
//!
//! One module per pipeline stage, plus the orchestrator that chains them and
//! the in-memory registries the HTTP service keeps.

pub mod active_runs;
pub mod analysis_source;
pub mod artifact_delivery;
pub mod artifact_locator;
pub mod completion_poller;
pub mod job_submitter;
pub mod pipeline_orchestrator;
pub mod prompt_composer;
pub mod script_generator;
pub mod style_formatter;

pub use active_runs::{ActiveRuns, AlreadyRunning, RunEntry};
pub use analysis_source::{AnalysisSource, HttpAnalysisSource, InMemoryAnalysisSource};
pub use artifact_delivery::{
    download_filename, ArtifactDelivery, DeliveryStrategy, TransientObject, TransientObjectRegistry,
};
pub use artifact_locator::{
    ArtifactLocator, ArtifactStatus, ArtifactStore, FetchError, HttpArtifactStore, ProbeError,
};
pub use completion_poller::{CompletionPoller, PollOutcome, PollerState};
pub use job_submitter::{
    submit_job, HttpSynthesisWorker, SubmissionAck, SubmissionError, SubmissionRequest,
    SynthesisWorker,
};
pub use pipeline_orchestrator::{PodcastPipeline, PodcastRequest};
pub use prompt_composer::compose_prompts;
pub use script_generator::{generate_script, GenerationError, HttpTextGenerator, TextGenerator};
pub use style_formatter::{format_script, format_text};
