//! Podcast pipeline orchestrator
//!
//! State progression:
//! CHECKING_ARTIFACT → (present) DOWNLOADING → COMPLETED
//! CHECKING_ARTIFACT → (absent) GENERATING_SCRIPT → FORMATTING_SCRIPT →
//! SUBMITTING_JOB → POLLING → DOWNLOADING → COMPLETED
//!
//! Any error ends the run in FAILED (or CANCELLED) with nothing retried.
//! Every transition is written to the shared run record and broadcast as a
//! `PodcastProgress` event.

use chrono::Utc;
use ridecast_common::events::{EventBus, PipelineEvent, PipelineState};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::models::{AnalysisRecord, ArtifactKey, DeliveredArtifact, PipelineRun, SharedRun};
use crate::services::artifact_delivery::{ArtifactDelivery, DeliveryStrategy};
use crate::services::artifact_locator::{ArtifactLocator, ArtifactStatus};
use crate::services::completion_poller::{CompletionPoller, PollerState};
use crate::services::job_submitter::{submit_job, SynthesisWorker};
use crate::services::prompt_composer::compose_prompts;
use crate::services::script_generator::{generate_script, TextGenerator};
use crate::services::style_formatter::format_script;

/// Per-run delivery options
#[derive(Debug, Clone)]
pub struct PodcastRequest {
    /// Overrides the record's document name for the download filename
    pub document_name: Option<String>,
    pub strategy: DeliveryStrategy,
}

impl Default for PodcastRequest {
    fn default() -> Self {
        Self {
            document_name: None,
            strategy: DeliveryStrategy::Attachment,
        }
    }
}

/// Successful run result
struct RunSuccess {
    delivered: DeliveredArtifact,
    reused_existing: bool,
}

/// Drives one podcast from analysis record to delivered audio
pub struct PodcastPipeline {
    generator: Arc<dyn TextGenerator>,
    worker: Arc<dyn SynthesisWorker>,
    locator: ArtifactLocator,
    poller: CompletionPoller,
    delivery: ArtifactDelivery,
    event_bus: EventBus,
}

impl PodcastPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        worker: Arc<dyn SynthesisWorker>,
        locator: ArtifactLocator,
        poller: CompletionPoller,
        delivery: ArtifactDelivery,
        event_bus: EventBus,
    ) -> Self {
        Self {
            generator,
            worker,
            locator,
            poller,
            delivery,
            event_bus,
        }
    }

    pub fn locator(&self) -> &ArtifactLocator {
        &self.locator
    }

    /// Run the pipeline for `record` with a fresh run record
    pub async fn generate(
        &self,
        record: &AnalysisRecord,
        request: &PodcastRequest,
        cancel: &CancellationToken,
    ) -> Result<DeliveredArtifact, PipelineError> {
        let key = record.artifact_key()?;
        self.run(PipelineRun::new(key).shared(), record, request, cancel)
            .await
    }

    /// Run the pipeline, reporting into an already registered run
    pub async fn run(
        &self,
        run: SharedRun,
        record: &AnalysisRecord,
        request: &PodcastRequest,
        cancel: &CancellationToken,
    ) -> Result<DeliveredArtifact, PipelineError> {
        let (run_id, key) = {
            let run = run.read().await;
            (run.run_id, run.key.clone())
        };

        tracing::info!(
            run_id = %run_id,
            owner_id = %key.owner_id(),
            analysis_id = %key.analysis_id(),
            "Podcast generation started"
        );
        self.event_bus.emit_lossy(PipelineEvent::PodcastRunStarted {
            run_id,
            owner_id: key.owner_id().to_string(),
            analysis_id: key.analysis_id().to_string(),
            timestamp: Utc::now(),
        });

        match self.execute(&run, record, request, cancel).await {
            Ok(success) => {
                let delivered = success.delivered.clone();
                self.handle_success(&run, success).await;
                Ok(delivered)
            }
            Err(e) => {
                self.handle_failure(&run, &e).await;
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run: &SharedRun,
        record: &AnalysisRecord,
        request: &PodcastRequest,
        cancel: &CancellationToken,
    ) -> Result<RunSuccess, PipelineError> {
        let key = record.artifact_key()?;
        record.ensure_completed()?;

        let document_name = request
            .document_name
            .as_deref()
            .or(record.document_name.as_deref());

        // Reuse before regenerate
        self.transition(run, PipelineState::CheckingArtifact).await;
        let url = match until_cancelled(cancel, self.locator.locate(&key)).await? {
            ArtifactStatus::Present(url) => {
                self.transition(run, PipelineState::Downloading).await;
                let delivered = until_cancelled(
                    cancel,
                    self.delivery.deliver(&url, document_name, &request.strategy),
                )
                .await??;
                return Ok(RunSuccess {
                    delivered,
                    reused_existing: true,
                });
            }
            ArtifactStatus::ProbeFailed(e) => return Err(e.into()),
            ArtifactStatus::Absent => self.locator.url_for(&key),
        };

        self.transition(run, PipelineState::GeneratingScript).await;
        let prompts = compose_prompts(record)?;
        let draft = until_cancelled(cancel, generate_script(self.generator.as_ref(), &prompts)).await??;

        self.transition(run, PipelineState::FormattingScript).await;
        let script = format_script(&draft);

        self.transition(run, PipelineState::SubmittingJob).await;
        until_cancelled(cancel, submit_job(self.worker.as_ref(), &script, &key)).await??;

        self.transition(run, PipelineState::Polling).await;
        let outcome = self
            .poller
            .wait_for_artifact(self.locator.store(), &url, cancel)
            .await;
        match outcome.state {
            PollerState::Completed => {}
            PollerState::Cancelled => return Err(PipelineError::Cancelled),
            _ => {
                return Err(PipelineError::GenerationTimeout {
                    waited: outcome.elapsed,
                })
            }
        }

        self.transition(run, PipelineState::Downloading).await;
        let delivered = until_cancelled(
            cancel,
            self.delivery.deliver(&url, document_name, &request.strategy),
        )
        .await??;

        Ok(RunSuccess {
            delivered,
            reused_existing: false,
        })
    }

    async fn transition(&self, run: &SharedRun, state: PipelineState) {
        let (transition, key, message) = {
            let mut run = run.write().await;
            let transition = run.transition_to(state);
            (transition, run.key.clone(), run.message.clone())
        };

        tracing::debug!(
            run_id = %transition.run_id,
            from = %transition.old_state,
            to = %transition.new_state,
            "Podcast run state changed"
        );
        self.emit_progress(transition.run_id, &key, state, message);
    }

    fn emit_progress(&self, run_id: uuid::Uuid, key: &ArtifactKey, state: PipelineState, message: String) {
        self.event_bus.emit_lossy(PipelineEvent::PodcastProgress {
            run_id,
            owner_id: key.owner_id().to_string(),
            analysis_id: key.analysis_id().to_string(),
            state,
            message,
            timestamp: Utc::now(),
        });
    }

    async fn handle_success(&self, run: &SharedRun, success: RunSuccess) {
        let (run_id, key, elapsed) = {
            let mut run = run.write().await;
            run.complete(success.delivered.clone(), success.reused_existing);
            (run.run_id, run.key.clone(), run.elapsed_seconds())
        };

        tracing::info!(
            run_id = %run_id,
            artifact = %key,
            filename = %success.delivered.filename,
            reused_existing = success.reused_existing,
            elapsed_secs = elapsed,
            "Podcast ready"
        );

        self.emit_progress(
            run_id,
            &key,
            PipelineState::Completed,
            PipelineState::Completed.progress_message().to_string(),
        );
        self.event_bus.emit_lossy(PipelineEvent::PodcastCompleted {
            run_id,
            owner_id: key.owner_id().to_string(),
            analysis_id: key.analysis_id().to_string(),
            filename: success.delivered.filename.clone(),
            download_url: success.delivered.download_url().map(str::to_string),
            reused_existing: success.reused_existing,
            timestamp: Utc::now(),
        });
    }

    async fn handle_failure(&self, run: &SharedRun, error: &PipelineError) {
        let (run_id, key) = {
            let mut run = run.write().await;
            run.fail(error);
            (run.run_id, run.key.clone())
        };

        if let PipelineError::Cancelled = error {
            tracing::info!(run_id = %run_id, artifact = %key, "Podcast generation cancelled");
            self.event_bus.emit_lossy(PipelineEvent::PodcastCancelled {
                run_id,
                owner_id: key.owner_id().to_string(),
                analysis_id: key.analysis_id().to_string(),
                timestamp: Utc::now(),
            });
            return;
        }

        tracing::error!(
            run_id = %run_id,
            artifact = %key,
            kind = error.kind(),
            error = %error,
            "Podcast generation failed"
        );
        self.event_bus.emit_lossy(PipelineEvent::PodcastFailed {
            run_id,
            owner_id: key.owner_id().to_string(),
            analysis_id: key.analysis_id().to_string(),
            error_kind: error.kind().to_string(),
            message: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Race `fut` against cancellation
async fn until_cancelled<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled),
        value = fut => Ok(value),
    }
}
