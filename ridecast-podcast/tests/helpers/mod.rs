//! Shared test doubles for ridecast-podcast integration tests
//!
//! Each fake counts its calls so tests can assert what the pipeline did and,
//! just as often, what it did not do.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ridecast_common::events::{EventBus, PipelineEvent};
use ridecast_podcast::models::{AnalysisRecord, AnalysisStatus, Discipline, MovementScore};
use ridecast_podcast::services::{
    ArtifactDelivery, ArtifactLocator, ArtifactStore, CompletionPoller, FetchError,
    GenerationError, PodcastPipeline, ProbeError, SubmissionAck, SubmissionError,
    SubmissionRequest, SynthesisWorker, TextGenerator, TransientObjectRegistry,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ARTIFACT_BASE_URL: &str = "https://storage.test/podcasts";
pub const AUDIO_BYTES: &[u8] = b"ID3\x04\x00fake-mp3-frames";

/// Text generator that answers every prompt, optionally failing on one call
#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<String>>,
    pub fail_on_call: Option<usize>,
}

impl FakeGenerator {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        if Some(prompts.len()) == self.fail_on_call {
            return Err(GenerationError::ApiError(500, "model overloaded".to_string()));
        }
        Ok(format!("## Part {}\nYou rode a **lovely** test today.", prompts.len()))
    }
}

/// Synthesis worker that accepts, or rejects with a status
#[derive(Default)]
pub struct FakeWorker {
    pub requests: Mutex<Vec<SubmissionRequest>>,
    pub reject_with: Option<u16>,
}

impl FakeWorker {
    pub fn rejecting(status: u16) -> Self {
        Self {
            reject_with: Some(status),
            ..Default::default()
        }
    }

    pub fn submissions(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SynthesisWorker for FakeWorker {
    async fn submit(&self, request: &SubmissionRequest) -> Result<SubmissionAck, SubmissionError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.reject_with {
            Some(status) => Err(SubmissionError {
                status: Some(status),
                message: "worker unavailable".to_string(),
            }),
            None => Ok(SubmissionAck {
                job_id: Some("job-1".to_string()),
                message: None,
            }),
        }
    }
}

/// Artifact store whose artifact appears on a given probe
///
/// `ready_on_probe: Some(1)` means the artifact already exists;
/// `None` means it never appears. `fail_on_probe` answers that probe with a
/// network error.
pub struct FakeStore {
    pub ready_on_probe: Option<u32>,
    pub fail_on_probe: Option<u32>,
    pub probes: AtomicU32,
    pub fetches: AtomicU32,
    pub probed_urls: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn ready_on(probe: u32) -> Self {
        Self {
            ready_on_probe: Some(probe),
            fail_on_probe: None,
            probes: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
            probed_urls: Mutex::new(Vec::new()),
        }
    }

    pub fn never_ready() -> Self {
        Self {
            ready_on_probe: None,
            ..Self::ready_on(0)
        }
    }

    /// Existence check fails; the artifact would appear on the next probe
    pub fn unreachable_at_first() -> Self {
        Self {
            fail_on_probe: Some(1),
            ..Self::ready_on(2)
        }
    }

    pub fn probe_count(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn probe(&self, url: &str) -> Result<bool, ProbeError> {
        let n = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        self.probed_urls.lock().unwrap().push(url.to_string());
        if Some(n) == self.fail_on_probe {
            return Err(ProbeError::Network("connection reset".to_string()));
        }
        Ok(self.ready_on_probe.map_or(false, |ready| n >= ready))
    }

    async fn fetch(&self, _url: &str) -> Result<Bytes, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from_static(AUDIO_BYTES))
    }
}

/// Collaborators of one test pipeline
pub struct TestPipeline {
    pub pipeline: PodcastPipeline,
    pub generator: Arc<FakeGenerator>,
    pub worker: Arc<FakeWorker>,
    pub store: Arc<FakeStore>,
    pub downloads: TransientObjectRegistry,
    pub event_bus: EventBus,
}

/// Pipeline over fakes with the given poller and handle release delay
pub fn build_pipeline(
    generator: FakeGenerator,
    worker: FakeWorker,
    store: FakeStore,
    poller: CompletionPoller,
    release_after: Duration,
) -> TestPipeline {
    let generator = Arc::new(generator);
    let worker = Arc::new(worker);
    let store = Arc::new(store);
    let downloads = TransientObjectRegistry::new();
    let event_bus = EventBus::new(100);

    let locator = ArtifactLocator::new(store.clone(), ARTIFACT_BASE_URL, "podcast.mp3");
    let delivery = ArtifactDelivery::new(store.clone(), downloads.clone(), release_after);

    let pipeline = PodcastPipeline::new(
        generator.clone(),
        worker.clone(),
        locator,
        poller,
        delivery,
        event_bus.clone(),
    );

    TestPipeline {
        pipeline,
        generator,
        worker,
        store,
        downloads,
        event_bus,
    }
}

/// Completed dressage analysis for owner `u1`, analysis `a1`
pub fn completed_record() -> AnalysisRecord {
    AnalysisRecord {
        owner_id: "u1".to_string(),
        analysis_id: "a1".to_string(),
        status: AnalysisStatus::Completed,
        discipline: Discipline::Dressage,
        document_name: Some("Spring Show Test.pdf".to_string()),
        rider_name: Some("Alex".to_string()),
        horse_name: Some("Comet".to_string()),
        test_name: Some("Training Level Test 2".to_string()),
        total_score: Some(201.0),
        percentage: Some(67.0),
        movement_scores: vec![
            MovementScore {
                movement: "Free walk".to_string(),
                score: 8.0,
                comment: Some("Good stretch".to_string()),
            },
            MovementScore {
                movement: "Canter depart".to_string(),
                score: 5.5,
                comment: None,
            },
        ],
        strengths: vec!["Rhythm".to_string()],
        weaknesses: vec!["Bend on circles".to_string()],
        judge_comments: vec!["Pleasant pair".to_string()],
        recommendations: vec!["Spiral in and out exercises".to_string()],
    }
}

/// Events received so far, without waiting
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
