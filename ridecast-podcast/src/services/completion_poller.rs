//! Completion poller
//!
//! Waits for the synthesis worker's output to appear in the artifact store.
//! Probes on a fixed interval until the artifact is found, the deadline
//! passes, or the run is cancelled. The first probe happens one interval
//! after polling starts.
//!
//! Once the poller leaves `Polling`, no further probe is issued: the ticker
//! lives inside `wait_for_artifact` and is dropped when it returns.

use serde::Serialize;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::services::artifact_locator::ArtifactStore;

/// Default probe interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default overall deadline
pub const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(600);

/// Poller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerState {
    Idle,
    Polling,
    Completed,
    TimedOut,
    Cancelled,
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Terminal state: `Completed`, `TimedOut` or `Cancelled`
    pub state: PollerState,
    /// Probes issued
    pub probes: u32,
    /// Time spent waiting
    pub elapsed: Duration,
}

/// Fixed-interval poller with a hard deadline
#[derive(Debug, Clone, Copy)]
pub struct CompletionPoller {
    interval: Duration,
    deadline: Duration,
}

impl Default for CompletionPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_POLL_DEADLINE)
    }
}

impl CompletionPoller {
    /// A zero interval is bumped to one millisecond
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            deadline,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Probe `url` until the artifact exists, the deadline passes, or
    /// `cancel` fires
    ///
    /// Probe errors are treated as "not yet" and retried on the next tick.
    pub async fn wait_for_artifact(
        &self,
        store: &dyn ArtifactStore,
        url: &str,
        cancel: &CancellationToken,
    ) -> PollOutcome {
        let started = Instant::now();
        let deadline_at = started + self.deadline;
        let mut probes: u32 = 0;

        let mut ticker = tokio::time::interval_at(started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            url = %url,
            interval_secs = self.interval.as_secs_f64(),
            deadline_secs = self.deadline.as_secs(),
            "Polling for podcast artifact"
        );

        let state = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break PollerState::Cancelled,

                _ = tokio::time::sleep_until(deadline_at) => break PollerState::TimedOut,

                _ = ticker.tick() => {
                    probes += 1;
                    // The probe itself must not outlive cancellation or the deadline
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break PollerState::Cancelled,
                        _ = tokio::time::sleep_until(deadline_at) => break PollerState::TimedOut,
                        result = store.probe(url) => result,
                    };

                    match result {
                        Ok(true) => break PollerState::Completed,
                        Ok(false) => {
                            tracing::trace!(probe = probes, "Podcast not ready yet");
                        }
                        Err(e) => {
                            tracing::warn!(probe = probes, error = %e, "Podcast probe failed, retrying");
                        }
                    }
                }
            }
        };

        let elapsed = started.elapsed();
        match state {
            PollerState::Completed => {
                tracing::info!(probes, elapsed_secs = elapsed.as_secs(), "Podcast artifact is ready")
            }
            PollerState::TimedOut => {
                tracing::warn!(probes, elapsed_secs = elapsed.as_secs(), "Gave up waiting for podcast")
            }
            _ => tracing::info!(probes, "Podcast polling cancelled"),
        }

        PollOutcome {
            state,
            probes,
            elapsed,
        }
    }
}
