//! In-flight run registry
//!
//! One entry per artifact key. A key with a non-terminal run refuses a new
//! start; once the run reaches a terminal state, its entry stays around for
//! status queries until the next start replaces it or the retention period
//! passes. Expired entries are pruned whenever a run is registered.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::models::{ArtifactKey, SharedRun};

/// How long a finished run stays queryable
pub const DEFAULT_RUN_RETENTION: Duration = Duration::from_secs(60 * 60);

/// A registered run and its cancellation token
#[derive(Clone)]
pub struct RunEntry {
    pub run: SharedRun,
    pub cancel: CancellationToken,
}

/// Refusal to start a second run for a key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Podcast generation already in progress for {key}")]
pub struct AlreadyRunning {
    pub key: ArtifactKey,
}

#[derive(Clone)]
pub struct ActiveRuns {
    entries: Arc<RwLock<HashMap<ArtifactKey, RunEntry>>>,
    retention: Duration,
}

impl Default for ActiveRuns {
    fn default() -> Self {
        Self::with_retention(DEFAULT_RUN_RETENTION)
    }
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            retention,
        }
    }

    /// Register `run` under `key` unless a live run already holds it
    ///
    /// The check and the insert happen under one write lock. The returned
    /// token is a child of `parent`, so service shutdown cancels every run.
    pub async fn try_begin(
        &self,
        key: ArtifactKey,
        run: SharedRun,
        parent: &CancellationToken,
    ) -> Result<CancellationToken, AlreadyRunning> {
        let mut entries = self.entries.write().await;

        let now = Utc::now();
        let mut expired = Vec::new();
        for (existing_key, entry) in entries.iter() {
            let run = entry.run.read().await;
            let past_retention = run
                .ended_at
                .and_then(|ended| (now - ended).to_std().ok())
                .is_some_and(|age| age >= self.retention);
            if run.is_terminal() && past_retention {
                expired.push(existing_key.clone());
            }
        }
        for existing_key in expired {
            tracing::debug!(artifact = %existing_key, "Dropping finished podcast run");
            entries.remove(&existing_key);
        }

        if let Some(existing) = entries.get(&key) {
            if !existing.run.read().await.is_terminal() {
                return Err(AlreadyRunning { key });
            }
        }

        let cancel = parent.child_token();
        entries.insert(
            key,
            RunEntry {
                run,
                cancel: cancel.clone(),
            },
        );
        Ok(cancel)
    }

    /// Most recently started run for an analysis, whoever owns it
    pub async fn find_by_analysis(&self, analysis_id: &str) -> Option<RunEntry> {
        let entries = self.entries.read().await;
        let mut latest: Option<(chrono::DateTime<chrono::Utc>, &RunEntry)> = None;

        for (key, entry) in entries.iter() {
            if key.analysis_id() != analysis_id {
                continue;
            }
            let started_at = entry.run.read().await.started_at;
            if latest.map_or(true, |(t, _)| started_at > t) {
                latest = Some((started_at, entry));
            }
        }

        latest.map(|(_, entry)| entry.clone())
    }

    /// Number of runs not yet in a terminal state
    pub async fn active_count(&self) -> usize {
        let entries = self.entries.read().await;
        let mut count = 0;
        for entry in entries.values() {
            if !entry.run.read().await.is_terminal() {
                count += 1;
            }
        }
        count
    }
}
