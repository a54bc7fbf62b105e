//! Artifact delivery
//!
//! Fetches the finished audio and hands it to the user. Browser-facing runs
//! get a transient download handle, served from memory and revoked after a
//! short delay; CLI runs write the file to disk.
//!
//! Which browser behavior to use depends on the client platform:
//! - Mobile Safari and in-app browsers ignore save-to-disk downloads, so
//!   they get the file inline in a new viewing context
//! - Everything else gets a regular attachment download

use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::{DeliveredArtifact, DeliveryLocation, Disposition};
use crate::services::artifact_locator::{ArtifactStore, FetchError};

/// Audio content type of every podcast artifact
pub const PODCAST_CONTENT_TYPE: &str = "audio/mpeg";

const FALLBACK_BASENAME: &str = "podcast";

/// Delivery strategy chosen per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStrategy {
    /// Save-to-disk download
    Attachment,
    /// Open in a new viewing context
    Inline,
    /// Write to a local directory (CLI)
    SaveToDisk { dir: PathBuf },
}

impl DeliveryStrategy {
    /// Pick the browser strategy from a User-Agent header
    pub fn for_user_agent(user_agent: Option<&str>) -> Self {
        match user_agent {
            Some(ua) if is_inline_only_client(ua) => DeliveryStrategy::Inline,
            _ => DeliveryStrategy::Attachment,
        }
    }
}

/// Clients that cannot save a download to disk
fn is_inline_only_client(ua: &str) -> bool {
    let ios = ["iPhone", "iPad", "iPod"].iter().any(|d| ua.contains(d))
        // iPadOS reports itself as a Mac
        || (ua.contains("Macintosh") && ua.contains("Mobile/"));
    let in_app = ["FBAN", "FBAV", "Instagram", "Line/"]
        .iter()
        .any(|marker| ua.contains(marker))
        // Android WebView
        || ua.contains("; wv)");

    ios || in_app
}

/// User-facing filename: source document base name with a `.mp3` extension
///
/// Directory components and the original extension are dropped, characters
/// unsafe in a `Content-Disposition` filename are replaced with `_`.
pub fn download_filename(document_name: Option<&str>) -> String {
    let base = document_name
        .map(|name| name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name))
        .map(|name| match name.rfind('.') {
            Some(idx) => &name[..idx],
            None => name,
        })
        .map(|stem| {
            stem.trim()
                .chars()
                .map(|c| {
                    if c.is_control() || matches!(c, '"' | '\\' | '/' | ':' | '*' | '?' | '<' | '>' | '|' | ';') {
                        '_'
                    } else {
                        c
                    }
                })
                .collect::<String>()
        })
        .filter(|stem| !stem.trim_matches(|c: char| matches!(c, '_' | '.' | ' ')).is_empty())
        .unwrap_or_else(|| FALLBACK_BASENAME.to_string());

    format!("{}.mp3", base)
}

/// Bytes held behind a download handle
#[derive(Debug, Clone)]
pub struct TransientObject {
    pub bytes: Bytes,
    pub filename: String,
    pub content_type: &'static str,
    pub disposition: Disposition,
}

/// In-memory download handles with automatic revocation
#[derive(Clone, Default)]
pub struct TransientObjectRegistry {
    objects: Arc<RwLock<HashMap<Uuid, TransientObject>>>,
}

impl TransientObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and schedule the handle's revocation
    pub async fn register(&self, object: TransientObject, release_after: Duration) -> Uuid {
        let handle = Uuid::new_v4();
        self.objects.write().await.insert(handle, object);

        let objects = Arc::clone(&self.objects);
        tokio::spawn(async move {
            tokio::time::sleep(release_after).await;
            if objects.write().await.remove(&handle).is_some() {
                tracing::debug!(handle = %handle, "Download handle revoked");
            }
        });

        handle
    }

    pub async fn get(&self, handle: &Uuid) -> Option<TransientObject> {
        self.objects.read().await.get(handle).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

/// Fetches artifacts and delivers them per strategy
#[derive(Clone)]
pub struct ArtifactDelivery {
    store: Arc<dyn ArtifactStore>,
    registry: TransientObjectRegistry,
    release_after: Duration,
}

impl ArtifactDelivery {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        registry: TransientObjectRegistry,
        release_after: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            release_after,
        }
    }

    pub fn registry(&self) -> &TransientObjectRegistry {
        &self.registry
    }

    /// Fetch `url` and deliver it
    ///
    /// A failed fetch is a delivery error; nothing is retried.
    pub async fn deliver(
        &self,
        url: &str,
        document_name: Option<&str>,
        strategy: &DeliveryStrategy,
    ) -> Result<DeliveredArtifact, PipelineError> {
        let bytes = self.store.fetch(url).await.map_err(|e| {
            tracing::error!(url = %url, error = %e, "Podcast fetch failed");
            match e {
                FetchError::Status(status) => PipelineError::Delivery {
                    status: Some(status),
                    message: e.to_string(),
                },
                FetchError::Network(message) => PipelineError::Delivery {
                    status: None,
                    message,
                },
            }
        })?;

        let filename = download_filename(document_name);
        let size_bytes = bytes.len();

        let location = match strategy {
            DeliveryStrategy::Attachment | DeliveryStrategy::Inline => {
                let disposition = if *strategy == DeliveryStrategy::Inline {
                    Disposition::Inline
                } else {
                    Disposition::Attachment
                };
                let handle = self
                    .registry
                    .register(
                        TransientObject {
                            bytes,
                            filename: filename.clone(),
                            content_type: PODCAST_CONTENT_TYPE,
                            disposition,
                        },
                        self.release_after,
                    )
                    .await;
                DeliveryLocation::Transient {
                    handle,
                    url: format!("/downloads/{}", handle),
                    disposition,
                }
            }
            DeliveryStrategy::SaveToDisk { dir } => {
                let path = save_to_disk(dir, &filename, &bytes).await?;
                DeliveryLocation::Disk { path }
            }
        };

        tracing::info!(filename = %filename, size_bytes, "Podcast delivered");

        Ok(DeliveredArtifact {
            filename,
            size_bytes,
            location,
        })
    }
}

async fn save_to_disk(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
    let to_error = |e: std::io::Error| PipelineError::Delivery {
        status: None,
        message: format!("Failed to write {}: {}", dir.join(filename).display(), e),
    };

    tokio::fs::create_dir_all(dir).await.map_err(to_error)?;
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes).await.map_err(to_error)?;
    Ok(path)
}
