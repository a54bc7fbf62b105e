//! Delivery results

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// How the browser should treat a served download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Save-to-disk download
    Attachment,
    /// Open in a new viewing context
    Inline,
}

impl Disposition {
    /// `Content-Disposition` header value for `filename`
    pub fn header_value(&self, filename: &str) -> String {
        let kind = match self {
            Disposition::Attachment => "attachment",
            Disposition::Inline => "inline",
        };
        // Filenames are sanitized on creation; quotes never appear
        format!("{}; filename=\"{}\"", kind, filename)
    }
}

/// Where a delivered artifact ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryLocation {
    /// Held in memory behind a short-lived download handle
    Transient {
        handle: Uuid,
        url: String,
        disposition: Disposition,
    },
    /// Written to a local file
    Disk { path: PathBuf },
}

/// A delivered podcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredArtifact {
    pub filename: String,
    pub size_bytes: usize,
    pub location: DeliveryLocation,
}

impl DeliveredArtifact {
    /// Download URL for transient deliveries
    pub fn download_url(&self) -> Option<&str> {
        match &self.location {
            DeliveryLocation::Transient { url, .. } => Some(url),
            DeliveryLocation::Disk { .. } => None,
        }
    }
}
