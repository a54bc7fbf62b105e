//! Artifact identity
//!
//! The (owner, analysis) pair is the only identity a generation job has:
//! the synthesis worker writes the finished audio to a path derived from it,
//! and the pipeline finds it there again.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Reject ids that would escape a single URL or storage path segment
pub fn check_path_segment(field: &str, value: &str) -> Result<(), PipelineError> {
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(PipelineError::MissingIdentity(format!(
            "{} is not a valid path segment: {:?}",
            field, value
        )));
    }
    Ok(())
}

/// Deterministic key of one podcast artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    owner_id: String,
    analysis_id: String,
}

impl ArtifactKey {
    /// Build a key, rejecting blank ids and ids that would escape their
    /// path segment
    pub fn new(owner_id: &str, analysis_id: &str) -> Result<Self, PipelineError> {
        let owner_id = owner_id.trim();
        let analysis_id = analysis_id.trim();

        if owner_id.is_empty() {
            return Err(PipelineError::MissingIdentity("owner id".to_string()));
        }
        if analysis_id.is_empty() {
            return Err(PipelineError::MissingIdentity("analysis id".to_string()));
        }
        check_path_segment("owner id", owner_id)?;
        check_path_segment("analysis id", analysis_id)?;

        Ok(Self {
            owner_id: owner_id.to_string(),
            analysis_id: analysis_id.to_string(),
        })
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    /// Folder holding this artifact: `{owner}_{analysis}`
    pub fn folder(&self) -> String {
        format!("{}_{}", self.owner_id, self.analysis_id)
    }

    /// Storage path of the artifact inside the bucket
    pub fn storage_path(&self, artifact_filename: &str) -> String {
        format!("{}/{}", self.folder(), artifact_filename)
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.folder())
    }
}
