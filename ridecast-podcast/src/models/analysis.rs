//! Analysis records read from the analysis data source
//!
//! A record is produced by the analysis subsystem once a scored test sheet
//! has been processed. The pipeline only reads it.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::ArtifactKey;

/// Processing status of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Equestrian discipline the analysis was scored under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Dressage,
    #[serde(alias = "jumping", alias = "showjumping")]
    ShowJumping,
    Eventing,
    #[default]
    #[serde(other)]
    Other,
}

/// One scored movement (dressage) or obstacle (jumping)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementScore {
    pub movement: String,
    pub score: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A completed analysis, as stored by the analysis subsystem
///
/// Every field except the identity pair is optional in practice; missing
/// values deserialize to empty defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisRecord {
    #[serde(alias = "userId", alias = "uid")]
    pub owner_id: String,
    #[serde(alias = "id")]
    pub analysis_id: String,
    pub status: AnalysisStatus,
    pub discipline: Discipline,
    /// Name of the uploaded test sheet, used for the download filename
    #[serde(alias = "fileName")]
    pub document_name: Option<String>,
    pub rider_name: Option<String>,
    pub horse_name: Option<String>,
    /// Test or class name (e.g. "Training Level Test 2")
    pub test_name: Option<String>,
    /// Total points (dressage) or total faults (jumping)
    pub total_score: Option<f64>,
    /// Final percentage (dressage)
    pub percentage: Option<f64>,
    pub movement_scores: Vec<MovementScore>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub judge_comments: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AnalysisRecord {
    /// Deterministic artifact key for this record
    ///
    /// Fails with `MissingIdentity` when either identity field is blank or
    /// cannot form a single path segment.
    pub fn artifact_key(&self) -> Result<ArtifactKey, PipelineError> {
        ArtifactKey::new(&self.owner_id, &self.analysis_id)
    }

    /// Generation may only start from a completed analysis
    pub fn ensure_completed(&self) -> Result<(), PipelineError> {
        if self.status == AnalysisStatus::Completed {
            Ok(())
        } else {
            Err(PipelineError::AnalysisNotReady {
                analysis_id: self.analysis_id.clone(),
                status: self.status.to_string(),
            })
        }
    }
}
