//! Script types flowing through the generation stages
//!
//! `StagePrompt` → (text generation) → `DraftScript` → (style) → `FormattedScript`

use serde::{Deserialize, Serialize};

/// Separator appended after every generated stage
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Fixed, ordered narration stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptStage {
    Overview,
    Strengths,
    FocusAreas,
    Closing,
}

impl PromptStage {
    /// All stages in narration order
    pub const ALL: [PromptStage; 4] = [
        PromptStage::Overview,
        PromptStage::Strengths,
        PromptStage::FocusAreas,
        PromptStage::Closing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PromptStage::Overview => "overview",
            PromptStage::Strengths => "strengths",
            PromptStage::FocusAreas => "focus-areas",
            PromptStage::Closing => "closing",
        }
    }
}

impl std::fmt::Display for PromptStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One fully substituted prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePrompt {
    pub stage: PromptStage,
    pub prompt: String,
}

/// Concatenated generated text, in stage order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftScript {
    text: String,
    stages: Vec<PromptStage>,
}

impl DraftScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one stage's text followed by the paragraph separator
    pub fn push_stage(&mut self, stage: PromptStage, text: &str) {
        self.text.push_str(text.trim());
        self.text.push_str(PARAGRAPH_SEPARATOR);
        self.stages.push(stage);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Stages contributing to this draft, in order
    pub fn stages(&self) -> &[PromptStage] {
        &self.stages
    }
}

/// Narration-ready script; the exact payload sent to the synthesis worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormattedScript(String);

impl FormattedScript {
    pub fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
