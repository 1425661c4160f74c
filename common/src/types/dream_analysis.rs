use serde::{Deserialize, Serialize};

/// Structured interpretation of a dream, as returned by the analysis model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DreamAnalysis {
    pub title: String,
    pub summary: String,
    pub interpretation: String,
    pub symbolism: Vec<String>,
    /// Prompt tuned for the image and video models.
    pub visual_prompt: String,
}
