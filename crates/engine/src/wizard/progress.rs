use formwright_types::Severity;
use serde::Serialize;

/// Progress indicator content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    /// 1-based position of the current step among visible steps.
    pub position: usize,
    pub total: usize,
    pub steps: Vec<StepBadge>,
}

/// One visible step in the progress indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepBadge {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub current: bool,
    pub completed: bool,
    /// Severity of the last validation issue, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<Severity>,
}
