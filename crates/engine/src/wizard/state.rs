//! Wizard state record and the typed records it carries.

use chrono::{DateTime, Utc};
use formwright_types::{Severity, ValidationResult};
use indexmap::IndexMap;
use serde::Serialize;

use super::persistence::PersistError;

/// Action deferred behind a modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "action", content = "step", rename_all = "snake_case")]
pub enum PendingAction {
    #[default]
    None,
    Navigate(usize),
    Finish,
    ManualSave,
}

/// What happens after a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "then", content = "step", rename_all = "snake_case")]
pub enum AfterSave {
    Stay,
    Navigate(usize),
    Finish,
}

impl AfterSave {
    pub(crate) fn from_pending(pending: PendingAction) -> Option<Self> {
        match pending {
            PendingAction::None => None,
            PendingAction::Navigate(index) => Some(AfterSave::Navigate(index)),
            PendingAction::Finish => Some(AfterSave::Finish),
            PendingAction::ManualSave => Some(AfterSave::Stay),
        }
    }

    pub(crate) fn as_pending(self) -> PendingAction {
        match self {
            AfterSave::Stay => PendingAction::ManualSave,
            AfterSave::Navigate(index) => PendingAction::Navigate(index),
            AfterSave::Finish => PendingAction::Finish,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    Validation,
    Network,
    System,
}

/// Typed, recoverable failure recorded in state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardFault {
    pub kind: FaultKind,
    pub message: String,
    pub recoverable: bool,
    pub occurred_at: DateTime<Utc>,
}

impl WizardFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recoverable: true,
            occurred_at: Utc::now(),
        }
    }
}

impl From<&PersistError> for WizardFault {
    fn from(error: &PersistError) -> Self {
        let kind = match error {
            PersistError::Rejected(_) => FaultKind::Network,
            PersistError::Unexpected(_) => FaultKind::System,
        };
        WizardFault::new(kind, error.to_string())
    }
}

/// Content of the validation modal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationNotice {
    pub step_id: String,
    pub severity: Severity,
    pub message: String,
    pub details: Vec<String>,
    /// Error-styled messaging; warnings are styled as warnings.
    pub error_styled: bool,
    /// False for hard-blocking issues.
    pub can_continue: bool,
}

/// Save to replay when the user asks to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryPlan {
    pub step_index: usize,
    pub after: AfterSave,
}

/// Content of the command-failed modal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandFailure {
    pub step_id: String,
    pub message: String,
    pub retry: RetryPlan,
}

/// Coarse machine status derived from the state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStatus {
    Idle,
    Saving,
    BlockedOnUnsavedChanges,
    BlockedOnValidationWarning,
    Errored,
}

/// Single mutable record owned by the wizard.
///
/// The live data itself stays in the wizard's form store; this record holds
/// everything derived from transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct WizardState {
    pub saving: bool,
    pub finished: bool,
    pub last_error: Option<WizardFault>,
    pub completed: IndexMap<String, bool>,
    pub validation: IndexMap<String, ValidationResult>,
    pub dirty: bool,
    pub pending: PendingAction,
    pub unsaved_modal_open: bool,
    pub validation_modal_open: bool,
    pub validation_notice: Option<ValidationNotice>,
    pub command_failure: Option<CommandFailure>,
}

impl WizardState {
    pub fn new<'a>(step_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut state = WizardState::default();
        for step_id in step_ids {
            state.completed.insert(step_id.to_string(), false);
            state.validation.insert(step_id.to_string(), ValidationResult::Valid);
        }
        state
    }

    pub fn status(&self) -> WizardStatus {
        if self.saving {
            WizardStatus::Saving
        } else if self.command_failure.is_some() {
            WizardStatus::Errored
        } else if self.validation_modal_open {
            WizardStatus::BlockedOnValidationWarning
        } else if self.unsaved_modal_open {
            WizardStatus::BlockedOnUnsavedChanges
        } else {
            WizardStatus::Idle
        }
    }

    pub fn is_completed(&self, step_id: &str) -> bool {
        self.completed.get(step_id).copied().unwrap_or(false)
    }

    /// Closes both confirmation modals and forgets the deferred action.
    pub(crate) fn clear_pending(&mut self) {
        self.unsaved_modal_open = false;
        self.validation_modal_open = false;
        self.pending = PendingAction::None;
    }
}

/// Identifies one issued save. Only the latest token's completion is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SaveToken(pub u64);
