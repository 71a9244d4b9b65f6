//! Dialogs derived from wizard state.
//!
//! The coordinator holds no state of its own: the open dialog, its content and its
//! buttons are a pure function of [`WizardState`]. When several dialogs could be
//! open, command failures win over validation notices, which win over the
//! unsaved-changes prompt.

use formwright_types::Severity;
use serde::{Deserialize, Serialize};

use super::state::WizardState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalKind {
    CommandFailed,
    ValidationWarning,
    UnsavedChanges,
}

/// Button offered by a dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalChoice {
    SaveAndContinue,
    Discard,
    Cancel,
    ContinueAnyway,
    GoBack,
    Retry,
    Close,
}

impl ModalChoice {
    pub fn label(self) -> &'static str {
        match self {
            ModalChoice::SaveAndContinue => "Save and continue",
            ModalChoice::Discard => "Discard changes",
            ModalChoice::Cancel => "Cancel",
            ModalChoice::ContinueAnyway => "Continue anyway",
            ModalChoice::GoBack => "Go back",
            ModalChoice::Retry => "Retry",
            ModalChoice::Close => "Close",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub kind: ModalKind,
    pub title: String,
    pub message: String,
    pub details: Vec<String>,
    pub severity: Severity,
    pub choices: Vec<ModalChoice>,
}

impl ModalView {
    pub fn offers(&self, choice: ModalChoice) -> bool {
        self.choices.contains(&choice)
    }
}

pub struct ModalCoordinator;

impl ModalCoordinator {
    pub fn current(state: &WizardState) -> Option<ModalView> {
        if let Some(failure) = &state.command_failure {
            return Some(ModalView {
                kind: ModalKind::CommandFailed,
                title: "Save failed".to_string(),
                message: failure.message.clone(),
                details: Vec::new(),
                severity: Severity::Error,
                choices: vec![ModalChoice::Retry, ModalChoice::Close],
            });
        }

        if state.validation_modal_open
            && let Some(notice) = &state.validation_notice
        {
            let title = if notice.error_styled { "Please fix the following errors" } else { "Please review the following warnings" };
            let choices = if notice.can_continue {
                vec![ModalChoice::ContinueAnyway, ModalChoice::GoBack]
            } else {
                vec![ModalChoice::GoBack]
            };
            return Some(ModalView {
                kind: ModalKind::ValidationWarning,
                title: title.to_string(),
                message: notice.message.clone(),
                details: notice.details.clone(),
                severity: if notice.error_styled { Severity::Error } else { Severity::Warning },
                choices,
            });
        }

        if state.unsaved_modal_open {
            return Some(ModalView {
                kind: ModalKind::UnsavedChanges,
                title: "Unsaved changes".to_string(),
                message: "This step has changes that have not been saved.".to_string(),
                details: Vec::new(),
                severity: Severity::Warning,
                choices: vec![ModalChoice::SaveAndContinue, ModalChoice::Discard, ModalChoice::Cancel],
            });
        }

        None
    }
}
