use thiserror::Error;

use crate::store::StoreError;

/// Misuse of the wizard API.
///
/// Validation outcomes and persistence failures are never reported through this type;
/// they are captured in [`crate::wizard::WizardState`] instead.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error("step index {index} is out of range ({count} steps)")]
    StepOutOfRange { index: usize, count: usize },
    #[error("step '{0}' is hidden by its visibility rules")]
    StepHidden(String),
    #[error("no rendered field is bound to '{0}'")]
    UnknownBinding(String),
    #[error("field '{0}' is read-only")]
    ReadOnly(String),
    #[error("field '{0}' is not a directory control")]
    NotDirectoryControl(String),
    #[error("no directory picker is configured")]
    PickerUnavailable,
    #[error("directory picker failed: {0}")]
    PickerFailed(String),
    #[error("index {index} is out of range for '{path}' ({len} entries)")]
    IndexOutOfRange { path: String, index: usize, len: usize },
    #[error("no modal is open")]
    NoModalOpen,
    #[error("'{0}' is not offered by the open modal")]
    ChoiceUnavailable(String),
    #[error("the validation issue is hard-blocking and cannot be overridden")]
    HardBlocked,
    #[error("a save is already in flight")]
    SaveInFlight,
    #[error("there is no failed save to retry")]
    NoRetryPending,
    #[error(transparent)]
    Store(#[from] StoreError),
}
