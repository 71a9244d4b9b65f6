//! Multi-step wizard: steps, gating, persistence, modals and location sync.

mod cleanup;
mod gate;
mod location;
mod machine;
mod modal;
mod persistence;
mod progress;
mod state;
mod step;

pub use cleanup::{clean_snapshot, primary_row_patterns};
pub use gate::{GateDecision, decide};
pub use location::PageLocation;
pub use machine::{SaveOutcome, SavePlan, SaveRequest, Transition, Wizard, WizardBuilder};
pub use modal::{ModalChoice, ModalCoordinator, ModalKind, ModalView};
pub use persistence::{MemoryPersistence, PersistCall, PersistError, StepPersistence};
pub use progress::{ProgressView, StepBadge};
pub use state::{AfterSave, CommandFailure, FaultKind, PendingAction, RetryPlan, SaveToken, ValidationNotice, WizardFault, WizardState, WizardStatus};
pub use step::{RuleValidator, StepValidator, WizardStep};
