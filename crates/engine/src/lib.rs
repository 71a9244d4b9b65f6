//! # Formwright Engine
//!
//! The engine interprets declarative schema trees into bound, reactive form fields
//! and drives multi-step wizards over them.
//!
//! ## Key Features
//!
//! - **Schema interpretation**: controls, groups, card and table arrays, string lists
//! - **Reactive visibility**: nodes re-render only when a path they read changes
//! - **One-time prefill and suggestions** copied from elsewhere in the data
//! - **Wizard state machine**: validation gating, persistence, retry and modals
//! - **Location sync**: the current step mirrors a URL query parameter
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use formwright_engine::{MemoryPersistence, Wizard, parse_wizard_file, steps_from_definition};
//!
//! let temp_dir = tempfile::tempdir()?;
//! let wizard_path = temp_dir.path().join("wizard.yaml");
//! std::fs::write(&wizard_path, r#"
//! wizard: demo
//! steps:
//!   - id: basics
//!     title: Basics
//!     schema:
//!       - kind: control
//!         id: name
//! "#)?;
//!
//! let definition = parse_wizard_file(&wizard_path)?;
//! let mut wizard = Wizard::builder(Arc::new(MemoryPersistence::new()))
//!     .steps(steps_from_definition(&definition))
//!     .build()?;
//! wizard.set_field("name", serde_json::json!("acme"))?;
//! assert!(wizard.is_dirty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`store`**: the form store holding live data, baseline and change stream
//! - **`visibility`**: rule evaluation against the store
//! - **`render`**: the schema interpreter producing the view model
//! - **`coalesce`**: frame-rate forwarding of store changes to observers
//! - **`lint`**: static schema checks
//! - **`wizard`**: steps, gating, persistence, modals and the state machine

use std::{fs, path::Path};

use anyhow::{Context, Result};
use formwright_types::WizardDefinition;

pub mod coalesce;
pub mod error;
pub mod lint;
pub mod picker;
pub mod render;
pub mod store;
pub mod visibility;
pub mod wizard;

pub use coalesce::{ChangeDigest, coalesce_changes};
pub use error::WizardError;
pub use lint::{SchemaIssue, lint_definition, lint_steps};
pub use picker::DirectoryPicker;
pub use render::{BoundField, FieldRenderer, RenderedNode, RowKey};
pub use store::{ChangeOrigin, FieldChange, FormStore, StoreError};
pub use visibility::{FieldSource, is_truthy, is_visible};
pub use wizard::{
    AfterSave, MemoryPersistence, ModalChoice, ModalCoordinator, ModalKind, ModalView, PageLocation, PendingAction, PersistError,
    ProgressView, SaveOutcome, SavePlan, SaveRequest, SaveToken, StepPersistence, StepValidator, Transition, Wizard, WizardBuilder,
    WizardState, WizardStatus, WizardStep,
};

/// Loads a wizard definition from YAML or JSON.
///
/// JSON is a subset of YAML, so both formats go through the YAML parser.
///
/// # Errors
///
/// Returns an error when the file cannot be read or does not describe a wizard.
pub fn parse_wizard_file(file_path: impl AsRef<Path>) -> Result<WizardDefinition> {
    let file_path = file_path.as_ref();
    let content = fs::read_to_string(file_path).with_context(|| format!("Failed to read wizard file: {}", file_path.display()))?;
    let definition: WizardDefinition =
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse wizard file: {}", file_path.display()))?;
    if definition.steps.is_empty() {
        anyhow::bail!("Wizard file {} declares no steps", file_path.display());
    }
    Ok(definition)
}

/// Builds runnable steps, turning declared rules into validators.
pub fn steps_from_definition(definition: &WizardDefinition) -> Vec<WizardStep> {
    definition.steps.iter().map(WizardStep::from_definition).collect()
}
