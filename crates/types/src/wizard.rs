//! Serializable wizard documents.
//!
//! Wizards are authored as YAML (or JSON) and keep step order exactly as written.

use serde::{Deserialize, Serialize};

use crate::schema::{SchemaNode, VisibilityRule, one_or_many_rules};
use crate::validation::StepRule;

/// A complete wizard: metadata plus ordered steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WizardDefinition {
    /// Canonical identifier (for example, `module_setup`).
    #[serde(default)]
    pub wizard: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Label shown by the progress indicator (for example, `Module`).
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

/// One wizard step as authored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StepDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub help: Option<String>,
    /// Hides the whole step when the rules fail against the wizard data.
    #[serde(default, alias = "visibleWhen", deserialize_with = "one_or_many_rules")]
    pub visible_when: Vec<VisibilityRule>,
    #[serde(default)]
    pub schema: Vec<SchemaNode>,
    /// Declarative validation rules, evaluated in order.
    #[serde(default)]
    pub rules: Vec<StepRule>,
}
