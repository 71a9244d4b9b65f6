//! Strongly typed definitions shared by the Formwright engine and CLI.
//!
//! The models here describe *what* a wizard looks like: the declarative schema tree
//! that is interpreted into bound fields, the validation outcomes a step can
//! produce, and the serializable wizard/step documents authored in YAML.

pub mod schema;
pub mod validation;
pub mod wizard;

pub use schema::{
    ActionLink, ArrayMode, ArrayNode, ControlKind, ControlNode, GroupNode, PrefillRule, RuleComparison, SchemaNode, SelectOption,
    StringListNode, SuggestionSource, VisibilityRule,
};
pub use validation::{Severity, StepRule, ValidationIssue, ValidationResult, validate_rule_candidate};
pub use wizard::{StepDefinition, WizardDefinition};
