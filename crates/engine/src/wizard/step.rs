use std::fmt;
use std::sync::Arc;

use formwright_types::{SchemaNode, Severity, StepDefinition, StepRule, ValidationIssue, ValidationResult, VisibilityRule, validate_rule_candidate};
use formwright_util::get_path;
use serde_json::Value;

/// Validates a step's cleaned data.
pub trait StepValidator: Send + Sync {
    fn validate(&self, data: &Value) -> ValidationResult;
}

impl<F> StepValidator for F
where
    F: Fn(&Value) -> ValidationResult + Send + Sync,
{
    fn validate(&self, data: &Value) -> ValidationResult {
        self(data)
    }
}

/// One wizard step ready to be mounted.
#[derive(Clone)]
pub struct WizardStep {
    pub id: String,
    pub title: String,
    pub help: Option<String>,
    pub schema: Arc<[SchemaNode]>,
    /// Rules evaluated with absolute paths against the whole data snapshot.
    pub visible_when: Vec<VisibilityRule>,
    pub validator: Option<Arc<dyn StepValidator>>,
}

impl WizardStep {
    pub fn new(id: impl Into<String>, title: impl Into<String>, schema: Vec<SchemaNode>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            help: None,
            schema: schema.into(),
            visible_when: Vec::new(),
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: impl StepValidator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn with_visibility(mut self, rules: Vec<VisibilityRule>) -> Self {
        self.visible_when = rules;
        self
    }

    /// Builds a step from its authored definition; declared rules become its validator.
    pub fn from_definition(definition: &StepDefinition) -> Self {
        let validator: Option<Arc<dyn StepValidator>> = if definition.rules.is_empty() {
            None
        } else {
            Some(Arc::new(RuleValidator::new(definition.rules.clone())))
        };
        Self {
            id: definition.id.clone(),
            title: definition.title.clone(),
            help: definition.help.clone(),
            schema: definition.schema.clone().into(),
            visible_when: definition.visible_when.clone(),
            validator,
        }
    }

    pub fn validate(&self, data: &Value) -> ValidationResult {
        self.validator.as_ref().map_or(ValidationResult::Valid, |validator| validator.validate(data))
    }
}

impl fmt::Debug for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardStep")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("nodes", &self.schema.len())
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

/// Evaluates declarative [`StepRule`]s in order.
///
/// The first failing error-severity rule determines the outcome; without one, the
/// first failing warning does. Every failure message is reported in `details`.
#[derive(Debug, Clone, Default)]
pub struct RuleValidator {
    rules: Vec<StepRule>,
}

impl RuleValidator {
    pub fn new(rules: Vec<StepRule>) -> Self {
        Self { rules }
    }
}

impl StepValidator for RuleValidator {
    fn validate(&self, data: &Value) -> ValidationResult {
        let failures: Vec<(&StepRule, String)> = self
            .rules
            .iter()
            .filter_map(|rule| {
                validate_rule_candidate(get_path(data, &rule.path), rule)
                    .err()
                    .map(|message| (rule, rule.message.clone().unwrap_or(message)))
            })
            .collect();

        let primary = failures
            .iter()
            .find(|(rule, _)| rule.severity == Severity::Error)
            .or_else(|| failures.first());
        let Some((rule, message)) = primary else {
            return ValidationResult::Valid;
        };

        let issue = ValidationIssue {
            message: message.clone(),
            details: failures.iter().map(|(_, message)| message.clone()).collect(),
            hard_block: rule.hard_block,
        };
        ValidationResult::issue(rule.severity, issue)
    }
}
