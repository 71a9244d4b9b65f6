//! Step validation outcomes and declarative step rules.
//!
//! A step validator produces a tri-state [`ValidationResult`]: valid, a warning, or an
//! error. Neither warnings nor errors stop a transition on their own; the wizard asks
//! the user to confirm instead. Only an issue flagged `hard_block` forbids the
//! "continue anyway" path.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity tier of a validation issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    #[default]
    Error,
}

/// Payload carried by warning and error results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ValidationIssue {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// Forbids overriding the issue with "continue anyway".
    #[serde(default)]
    pub hard_block: bool,
}

/// Outcome of validating a step's cleaned data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    #[default]
    Valid,
    Warning(ValidationIssue),
    Error(ValidationIssue),
}

impl ValidationResult {
    pub fn warning(message: impl Into<String>) -> Self {
        ValidationResult::Warning(ValidationIssue {
            message: message.into(),
            ..ValidationIssue::default()
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ValidationResult::Error(ValidationIssue {
            message: message.into(),
            ..ValidationIssue::default()
        })
    }

    /// Builds a warning or error for the given severity.
    pub fn issue(severity: Severity, issue: ValidationIssue) -> Self {
        match severity {
            Severity::Warning => ValidationResult::Warning(issue),
            Severity::Error => ValidationResult::Error(issue),
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        if let Some(issue) = self.issue_mut() {
            issue.details = details;
        }
        self
    }

    /// Marks the issue as hard-blocking. No effect on `Valid`.
    pub fn blocking(mut self) -> Self {
        if let Some(issue) = self.issue_mut() {
            issue.hard_block = true;
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    pub fn severity(&self) -> Option<Severity> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Warning(_) => Some(Severity::Warning),
            ValidationResult::Error(_) => Some(Severity::Error),
        }
    }

    pub fn details(&self) -> Option<&ValidationIssue> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Warning(issue) | ValidationResult::Error(issue) => Some(issue),
        }
    }

    pub fn is_hard_block(&self) -> bool {
        self.details().is_some_and(|issue| issue.hard_block)
    }

    fn issue_mut(&mut self) -> Option<&mut ValidationIssue> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Warning(issue) | ValidationResult::Error(issue) => Some(issue),
        }
    }
}

/// Declarative rule evaluated against a step's cleaned data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StepRule {
    /// Absolute dotted path of the checked value.
    pub path: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub pattern: Option<String>,
    /// Minimum characters for text, minimum items for lists.
    #[serde(default)]
    pub min_length: Option<usize>,
    /// Maximum characters for text, maximum items for lists.
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub allowed: Vec<Value>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub hard_block: bool,
    /// Message shown instead of the generated one.
    #[serde(default)]
    pub message: Option<String>,
}

/// Checks a candidate value (absent when `None`) against a declarative rule.
///
/// Blank values only fail `required`; every other constraint applies to present values:
/// - `allowed` must include the candidate.
/// - Length limits count characters for text and items for lists.
/// - Patterns only apply to text; other scalars fail when a pattern is set.
pub fn validate_rule_candidate(candidate: Option<&Value>, rule: &StepRule) -> Result<(), String> {
    let Some(candidate) = candidate.filter(|value| !is_blank(value)) else {
        if rule.required {
            return Err(format!("{} is required", rule.path));
        }
        return Ok(());
    };

    if !rule.allowed.is_empty() && !rule.allowed.iter().any(|allowed| json_values_match(allowed, candidate)) {
        return Err(format!("{} is not one of the allowed values", rule.path));
    }

    match candidate {
        Value::String(text) => {
            check_length(&rule.path, text.chars().count(), rule, "characters")?;
            if let Some(pattern) = &rule.pattern {
                let regex = Regex::new(pattern).map_err(|error| format!("invalid pattern '{}': {}", pattern, error))?;
                if !regex.is_match(text) {
                    return Err(format!("{} must match the pattern {}", rule.path, pattern));
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            check_length(&rule.path, items.len(), rule, "items")?;
            if rule.pattern.is_some() {
                return Err(format!("{} must be text to satisfy its pattern", rule.path));
            }
            Ok(())
        }
        _ => {
            if rule.pattern.is_some() || rule.min_length.is_some() || rule.max_length.is_some() {
                return Err(format!("{} must be text to satisfy validation rules", rule.path));
            }
            Ok(())
        }
    }
}

fn check_length(path: &str, length: usize, rule: &StepRule, unit: &str) -> Result<(), String> {
    if let Some(min_length) = rule.min_length
        && length < min_length
    {
        return Err(format!("{} must have at least {} {}", path, min_length, unit));
    }
    if let Some(max_length) = rule.max_length
        && length > max_length
    {
        return Err(format!("{} must have at most {} {}", path, max_length, unit));
    }
    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn json_values_match(expected: &Value, candidate: &Value) -> bool {
    if expected == candidate {
        return true;
    }
    match (expected, candidate) {
        (Value::String(expected_text), other) if !other.is_string() => expected_text == &other.to_string(),
        (other, Value::String(candidate_text)) if !other.is_string() => serde_json::from_str::<Value>(candidate_text)
            .map(|parsed| &parsed == other)
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(path: &str) -> StepRule {
        StepRule {
            path: path.to_string(),
            ..StepRule::default()
        }
    }

    #[test]
    fn required_rule_rejects_blank_values_only() {
        let mut required = rule("name");
        required.required = true;

        assert!(validate_rule_candidate(None, &required).is_err());
        assert!(validate_rule_candidate(Some(&json!("  ")), &required).is_err());
        assert!(validate_rule_candidate(Some(&json!("acme")), &required).is_ok());
        assert!(validate_rule_candidate(None, &rule("name")).is_ok());
    }

    #[test]
    fn pattern_and_length_apply_to_text() {
        let mut constrained = rule("name");
        constrained.pattern = Some("^[a-z]+$".to_string());
        constrained.max_length = Some(5);

        assert!(validate_rule_candidate(Some(&json!("acme")), &constrained).is_ok());
        assert!(validate_rule_candidate(Some(&json!("Acme")), &constrained).is_err());
        assert!(validate_rule_candidate(Some(&json!("abcdef")), &constrained).is_err());
        assert!(validate_rule_candidate(Some(&json!(12)), &constrained).is_err());
    }

    #[test]
    fn length_limits_count_list_items() {
        let mut bounded = rule("tags");
        bounded.min_length = Some(2);

        assert!(validate_rule_candidate(Some(&json!(["a"])), &bounded).is_err());
        assert!(validate_rule_candidate(Some(&json!(["a", "b"])), &bounded).is_ok());
    }

    #[test]
    fn allowed_values_compare_across_textual_forms() {
        let mut allowed = rule("version");
        allowed.allowed = vec![json!(1), json!("v2")];

        assert!(validate_rule_candidate(Some(&json!(1)), &allowed).is_ok());
        assert!(validate_rule_candidate(Some(&json!("1")), &allowed).is_ok());
        assert!(validate_rule_candidate(Some(&json!("v2")), &allowed).is_ok());
        assert!(validate_rule_candidate(Some(&json!("v3")), &allowed).is_err());
    }

    #[test]
    fn results_serialize_with_status_tag() {
        let result = ValidationResult::warning("check spaces").with_details(vec!["space a".into()]);
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(value, json!({"status": "warning", "message": "check spaces", "details": ["space a"], "hard_block": false}));
        assert_eq!(
            serde_json::from_value::<ValidationResult>(json!({"status": "valid"})).expect("deserialize"),
            ValidationResult::Valid
        );
    }

    #[test]
    fn blocking_marks_only_issues() {
        assert!(ValidationResult::error("nope").blocking().is_hard_block());
        assert!(!ValidationResult::Valid.blocking().is_hard_block());
    }
}
