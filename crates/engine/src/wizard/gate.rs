use formwright_types::ValidationResult;
use serde::Serialize;

/// What a save-triggering transition does with a validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Proceed,
    /// Ask the user; "continue anyway" is offered.
    Confirm { error_styled: bool },
    /// Send the user back; no override is offered.
    Block { error_styled: bool },
}

/// Gating policy: skipped validation and valid results proceed, hard-blocking
/// issues block, every other issue asks for confirmation.
pub fn decide(result: &ValidationResult, skip_validation: bool) -> GateDecision {
    if skip_validation {
        return GateDecision::Proceed;
    }
    match result {
        ValidationResult::Valid => GateDecision::Proceed,
        ValidationResult::Warning(issue) if issue.hard_block => GateDecision::Block { error_styled: false },
        ValidationResult::Error(issue) if issue.hard_block => GateDecision::Block { error_styled: true },
        ValidationResult::Warning(_) => GateDecision::Confirm { error_styled: false },
        ValidationResult::Error(_) => GateDecision::Confirm { error_styled: true },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table_is_exhaustive() {
        let cases = [
            (ValidationResult::Valid, true, GateDecision::Proceed),
            (ValidationResult::error("e").blocking(), true, GateDecision::Proceed),
            (ValidationResult::Valid, false, GateDecision::Proceed),
            (ValidationResult::warning("w"), false, GateDecision::Confirm { error_styled: false }),
            (ValidationResult::error("e"), false, GateDecision::Confirm { error_styled: true }),
            (ValidationResult::warning("w").blocking(), false, GateDecision::Block { error_styled: false }),
            (ValidationResult::error("e").blocking(), false, GateDecision::Block { error_styled: true }),
        ];
        for (result, skip, expected) in cases {
            assert_eq!(decide(&result, skip), expected, "result {result:?}, skip {skip}");
        }
    }
}
