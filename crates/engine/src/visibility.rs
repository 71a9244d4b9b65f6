//! Conditional visibility evaluation.

use formwright_types::{RuleComparison, VisibilityRule};
use formwright_util::{get_path, resolve_path};
use serde_json::Value;

use crate::store::FormStore;

/// Anything that can answer "what value lives at this absolute path".
pub trait FieldSource {
    fn lookup(&self, path: &str) -> Option<&Value>;
}

impl FieldSource for FormStore {
    fn lookup(&self, path: &str) -> Option<&Value> {
        self.get(path)
    }
}

impl FieldSource for Value {
    fn lookup(&self, path: &str) -> Option<&Value> {
        get_path(self, path)
    }
}

/// True when every rule passes. An empty rule list is always visible.
pub fn is_visible<S>(rules: &[VisibilityRule], base: Option<&str>, source: &S) -> bool
where
    S: FieldSource + ?Sized,
{
    rules.iter().all(|rule| rule_passes(rule, base, source))
}

fn rule_passes<S>(rule: &VisibilityRule, base: Option<&str>, source: &S) -> bool
where
    S: FieldSource + ?Sized,
{
    let path = resolve_path(base, &rule.path);
    let value = source.lookup(&path);
    match rule.comparison() {
        RuleComparison::In(candidates) => candidates.iter().any(|candidate| Some(candidate) == value),
        // An absent value only equals an explicit `null`.
        RuleComparison::Equals(expected) => value.unwrap_or(&Value::Null) == expected,
        RuleComparison::Truthy => is_truthy(value),
    }
}

/// Truthiness: not absent, `null`, `false`, `0`, or an empty string/array/object.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

/// Absolute paths read by the rules.
pub fn rule_paths(rules: &[VisibilityRule], base: Option<&str>) -> impl Iterator<Item = String> {
    rules.iter().map(move |rule| resolve_path(base, &rule.path))
}

/// True when a write at `changed` can affect a reader of `watched`.
///
/// Equal paths, ancestors and descendants all count; the empty path touches everything.
pub fn path_touches(changed: &str, watched: &str) -> bool {
    if changed.is_empty() || changed == watched {
        return true;
    }
    is_descendant(watched, changed) || is_descendant(changed, watched)
}

fn is_descendant(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty() || path.strip_prefix(ancestor).is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_includes_falsy_values() {
        let data = json!({"flag": false, "count": 0, "text": ""});
        assert!(is_visible(&[VisibilityRule::equals("flag", false)], None, &data));
        assert!(is_visible(&[VisibilityRule::equals("count", 0)], None, &data));
        assert!(is_visible(&[VisibilityRule::equals("text", "")], None, &data));
        assert!(!is_visible(&[VisibilityRule::equals("count", "0")], None, &data));
    }

    #[test]
    fn truthiness_rejects_empty_values() {
        let data = json!({"a": [], "b": {}, "c": "x", "d": 0.0, "e": 2});
        assert!(!is_visible(&[VisibilityRule::truthy("a")], None, &data));
        assert!(!is_visible(&[VisibilityRule::truthy("b")], None, &data));
        assert!(is_visible(&[VisibilityRule::truthy("c")], None, &data));
        assert!(!is_visible(&[VisibilityRule::truthy("d")], None, &data));
        assert!(!is_visible(&[VisibilityRule::truthy("missing")], None, &data));
        assert!(is_visible(&[VisibilityRule::truthy("e")], None, &data));
    }

    #[test]
    fn rules_resolve_against_base_and_are_anded() {
        let data = json!({"type": "edge", "model": {"kind": "view", "enabled": true}});
        let rules = vec![VisibilityRule::one_of("kind", vec![json!("view"), json!("container")]), VisibilityRule::equals("$type", "edge")];
        assert!(is_visible(&rules, Some("model"), &data));
        let failing = vec![rules[0].clone(), VisibilityRule::truthy("../missing")];
        assert!(!is_visible(&failing, Some("model"), &data));
        assert!(is_visible(&[], Some("model"), &data));
    }

    #[test]
    fn touches_related_paths_only() {
        assert!(path_touches("type", "type"));
        assert!(path_touches("model", "model.space"));
        assert!(path_touches("spaces.0.name", "spaces"));
        assert!(path_touches("", "anything"));
        assert!(!path_touches("types", "type"));
        assert!(!path_touches("name", "model.name"));
    }
}
