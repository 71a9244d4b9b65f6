//! Snapshot cleaning applied before validation and save.

use formwright_types::{GroupNode, SchemaNode};
use formwright_util::{deep_clean, join_path, prune_rows_without, resolve_path};
use serde_json::{Map, Value};

use super::step::WizardStep;

/// Array patterns (`*` for nested row segments) whose rows carry a primary name field.
pub fn primary_row_patterns(steps: &[WizardStep], primary_field: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    for step in steps {
        collect_patterns(&step.schema, None, primary_field, &mut patterns);
    }
    patterns
}

fn collect_patterns(nodes: &[SchemaNode], base: Option<&str>, primary_field: &str, patterns: &mut Vec<String>) {
    for node in nodes {
        match node {
            SchemaNode::Control(_) | SchemaNode::ArrayOfStrings(_) => {}
            SchemaNode::Group(group) => {
                let group_base = group.path.as_deref().map(|path| resolve_path(base, path));
                collect_patterns(&group.children, group_base.as_deref().or(base), primary_field, patterns);
            }
            SchemaNode::Array(array) => {
                let pattern = resolve_path(base, &array.path);
                if item_has_primary(&array.item, primary_field) && !patterns.contains(&pattern) {
                    patterns.push(pattern.clone());
                }
                let row_pattern = join_path(Some(&pattern), "*");
                let item_base = match &array.item.path {
                    Some(path) => join_path(Some(&row_pattern), path),
                    None => row_pattern,
                };
                collect_patterns(&array.item.children, Some(&item_base), primary_field, patterns);
            }
        }
    }
}

/// True when a row of this template binds `primary_field` directly.
fn item_has_primary(item: &GroupNode, primary_field: &str) -> bool {
    if item.path.is_some() {
        return false;
    }
    item.children.iter().any(|child| match child {
        SchemaNode::Control(control) => control.id == primary_field,
        SchemaNode::Group(group) => item_has_primary(group, primary_field),
        SchemaNode::Array(_) | SchemaNode::ArrayOfStrings(_) => false,
    })
}

/// Deep-cleans the snapshot, drops nameless rows, then cleans again.
///
/// A fully empty snapshot cleans to an empty object.
pub fn clean_snapshot(snapshot: &Value, patterns: &[String], primary_field: &str) -> Value {
    let Some(mut cleaned) = deep_clean(snapshot) else {
        return Value::Object(Map::new());
    };
    let mut pruned = 0;
    for pattern in patterns {
        pruned += prune_rows_without(&mut cleaned, pattern, primary_field);
    }
    if pruned == 0 {
        return cleaned;
    }
    deep_clean(&cleaned).unwrap_or_else(|| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn steps() -> Vec<WizardStep> {
        let schema: Vec<SchemaNode> = serde_yaml::from_str(
            r#"
- kind: array
  path: spaces
  item:
    children:
      - kind: control
        id: name
      - kind: array
        path: views
        item:
          children:
            - kind: group
              children:
                - kind: control
                  id: name
- kind: group
  path: model
  children:
    - kind: array
      path: properties
      item:
        children:
          - kind: control
            id: type
"#,
        )
        .expect("schema");
        vec![WizardStep::new("resources", "Resources", schema)]
    }

    #[test]
    fn derives_patterns_from_templates_with_name_controls() {
        assert_eq!(primary_row_patterns(&steps(), "name"), vec!["spaces".to_string(), "spaces.*.views".to_string()]);
    }

    #[test]
    fn cleaning_drops_nameless_rows_and_their_empty_parents() {
        let patterns = primary_row_patterns(&steps(), "name");
        let snapshot = json!({
            "spaces": [
                {"name": "", "description": "draft"},
                {"name": "sales", "views": [{"name": " "}]}
            ],
            "model": {"properties": [{"type": "text"}]},
            "notes": ""
        });
        assert_eq!(
            clean_snapshot(&snapshot, &patterns, "name"),
            json!({"spaces": [{"name": "sales"}], "model": {"properties": [{"type": "text"}]}})
        );
        assert_eq!(clean_snapshot(&json!({"a": ""}), &patterns, "name"), json!({}));
    }
}
