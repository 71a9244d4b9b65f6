//! Static checks of authored wizard schemas.
//!
//! The renderer tolerates every issue reported here (duplicate bindings share a
//! value, ambiguous rules use membership, unknown columns are skipped), so lint
//! findings are advisory and never stop a wizard from loading.

use std::collections::HashMap;
use std::fmt;

use formwright_types::{ArrayMode, SchemaNode, StepDefinition, VisibilityRule, WizardDefinition};
use formwright_util::{join_path, resolve_path};
use serde::Serialize;

use crate::render::{leaf_columns, table_columns};

/// One finding, located by step and resolved path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIssue {
    pub step_id: String,
    /// Resolved binding path; `*` stands for any row index.
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "[{}] {}", self.step_id, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.step_id, self.path, self.message)
        }
    }
}

pub fn lint_definition(definition: &WizardDefinition) -> Vec<SchemaIssue> {
    lint_steps(&definition.steps)
}

pub fn lint_steps(steps: &[StepDefinition]) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    let mut seen_ids: HashMap<&str, usize> = HashMap::new();
    for step in steps {
        let count = seen_ids.entry(step.id.as_str()).or_default();
        *count += 1;
        if *count == 2 {
            issues.push(issue(&step.id, "", "step id is declared more than once"));
        }

        let mut linter = StepLinter {
            step_id: &step.id,
            bindings: HashMap::new(),
            issues: &mut issues,
        };
        linter.check_rules(&step.visible_when, "");
        linter.walk(&step.schema, None);
        linter.report_duplicates();
    }
    issues
}

struct StepLinter<'a> {
    step_id: &'a str,
    /// Resolved path to the node kinds bound there, in authored order.
    bindings: HashMap<String, Vec<&'static str>>,
    issues: &'a mut Vec<SchemaIssue>,
}

impl StepLinter<'_> {
    fn walk(&mut self, nodes: &[SchemaNode], base: Option<&str>) {
        for node in nodes {
            let resolved = node.binding_segment().map(|segment| resolve_path(base, segment));
            self.check_rules(node.visible_when(), resolved.as_deref().unwrap_or(base.unwrap_or_default()));

            match node {
                SchemaNode::Control(control) => {
                    let path = resolved.unwrap_or_default();
                    if control.id.trim().is_empty() {
                        self.push(&path, "control has an empty id");
                    }
                    if control.input.is_select() && control.options.is_empty() && control.options_from.is_none() {
                        self.push(&path, "select control has neither options nor options_from");
                    }
                    self.bind(path, node.kind_name());
                }
                SchemaNode::Group(group) => {
                    if let Some(path) = &resolved {
                        self.bind(path.clone(), node.kind_name());
                    }
                    self.walk(&group.children, resolved.as_deref().or(base));
                }
                SchemaNode::Array(array) => {
                    let path = resolved.unwrap_or_default();
                    if array.path.trim().is_empty() {
                        self.push(&path, "array has an empty path");
                    }
                    if array.mode == ArrayMode::Table {
                        let leaves: Vec<String> = leaf_columns(&array.item).iter().map(|leaf| leaf.id()).collect();
                        for column in &array.columns {
                            let known = leaves.iter().any(|leaf| leaf == column || leaf.rsplit('.').next() == Some(column.as_str()));
                            if !known {
                                self.push(&path, &format!("table column '{column}' matches no leaf control"));
                            }
                        }
                        for leaf in table_columns(array) {
                            if !leaf.control.visible_when.is_empty() {
                                self.push(&path, &format!("table column '{}' has visibility rules, which tables ignore", leaf.id()));
                            }
                        }
                    }
                    self.bind(path.clone(), node.kind_name());

                    let row_base = join_path(Some(&path), "*");
                    let item_base = match &array.item.path {
                        Some(item_path) => resolve_path(Some(&row_base), item_path),
                        None => row_base,
                    };
                    self.check_rules(&array.item.visible_when, &item_base);
                    self.walk(&array.item.children, Some(&item_base));
                }
                SchemaNode::ArrayOfStrings(list) => {
                    let path = resolved.unwrap_or_default();
                    if list.path.trim().is_empty() {
                        self.push(&path, "string list has an empty path");
                    }
                    self.bind(path, node.kind_name());
                }
            }
        }
    }

    fn check_rules(&mut self, rules: &[VisibilityRule], path: &str) {
        for rule in rules {
            if rule.is_ambiguous() {
                self.push(path, &format!("visibility rule on '{}' declares both equals and in; in is used", rule.path));
            }
            if rule.path.trim().is_empty() {
                self.push(path, "visibility rule has an empty path");
            }
        }
    }

    fn bind(&mut self, path: String, kind: &'static str) {
        self.bindings.entry(path).or_default().push(kind);
    }

    fn report_duplicates(&mut self) {
        let mut duplicates: Vec<(&String, &Vec<&'static str>)> = self.bindings.iter().filter(|(_, kinds)| kinds.len() > 1).collect();
        duplicates.sort_by(|a, b| a.0.cmp(b.0));
        let messages: Vec<(String, String)> = duplicates
            .into_iter()
            .map(|(path, kinds)| (path.clone(), format!("path is bound by {} nodes ({})", kinds.len(), kinds.join(", "))))
            .collect();
        for (path, message) in messages {
            self.push(&path, &message);
        }
    }

    fn push(&mut self, path: &str, message: &str) {
        self.issues.push(issue(self.step_id, path, message));
    }
}

fn issue(step_id: &str, path: &str, message: &str) -> SchemaIssue {
    SchemaIssue {
        step_id: step_id.to_string(),
        path: path.to_string(),
        message: message.to_string(),
    }
}
