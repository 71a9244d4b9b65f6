//! Declarative schema tree interpreted by the field renderer.
//!
//! A wizard step owns a list of [`SchemaNode`]s. Each node is one of four kinds,
//! discriminated by the `kind` tag in authored documents:
//!
//! - `control`: a leaf input bound to `<base>.<id>`
//! - `group`: a container that optionally remaps its children's base path
//! - `array`: a repeating group rendered as cards or as a table
//! - `array_of_strings`: a repeating scalar list
//!
//! Paths are dotted (`module.spaces.0.name`). A leading `$` marks an absolute path,
//! leading `../` and `./` tokens walk the base path; see `formwright_util::resolve_path`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One element of the declarative field tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    /// Leaf input bound to a single value.
    Control(ControlNode),
    /// Non-repeating container.
    Group(GroupNode),
    /// Repeating group applied once per row.
    Array(ArrayNode),
    /// Repeating scalar list.
    #[serde(alias = "arrayOfStrings")]
    ArrayOfStrings(StringListNode),
}

impl SchemaNode {
    /// Visibility rules attached to the node (ANDed).
    pub fn visible_when(&self) -> &[VisibilityRule] {
        match self {
            SchemaNode::Control(control) => &control.visible_when,
            SchemaNode::Group(group) => &group.visible_when,
            SchemaNode::Array(array) => &array.visible_when,
            SchemaNode::ArrayOfStrings(list) => &list.visible_when,
        }
    }

    /// Relative path segment this node binds to, if it binds data at all.
    ///
    /// Groups without their own `path` are transparent and return `None`.
    pub fn binding_segment(&self) -> Option<&str> {
        match self {
            SchemaNode::Control(control) => Some(control.id.as_str()),
            SchemaNode::Group(group) => group.path.as_deref(),
            SchemaNode::Array(array) => Some(array.path.as_str()),
            SchemaNode::ArrayOfStrings(list) => Some(list.path.as_str()),
        }
    }

    /// Short label used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Control(_) => "control",
            SchemaNode::Group(_) => "group",
            SchemaNode::Array(_) => "array",
            SchemaNode::ArrayOfStrings(_) => "array_of_strings",
        }
    }
}

/// Input widget flavor for a control node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[default]
    Text,
    Textarea,
    Number,
    Checkbox,
    Select,
    Multiselect,
    Directory,
}

impl ControlKind {
    /// Returns true for kinds that present an option list.
    pub fn is_select(self) -> bool {
        matches!(self, ControlKind::Select | ControlKind::Multiselect)
    }

    /// Converts raw textual input into the JSON value stored for this kind.
    ///
    /// Numbers that fail to parse are kept as text so the user's input is never lost;
    /// step validation is responsible for rejecting them.
    pub fn coerce_input(self, raw: &str) -> Value {
        match self {
            ControlKind::Number => {
                let trimmed = raw.trim();
                if let Ok(integer) = trimmed.parse::<i64>() {
                    return Value::from(integer);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(raw.to_string()))
            }
            ControlKind::Checkbox => {
                let normalized = raw.trim().to_ascii_lowercase();
                Value::Bool(matches!(normalized.as_str(), "true" | "on" | "yes" | "1"))
            }
            ControlKind::Multiselect => Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            ),
            ControlKind::Text | ControlKind::Textarea | ControlKind::Select | ControlKind::Directory => Value::String(raw.to_string()),
        }
    }
}

/// Leaf input descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ControlNode {
    /// Stable identifier; also the relative path segment the control binds to.
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default, alias = "maxLength")]
    pub max_length: Option<usize>,
    /// Widget flavor (`text` when omitted).
    #[serde(default, alias = "control")]
    pub input: ControlKind,
    #[serde(default, alias = "visibleWhen", deserialize_with = "one_or_many_rules")]
    pub visible_when: Vec<VisibilityRule>,
    /// Static options for select kinds.
    #[serde(default)]
    pub options: Vec<SelectOption>,
    /// Path whose value supplies options dynamically.
    #[serde(default, alias = "optionsFrom")]
    pub options_from: Option<String>,
    /// Path copied into this control once per mount while the control is empty.
    #[serde(default, alias = "prefillFrom")]
    pub prefill_from: Option<String>,
    /// One-click "apply value" affordances; never applied automatically.
    #[serde(default)]
    pub suggestions: Vec<SuggestionSource>,
    #[serde(default, alias = "readOnly")]
    pub read_only: bool,
    /// Placeholder displayed instead of the value for read-only secrets.
    #[serde(default, alias = "maskedValue")]
    pub masked_value: Option<String>,
}

impl ControlNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Display label, falling back to the identifier.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Option presented by select and multiselect controls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "RawSelectOption")]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelectOption {
    Plain(String),
    Detailed { value: String, label: Option<String> },
}

impl From<RawSelectOption> for SelectOption {
    fn from(raw: RawSelectOption) -> Self {
        match raw {
            RawSelectOption::Plain(value) => SelectOption::new(value.clone(), value),
            RawSelectOption::Detailed { value, label } => {
                let label = label.unwrap_or_else(|| value.clone());
                SelectOption { value, label }
            }
        }
    }
}

/// Source of a suggested value for a control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionSource {
    #[serde(alias = "fromPath", alias = "path")]
    pub from_path: String,
    pub label: String,
}

/// Non-repeating container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GroupNode {
    /// Optional segment appended to the inherited base path for all children.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "visibleWhen", deserialize_with = "one_or_many_rules")]
    pub visible_when: Vec<VisibilityRule>,
    #[serde(default)]
    pub children: Vec<SchemaNode>,
}

/// Presentation of an array node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArrayMode {
    #[default]
    Cards,
    Table,
}

/// Repeating group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ArrayNode {
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Template applied to every row with the row as its base path.
    #[serde(default)]
    pub item: GroupNode,
    #[serde(default)]
    pub mode: ArrayMode,
    /// Table columns (leaf control ids of the item template); inferred when empty.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Rows revealed per "load more" increment in table mode.
    #[serde(default, alias = "pageSize")]
    pub page_size: Option<usize>,
    /// Per-row links whose hrefs carry `{{name}}` placeholders.
    #[serde(default)]
    pub actions: Vec<ActionLink>,
    /// Values copied into a freshly appended row.
    #[serde(default, alias = "newItemPrefill")]
    pub new_item_prefill: Vec<PrefillRule>,
    #[serde(default)]
    pub collapsible: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default, alias = "itemLabel")]
    pub item_label: Option<String>,
    #[serde(default, alias = "visibleWhen", deserialize_with = "one_or_many_rules")]
    pub visible_when: Vec<VisibilityRule>,
}

/// Row-level link rendered in table mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionLink {
    pub label: String,
    pub href: String,
}

/// Copies the value at `from_path` into field `id` of a new array row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrefillRule {
    pub id: String,
    #[serde(alias = "fromPath")]
    pub from_path: String,
}

/// Repeating scalar list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StringListNode {
    pub path: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default, alias = "visibleWhen", deserialize_with = "one_or_many_rules")]
    pub visible_when: Vec<VisibilityRule>,
}

/// Conditional visibility rule.
///
/// Without `equals` or `in` the rule tests truthiness of the value at `path`.
/// An explicit `equals: null` is kept distinct from an absent `equals`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VisibilityRule {
    pub path: String,
    #[serde(default, deserialize_with = "present_value", skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(default, rename = "in", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
}

/// Comparison mode selected by a [`VisibilityRule`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleComparison<'a> {
    In(&'a [Value]),
    Equals(&'a Value),
    Truthy,
}

impl VisibilityRule {
    pub fn truthy(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn equals(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            equals: Some(value.into()),
            one_of: None,
        }
    }

    pub fn one_of(path: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            equals: None,
            one_of: Some(values),
        }
    }

    /// Membership wins when a malformed rule carries both modes.
    pub fn comparison(&self) -> RuleComparison<'_> {
        if let Some(values) = &self.one_of {
            return RuleComparison::In(values);
        }
        if let Some(value) = &self.equals {
            return RuleComparison::Equals(value);
        }
        RuleComparison::Truthy
    }

    /// True when both `equals` and `in` were authored.
    pub fn is_ambiguous(&self) -> bool {
        self.equals.is_some() && self.one_of.is_some()
    }
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

pub(crate) fn one_or_many_rules<'de, D>(deserializer: D) -> Result<Vec<VisibilityRule>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(VisibilityRule),
        Many(Vec<VisibilityRule>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(rule) => vec![rule],
        OneOrMany::Many(rules) => rules,
    })
}
