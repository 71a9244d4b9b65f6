//! Typed view model produced by the field renderer.
//!
//! Every view is serializable so any front-end (or the CLI's `render` command) can
//! paint it without knowing about the schema tree.

use formwright_types::{ArrayMode, ControlKind, SelectOption};
use serde::Serialize;
use serde_json::Value;

/// Stable identity of an array row across removals and reorders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RowKey(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedNode {
    Control(ControlView),
    Group(GroupView),
    Array(ArrayView),
    StringList(StringListView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlView {
    pub id: String,
    /// Absolute path the control reads and writes.
    pub binding: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    pub input: ControlKind,
    pub value: Option<Value>,
    /// Text shown instead of the value (masked read-only secrets).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    pub read_only: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<SuggestionView>,
}

/// One-click affordance copying a value into a control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionView {
    pub label: String,
    pub source: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupView {
    /// Base path the children bind under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub children: Vec<RenderedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayView {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub mode: ArrayMode,
    pub total_rows: usize,
    pub body: ArrayBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum ArrayBody {
    Cards { rows: Vec<ArrayRowView> },
    Table(TableView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayRowView {
    pub key: RowKey,
    pub index: usize,
    pub base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub collapsible: bool,
    pub collapsed: bool,
    pub children: Vec<RenderedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    pub columns: Vec<ColumnView>,
    pub rows: Vec<TableRowView>,
    /// Rows currently revealed; grows by the page size on "load more".
    pub limit: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnView {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRowView {
    pub key: RowKey,
    pub index: usize,
    pub base: String,
    pub cells: Vec<ControlView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkView {
    pub label: String,
    pub href: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringListView {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    pub entries: Vec<StringEntryView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StringEntryView {
    pub index: usize,
    pub path: String,
    pub value: String,
}

impl RenderedNode {
    /// Depth-first search for the control bound to `binding`.
    pub fn find_control(&self, binding: &str) -> Option<&ControlView> {
        match self {
            RenderedNode::Control(control) => (control.binding == binding).then_some(control),
            RenderedNode::Group(group) => group.children.iter().find_map(|child| child.find_control(binding)),
            RenderedNode::Array(array) => match &array.body {
                ArrayBody::Cards { rows } => rows
                    .iter()
                    .flat_map(|row| row.children.iter())
                    .find_map(|child| child.find_control(binding)),
                ArrayBody::Table(table) => table
                    .rows
                    .iter()
                    .flat_map(|row| row.cells.iter())
                    .find(|cell| cell.binding == binding),
            },
            RenderedNode::StringList(_) => None,
        }
    }

    /// Calls `visit` for every control view in the subtree.
    pub(crate) fn for_each_control_mut(&mut self, visit: &mut dyn FnMut(&mut ControlView)) {
        match self {
            RenderedNode::Control(control) => visit(control),
            RenderedNode::Group(group) => group.children.iter_mut().for_each(|child| child.for_each_control_mut(visit)),
            RenderedNode::Array(array) => match &mut array.body {
                ArrayBody::Cards { rows } => rows
                    .iter_mut()
                    .flat_map(|row| row.children.iter_mut())
                    .for_each(|child| child.for_each_control_mut(visit)),
                ArrayBody::Table(table) => table.rows.iter_mut().flat_map(|row| row.cells.iter_mut()).for_each(|cell| visit(cell)),
            },
            RenderedNode::StringList(_) => {}
        }
    }
}

/// Finds the control bound to `binding` in a rendered tree.
pub fn find_control<'a>(nodes: &'a [RenderedNode], binding: &str) -> Option<&'a ControlView> {
    nodes.iter().find_map(|node| node.find_control(binding))
}
