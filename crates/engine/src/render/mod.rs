//! Schema interpreter.
//!
//! [`FieldRenderer`] walks a step's schema tree against the [`FormStore`] and produces
//! the [`RenderedNode`] view model. One renderer lives for exactly one step mount:
//! its one-time prefill bookkeeping, row keys, collapsed rows and table limits reset
//! when the wizard remounts the step.
//!
//! Rendering is reactive. Each pass records the absolute paths it read for
//! visibility, options, prefill, suggestions and repeating structures. A store
//! change touching one of those paths triggers a full pass; any other change only
//! patches the value of the affected controls.

mod array;
mod control;
mod options;
mod prefill;
mod strings;
mod table;
pub mod view;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use formwright_types::{ControlKind, GroupNode, SchemaNode, VisibilityRule};
use formwright_util::resolve_path;
use indexmap::IndexSet;
use tracing::trace;

pub use options::{options_from_value, resolve_options};
pub(crate) use table::{leaf_columns, table_columns};
pub use view::{
    ArrayBody, ArrayRowView, ArrayView, ColumnView, ControlView, GroupView, LinkView, RenderedNode, RowKey, StringEntryView, StringListView,
    SuggestionView, TableRowView, TableView, find_control,
};

use crate::store::{FormStore, StoreError};
use crate::visibility::{is_visible, path_touches, rule_paths};

/// What a rendered binding accepts from the wizard.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundField {
    Control {
        input: ControlKind,
        read_only: bool,
        /// Absolute suggestion source paths in authored order.
        suggestions: Vec<String>,
    },
    Array {
        /// `(field id, absolute source path)` copied into appended rows.
        prefill: Vec<(String, String)>,
    },
    StringList,
}

#[derive(Debug)]
pub struct FieldRenderer {
    schema: Arc<[SchemaNode]>,
    default_page_size: usize,
    query: Vec<(String, String)>,
    view: Vec<RenderedNode>,
    bindings: HashMap<String, BoundField>,
    dependencies: IndexSet<String>,
    prefilled: HashSet<String>,
    row_keys: HashMap<String, Vec<RowKey>>,
    next_row_key: u64,
    collapsed: HashSet<RowKey>,
    table_limits: HashMap<String, usize>,
    table_pages: HashMap<String, usize>,
    focus: Option<String>,
    passes: u64,
}

impl FieldRenderer {
    pub fn new(schema: Arc<[SchemaNode]>, default_page_size: usize) -> Self {
        Self {
            schema,
            default_page_size: default_page_size.max(1),
            query: Vec::new(),
            view: Vec::new(),
            bindings: HashMap::new(),
            dependencies: IndexSet::new(),
            prefilled: HashSet::new(),
            row_keys: HashMap::new(),
            next_row_key: 0,
            collapsed: HashSet::new(),
            table_limits: HashMap::new(),
            table_pages: HashMap::new(),
            focus: None,
            passes: 0,
        }
    }

    /// Query parameters used as the last fallback for action link placeholders.
    pub fn set_query_params(&mut self, query: Vec<(String, String)>) {
        self.query = query;
    }

    pub fn view(&self) -> &[RenderedNode] {
        &self.view
    }

    pub fn binding(&self, path: &str) -> Option<&BoundField> {
        self.bindings.get(path)
    }

    /// Paths whose changes trigger a full render pass.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependencies.iter().map(String::as_str)
    }

    /// Number of full render passes performed since mount.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Path of the entry that should receive input focus, if any.
    pub fn focus_request(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn take_focus_request(&mut self) -> Option<String> {
        self.focus.take()
    }

    /// Re-renders the whole tree, repeating while one-time prefills write new values.
    pub fn refresh(&mut self, store: &mut FormStore) -> Result<(), StoreError> {
        while self.render_pass(store)? {}
        Ok(())
    }

    /// Reacts to a store write at `changed`; returns true when a full pass ran.
    pub fn on_change(&mut self, store: &mut FormStore, changed: &str) -> Result<bool, StoreError> {
        if self.dependencies.iter().any(|watched| path_touches(changed, watched)) {
            self.refresh(store)?;
            return Ok(true);
        }
        for node in &mut self.view {
            node.for_each_control_mut(&mut |control| {
                if path_touches(changed, &control.binding) {
                    control.value = store.get(&control.binding).cloned();
                }
            });
        }
        Ok(false)
    }

    fn render_pass(&mut self, store: &mut FormStore) -> Result<bool, StoreError> {
        store.clear_registrations();
        self.bindings.clear();
        self.dependencies.clear();

        let schema = Arc::clone(&self.schema);
        let mut wrote = false;
        let mut nodes = Vec::with_capacity(schema.len());
        for node in schema.iter() {
            if let Some(rendered) = self.render_node(node, None, store, &mut wrote)? {
                nodes.push(rendered);
            }
        }
        self.view = nodes;
        self.passes += 1;
        trace!(passes = self.passes, prefilled = wrote, "render pass complete");
        Ok(wrote)
    }

    fn render_node(
        &mut self,
        node: &SchemaNode,
        base: Option<&str>,
        store: &mut FormStore,
        wrote: &mut bool,
    ) -> Result<Option<RenderedNode>, StoreError> {
        self.watch_rules(node.visible_when(), base);
        if !is_visible(node.visible_when(), base, &*store) {
            return Ok(None);
        }
        let rendered = match node {
            SchemaNode::Control(control) => RenderedNode::Control(self.render_control(control, base, store, wrote)?),
            SchemaNode::Group(group) => RenderedNode::Group(self.render_group(group, base, store, wrote)?),
            SchemaNode::Array(array) => RenderedNode::Array(self.render_array(array, base, store, wrote)?),
            SchemaNode::ArrayOfStrings(list) => RenderedNode::StringList(self.render_strings(list, base, store)),
        };
        Ok(Some(rendered))
    }

    fn render_group(&mut self, group: &GroupNode, base: Option<&str>, store: &mut FormStore, wrote: &mut bool) -> Result<GroupView, StoreError> {
        let group_base = match &group.path {
            Some(path) => Some(resolve_path(base, path)),
            None => base.map(str::to_string),
        };
        let children = self.render_children(&group.children, group_base.as_deref(), store, wrote)?;
        Ok(GroupView {
            base: group_base,
            label: group.label.clone(),
            children,
        })
    }

    fn render_children(
        &mut self,
        children: &[SchemaNode],
        base: Option<&str>,
        store: &mut FormStore,
        wrote: &mut bool,
    ) -> Result<Vec<RenderedNode>, StoreError> {
        let mut rendered = Vec::with_capacity(children.len());
        for child in children {
            if let Some(node) = self.render_node(child, base, store, wrote)? {
                rendered.push(node);
            }
        }
        Ok(rendered)
    }

    fn watch(&mut self, path: String) {
        self.dependencies.insert(path);
    }

    fn watch_rules(&mut self, rules: &[VisibilityRule], base: Option<&str>) {
        for path in rule_paths(rules, base) {
            self.watch(path);
        }
    }
}
