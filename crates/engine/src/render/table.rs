//! Table-mode arrays: column selection, client-side pagination and row links.

use formwright_types::{ArrayNode, ControlNode, GroupNode, SchemaNode};
use formwright_util::{get_path, join_path, substitute_placeholders};

use super::options::scalar_text;
use super::view::{ColumnView, LinkView, RowKey, TableRowView, TableView};
use super::{BoundField, FieldRenderer};
use crate::error::WizardError;
use crate::store::{FormStore, StoreError};

/// Leaf control of an item template with its path relative to the row.
#[derive(Debug, Clone)]
pub(crate) struct LeafColumn<'a> {
    pub group_path: Option<String>,
    pub control: &'a ControlNode,
}

impl LeafColumn<'_> {
    pub(crate) fn id(&self) -> String {
        join_path(self.group_path.as_deref(), &self.control.id)
    }
}

/// Flattens the item template into its leaf controls, in authored order.
pub(crate) fn leaf_columns(item: &GroupNode) -> Vec<LeafColumn<'_>> {
    let mut leaves = Vec::new();
    collect_leaves(&item.children, None, &mut leaves);
    leaves
}

fn collect_leaves<'a>(children: &'a [SchemaNode], group_path: Option<&str>, leaves: &mut Vec<LeafColumn<'a>>) {
    for child in children {
        match child {
            SchemaNode::Control(control) => leaves.push(LeafColumn {
                group_path: group_path.map(str::to_string),
                control,
            }),
            SchemaNode::Group(group) => match &group.path {
                Some(path) => collect_leaves(&group.children, Some(&join_path(group_path, path)), leaves),
                None => collect_leaves(&group.children, group_path, leaves),
            },
            // Nested repeating structures have no single cell value.
            SchemaNode::Array(_) | SchemaNode::ArrayOfStrings(_) => {}
        }
    }
}

/// Configured columns in their configured order, or every leaf control.
pub(crate) fn table_columns<'a>(array: &'a ArrayNode) -> Vec<LeafColumn<'a>> {
    let leaves = leaf_columns(&array.item);
    if array.columns.is_empty() {
        return leaves;
    }
    array
        .columns
        .iter()
        .filter_map(|column| leaves.iter().find(|leaf| leaf.id() == *column || leaf.control.id == *column).cloned())
        .collect()
}

impl FieldRenderer {
    pub(super) fn render_table(
        &mut self,
        array: &ArrayNode,
        path: &str,
        keys: &[RowKey],
        store: &mut FormStore,
        wrote: &mut bool,
    ) -> Result<TableView, StoreError> {
        let page = array.page_size.unwrap_or(self.default_page_size).max(1);
        self.table_pages.insert(path.to_string(), page);
        let limit = *self.table_limits.entry(path.to_string()).or_insert(page);

        let columns = table_columns(array);
        let mut rows = Vec::with_capacity(keys.len().min(limit));
        for (index, key) in keys.iter().take(limit).enumerate() {
            let row_base = join_path(Some(path), &index.to_string());
            let mut cells = Vec::with_capacity(columns.len());
            for column in &columns {
                let cell_base = match &column.group_path {
                    Some(group_path) => join_path(Some(&row_base), group_path),
                    None => row_base.clone(),
                };
                cells.push(self.render_control(column.control, Some(&cell_base), store, wrote)?);
            }
            let links = self.row_links(array, &row_base, store);
            rows.push(TableRowView {
                key: *key,
                index,
                base: row_base,
                cells,
                links,
            });
        }

        Ok(TableView {
            columns: columns
                .iter()
                .map(|column| ColumnView {
                    id: column.id(),
                    label: column.control.display_label().to_string(),
                })
                .collect(),
            rows,
            limit,
            has_more: keys.len() > limit,
        })
    }

    /// Substitutes `{{name}}` from the row, then the form root, then query parameters.
    fn row_links(&self, array: &ArrayNode, row_base: &str, store: &FormStore) -> Vec<LinkView> {
        let row = store.get(row_base);
        let root = store.values();
        array
            .actions
            .iter()
            .map(|action| {
                let substitution = substitute_placeholders(&action.href, |name| {
                    row.and_then(|row| get_path(row, name))
                        .and_then(scalar_text)
                        .or_else(|| get_path(root, name).and_then(scalar_text))
                        .or_else(|| self.query_value(name))
                });
                LinkView {
                    label: action.label.clone(),
                    href: substitution.href,
                    unresolved: substitution.unresolved,
                }
            })
            .collect()
    }

    fn query_value(&self, name: &str) -> Option<String> {
        self.query
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.clone())
    }

    /// Reveals the next page of a table and returns the new limit.
    pub fn load_more(&mut self, store: &mut FormStore, path: &str) -> Result<usize, WizardError> {
        if !matches!(self.bindings.get(path), Some(BoundField::Array { .. })) || !self.table_pages.contains_key(path) {
            return Err(WizardError::UnknownBinding(path.to_string()));
        }
        let page = self.table_pages.get(path).copied().unwrap_or(self.default_page_size);
        let limit = self.table_limits.entry(path.to_string()).or_insert(page);
        *limit += page;
        let limit = *limit;
        self.refresh(store)?;
        Ok(limit)
    }
}
