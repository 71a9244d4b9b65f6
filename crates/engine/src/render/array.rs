//! Repeating groups: card rendering, row identity and row mutations.

use formwright_types::{ArrayMode, ArrayNode};
use formwright_util::{get_path, has_meaningful_value, join_path, resolve_path, set_path};
use serde_json::{Map, Value};
use tracing::debug;

use super::view::{ArrayBody, ArrayRowView, ArrayView, RowKey};
use super::{BoundField, FieldRenderer};
use crate::error::WizardError;
use crate::store::{ChangeOrigin, FormStore, StoreError};
use crate::visibility::is_visible;

const DEFAULT_ITEM_LABEL: &str = "Item";

impl FieldRenderer {
    pub(super) fn render_array(
        &mut self,
        array: &ArrayNode,
        base: Option<&str>,
        store: &mut FormStore,
        wrote: &mut bool,
    ) -> Result<ArrayView, StoreError> {
        let path = resolve_path(base, &array.path);
        self.watch(path.clone());
        store.register(path.clone());

        // Prefill sources resolve against the array's own base, not the new row.
        let prefill = array
            .new_item_prefill
            .iter()
            .map(|rule| (rule.id.clone(), resolve_path(base, &rule.from_path)))
            .collect();
        self.bindings.insert(path.clone(), BoundField::Array { prefill });

        let keys = self.sync_row_keys(&path, row_count(store, &path));
        let body = match array.mode {
            ArrayMode::Cards => {
                let mut rows = Vec::with_capacity(keys.len());
                for (index, key) in keys.iter().enumerate() {
                    rows.push(self.render_card(array, &path, index, *key, store, wrote)?);
                }
                ArrayBody::Cards { rows }
            }
            ArrayMode::Table => ArrayBody::Table(self.render_table(array, &path, &keys, store, wrote)?),
        };

        Ok(ArrayView {
            label: array.label.clone(),
            mode: array.mode,
            total_rows: keys.len(),
            path,
            body,
        })
    }

    fn render_card(
        &mut self,
        array: &ArrayNode,
        path: &str,
        index: usize,
        key: RowKey,
        store: &mut FormStore,
        wrote: &mut bool,
    ) -> Result<ArrayRowView, StoreError> {
        let row_base = join_path(Some(path), &index.to_string());
        let item_base = match &array.item.path {
            Some(item_path) => resolve_path(Some(&row_base), item_path),
            None => row_base.clone(),
        };

        self.watch_rules(&array.item.visible_when, Some(&item_base));
        let children = if is_visible(&array.item.visible_when, Some(&item_base), &*store) {
            self.render_children(&array.item.children, Some(&item_base), store, wrote)?
        } else {
            Vec::new()
        };

        let title = if array.indexed {
            let label = array.item_label.as_deref().unwrap_or(DEFAULT_ITEM_LABEL);
            Some(format!("{} {}", label, index + 1))
        } else {
            array.item_label.clone()
        };

        Ok(ArrayRowView {
            key,
            index,
            base: row_base,
            title,
            collapsible: array.collapsible,
            collapsed: array.collapsible && self.collapsed.contains(&key),
            children,
        })
    }

    /// Aligns the stored keys with the current row count and returns them.
    pub(super) fn sync_row_keys(&mut self, path: &str, len: usize) -> Vec<RowKey> {
        let keys = self.row_keys.entry(path.to_string()).or_default();
        while keys.len() < len {
            keys.push(RowKey(self.next_row_key));
            self.next_row_key += 1;
        }
        keys.truncate(len);
        keys.clone()
    }

    /// Appends a row, applying the array's new-item prefill rules first.
    pub fn add_row(&mut self, store: &mut FormStore, path: &str) -> Result<usize, WizardError> {
        let prefill = match self.bindings.get(path) {
            Some(BoundField::Array { prefill }) => prefill.clone(),
            _ => return Err(WizardError::UnknownBinding(path.to_string())),
        };

        let mut row = Value::Object(Map::new());
        for (field_id, source_path) in &prefill {
            if let Some(value) = store.get(source_path).filter(|value| has_meaningful_value(value)) {
                set_path(&mut row, field_id, value.clone()).map_err(|source| StoreError::Path {
                    path: join_path(Some(path), field_id),
                    source,
                })?;
            }
        }

        let index = row_count(store, path);
        store.set(&join_path(Some(path), &index.to_string()), row, ChangeOrigin::Structural)?;
        self.sync_row_keys(path, index + 1);
        debug!(array = %path, index, "appended array row");
        self.refresh(store)?;
        Ok(index)
    }

    pub fn remove_row(&mut self, store: &mut FormStore, path: &str, index: usize) -> Result<(), WizardError> {
        self.ensure_array(path)?;
        check_index(path, index, row_count(store, path))?;

        store.remove(&join_path(Some(path), &index.to_string()), ChangeOrigin::Structural);
        if let Some(keys) = self.row_keys.get_mut(path)
            && index < keys.len()
        {
            let key = keys.remove(index);
            self.collapsed.remove(&key);
            let marker = format!("#{}", key.0);
            self.prefilled.retain(|entry| !entry.split('.').any(|segment| segment == marker));
        }
        self.refresh(store)?;
        Ok(())
    }

    /// Moves a row; its key moves with it.
    pub fn move_row(&mut self, store: &mut FormStore, path: &str, from: usize, to: usize) -> Result<(), WizardError> {
        self.ensure_array(path)?;
        let len = row_count(store, path);
        check_index(path, from, len)?;
        check_index(path, to, len)?;
        if from == to {
            return Ok(());
        }

        let Some(Value::Array(mut rows)) = store.get(path).cloned() else {
            return Err(WizardError::UnknownBinding(path.to_string()));
        };
        let row = rows.remove(from);
        rows.insert(to, row);
        store.set(path, Value::Array(rows), ChangeOrigin::Structural)?;

        if let Some(keys) = self.row_keys.get_mut(path)
            && from < keys.len()
            && to < keys.len()
        {
            let key = keys.remove(from);
            keys.insert(to, key);
        }
        self.refresh(store)?;
        Ok(())
    }

    /// Flips the collapsed flag of a row and returns the new state.
    pub fn toggle_row(&mut self, store: &mut FormStore, path: &str, index: usize) -> Result<bool, WizardError> {
        self.ensure_array(path)?;
        let key = self
            .row_keys
            .get(path)
            .and_then(|keys| keys.get(index).copied())
            .ok_or_else(|| WizardError::IndexOutOfRange {
                path: path.to_string(),
                index,
                len: row_count(store, path),
            })?;
        let collapsed = if self.collapsed.remove(&key) {
            false
        } else {
            self.collapsed.insert(key);
            true
        };
        self.refresh(store)?;
        Ok(collapsed)
    }

    pub fn row_keys(&self, path: &str) -> &[RowKey] {
        self.row_keys.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub(super) fn ensure_array(&self, path: &str) -> Result<(), WizardError> {
        match self.bindings.get(path) {
            Some(BoundField::Array { .. }) => Ok(()),
            _ => Err(WizardError::UnknownBinding(path.to_string())),
        }
    }
}

pub(super) fn row_count(store: &FormStore, path: &str) -> usize {
    match get_path(store.values(), path) {
        Some(Value::Array(rows)) => rows.len(),
        _ => 0,
    }
}

pub(super) fn check_index(path: &str, index: usize, len: usize) -> Result<(), WizardError> {
    if index < len {
        Ok(())
    } else {
        Err(WizardError::IndexOutOfRange {
            path: path.to_string(),
            index,
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderedNode, find_control};
    use formwright_types::SchemaNode;
    use serde_json::json;
    use std::sync::Arc;

    fn containers_schema() -> Arc<[SchemaNode]> {
        serde_yaml::from_str::<Vec<SchemaNode>>(
            r#"
- kind: array
  path: containers
  collapsible: true
  indexed: true
  item_label: Container
  new_item_prefill:
    - id: space
      from_path: $.model.space
    - id: owner
      from_path: owner
  item:
    children:
      - kind: control
        id: name
      - kind: control
        id: space
"#,
        )
        .map(|nodes: Vec<SchemaNode>| nodes.into())
        .expect("schema")
    }

    #[test]
    fn new_rows_receive_prefilled_fields_only_when_sources_have_values() {
        let mut store = FormStore::new(json!({"model": {"space": "sales"}, "owner": ""}));
        let mut renderer = FieldRenderer::new(containers_schema(), 10);
        renderer.refresh(&mut store).expect("render");

        let index = renderer.add_row(&mut store, "containers").expect("add row");
        assert_eq!(index, 0);
        assert_eq!(store.get("containers.0"), Some(&json!({"space": "sales"})));
        assert_eq!(find_control(renderer.view(), "containers.0.space").and_then(|c| c.value.clone()), Some(json!("sales")));
    }

    #[test]
    fn row_keys_survive_removal_and_moves() {
        let mut store = FormStore::new(json!({"containers": [{"name": "a"}, {"name": "b"}, {"name": "c"}]}));
        let mut renderer = FieldRenderer::new(containers_schema(), 10);
        renderer.refresh(&mut store).expect("render");
        let original = renderer.row_keys("containers").to_vec();

        renderer.remove_row(&mut store, "containers", 0).expect("remove");
        assert_eq!(renderer.row_keys("containers"), &original[1..]);

        renderer.move_row(&mut store, "containers", 1, 0).expect("move");
        assert_eq!(renderer.row_keys("containers"), &[original[2], original[1]]);
        assert_eq!(store.get("containers"), Some(&json!([{"name": "c"}, {"name": "b"}])));

        let added = renderer.add_row(&mut store, "containers").expect("add");
        let keys = renderer.row_keys("containers");
        assert_eq!(added, 2);
        assert!(!original.contains(&keys[2]), "new rows get fresh keys");
    }

    #[test]
    fn collapsed_state_follows_the_row() {
        let mut store = FormStore::new(json!({"containers": [{"name": "a"}, {"name": "b"}]}));
        let mut renderer = FieldRenderer::new(containers_schema(), 10);
        renderer.refresh(&mut store).expect("render");

        assert!(renderer.toggle_row(&mut store, "containers", 1).expect("toggle"));
        renderer.move_row(&mut store, "containers", 1, 0).expect("move");

        let RenderedNode::Array(array) = &renderer.view()[0] else {
            panic!("expected array view");
        };
        let ArrayBody::Cards { rows } = &array.body else {
            panic!("expected cards");
        };
        assert!(rows[0].collapsed);
        assert!(!rows[1].collapsed);
        assert_eq!(rows[0].title.as_deref(), Some("Container 1"));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut store = FormStore::default();
        let mut renderer = FieldRenderer::new(containers_schema(), 10);
        renderer.refresh(&mut store).expect("render");
        let error = renderer.remove_row(&mut store, "containers", 0).expect_err("empty array");
        assert!(matches!(error, WizardError::IndexOutOfRange { len: 0, .. }));
        assert!(matches!(renderer.add_row(&mut store, "unknown"), Err(WizardError::UnknownBinding(_))));
    }
}
