use formwright_types::{ControlKind, StringListNode};
use formwright_util::{join_path, resolve_path};
use serde_json::Value;

use super::array::{check_index, row_count};
use super::view::{StringEntryView, StringListView};
use super::{BoundField, FieldRenderer};
use crate::error::WizardError;
use crate::store::{ChangeOrigin, FormStore};

impl FieldRenderer {
    pub(super) fn render_strings(&mut self, list: &StringListNode, base: Option<&str>, store: &mut FormStore) -> StringListView {
        let path = resolve_path(base, &list.path);
        self.watch(path.clone());
        store.register(path.clone());
        self.bindings.insert(path.clone(), BoundField::StringList);

        let values: Vec<String> = match store.get(&path) {
            Some(Value::Array(items)) => items.iter().map(entry_text).collect(),
            _ => Vec::new(),
        };
        let mut entries = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let entry_path = join_path(Some(&path), &index.to_string());
            store.register(entry_path.clone());
            self.bindings.insert(
                entry_path.clone(),
                BoundField::Control {
                    input: ControlKind::Text,
                    read_only: false,
                    suggestions: Vec::new(),
                },
            );
            entries.push(StringEntryView {
                index,
                path: entry_path,
                value,
            });
        }

        StringListView {
            path,
            label: list.label.clone(),
            placeholder: list.placeholder.clone(),
            entries,
        }
    }

    /// Appends an empty entry and requests focus for it.
    pub fn add_string(&mut self, store: &mut FormStore, path: &str) -> Result<usize, WizardError> {
        self.ensure_string_list(path)?;
        let index = row_count(store, path);
        let entry_path = join_path(Some(path), &index.to_string());
        store.set(&entry_path, Value::String(String::new()), ChangeOrigin::Structural)?;
        self.focus = Some(entry_path);
        self.refresh(store)?;
        Ok(index)
    }

    pub fn remove_string(&mut self, store: &mut FormStore, path: &str, index: usize) -> Result<(), WizardError> {
        self.ensure_string_list(path)?;
        check_index(path, index, row_count(store, path))?;
        store.remove(&join_path(Some(path), &index.to_string()), ChangeOrigin::Structural);
        self.refresh(store)?;
        Ok(())
    }

    fn ensure_string_list(&self, path: &str) -> Result<(), WizardError> {
        match self.bindings.get(path) {
            Some(BoundField::StringList) => Ok(()),
            _ => Err(WizardError::UnknownBinding(path.to_string())),
        }
    }
}

fn entry_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
