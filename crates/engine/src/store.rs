//! Reactive form-state store.
//!
//! The store owns the live wizard data and a baseline snapshot. The dirty flag is
//! derived: the data is dirty when its deep-cleaned form differs from the cleaned
//! baseline, so typing a character and deleting it again leaves the form clean.
//! Every write bumps the revision and is broadcast to subscribers.

use formwright_util::{PathError, deep_clean, get_path, remove_path, set_path};
use indexmap::IndexSet;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write '{path}': {source}")]
    Path {
        path: String,
        #[source]
        source: PathError,
    },
}

/// Who caused a store write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// Direct user input.
    User,
    /// One-time prefill; dirty only when it lands in a row added since the baseline.
    Prefill,
    /// Whole-document replacement or revert.
    Reset,
    /// Row or entry added, removed or moved.
    Structural,
}

/// Notification broadcast for every write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Absolute dotted path; empty for whole-document changes.
    pub path: String,
    pub value: Option<Value>,
    pub revision: u64,
    pub origin: ChangeOrigin,
}

#[derive(Debug)]
pub struct FormStore {
    values: Value,
    baseline: Value,
    registered: IndexSet<String>,
    revision: u64,
    changes: broadcast::Sender<FieldChange>,
}

impl FormStore {
    pub fn new(initial: Value) -> Self {
        let values = normalize_root(initial);
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            baseline: values.clone(),
            values,
            registered: IndexSet::new(),
            revision: 0,
            changes,
        }
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn baseline(&self) -> &Value {
        &self.baseline
    }

    pub fn snapshot(&self) -> Value {
        self.values.clone()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.values, path)
    }

    pub fn set(&mut self, path: &str, value: Value, origin: ChangeOrigin) -> Result<(), StoreError> {
        set_path(&mut self.values, path, value.clone()).map_err(|source| StoreError::Path {
            path: path.to_string(),
            source,
        })?;
        self.publish(path, Some(value), origin);
        Ok(())
    }

    /// Writes the value to both the data and the baseline so the dirty flag is unaffected.
    ///
    /// Only rows the baseline already holds unchanged take the write; a target inside a
    /// row added or altered since the baseline gets a plain write and stays dirty.
    pub fn set_pristine(&mut self, path: &str, value: Value) -> Result<(), StoreError> {
        if self.baseline_holds_row_of(path) {
            set_path(&mut self.baseline, path, value.clone()).map_err(|source| StoreError::Path {
                path: path.to_string(),
                source,
            })?;
        }
        self.set(path, value, ChangeOrigin::Prefill)
    }

    pub fn remove(&mut self, path: &str, origin: ChangeOrigin) -> Option<Value> {
        let removed = remove_path(&mut self.values, path)?;
        self.publish(path, None, origin);
        Some(removed)
    }

    /// Records that a visible field is bound to `path`.
    pub fn register(&mut self, path: impl Into<String>) {
        self.registered.insert(path.into());
    }

    pub fn clear_registrations(&mut self) {
        self.registered.clear();
    }

    pub fn is_registered(&self, path: &str) -> bool {
        self.registered.contains(path)
    }

    pub fn registered(&self) -> impl Iterator<Item = &str> {
        self.registered.iter().map(String::as_str)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FieldChange> {
        self.changes.subscribe()
    }

    pub fn is_dirty(&self) -> bool {
        deep_clean(&self.values) != deep_clean(&self.baseline)
    }

    /// Replaces data and baseline together.
    pub fn reset(&mut self, values: Value) {
        self.values = normalize_root(values);
        self.baseline = self.values.clone();
        self.publish("", Some(self.values.clone()), ChangeOrigin::Reset);
    }

    /// Restores the data to the baseline.
    pub fn revert(&mut self) {
        self.values = self.baseline.clone();
        self.publish("", Some(self.values.clone()), ChangeOrigin::Reset);
    }

    pub fn mark_clean(&mut self) {
        self.baseline = self.values.clone();
    }

    /// Adopts `snapshot` as the baseline; later edits stay dirty.
    pub fn mark_clean_at(&mut self, snapshot: &Value) {
        self.baseline = snapshot.clone();
    }

    fn baseline_holds_row_of(&self, path: &str) -> bool {
        let Some(row) = innermost_row(path) else {
            return true;
        };
        match get_path(&self.baseline, row) {
            Some(saved) => get_path(&self.values, row) == Some(saved),
            None => false,
        }
    }

    fn publish(&mut self, path: &str, value: Option<Value>, origin: ChangeOrigin) {
        self.revision += 1;
        // No subscribers is fine.
        let _ = self.changes.send(FieldChange {
            path: path.to_string(),
            value,
            revision: self.revision,
            origin,
        });
    }
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

/// Prefix of `path` ending at its last array index, if any.
fn innermost_row(path: &str) -> Option<&str> {
    let mut end = None;
    let mut offset = 0;
    for segment in path.split('.') {
        offset += segment.len();
        if segment.parse::<usize>().is_ok() {
            end = Some(offset);
        }
        offset += 1;
    }
    end.map(|end| &path[..end])
}

fn normalize_root(value: Value) -> Value {
    match value {
        Value::Null => Value::Object(Map::new()),
        other => other,
    }
}
