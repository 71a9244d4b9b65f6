//! One-time prefill writes, including composite reference decomposition.
//!
//! A composite reference is a string `space:externalId@version`. When a prefill
//! target ends in `.space`, `.externalId` or `.version`, the target receives its own
//! component and each empty sibling under the same parent receives the rest.

use formwright_util::{has_meaningful_value, join_path, last_segment, parent_path};
use serde_json::Value;

use crate::store::FormStore;

const COMPOSITE_SUFFIXES: [&str; 3] = ["space", "externalId", "version"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompositeRef {
    pub space: String,
    pub external_id: String,
    pub version: String,
}

impl CompositeRef {
    pub fn parse(text: &str) -> Option<Self> {
        let (space, rest) = text.trim().split_once(':')?;
        let (external_id, version) = rest.rsplit_once('@')?;
        if space.is_empty() || external_id.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            space: space.to_string(),
            external_id: external_id.to_string(),
            version: version.to_string(),
        })
    }

    fn component(&self, suffix: &str) -> Option<&str> {
        match suffix {
            "space" => Some(&self.space),
            "externalId" => Some(&self.external_id),
            "version" => Some(&self.version),
            _ => None,
        }
    }
}

/// Writes needed to prefill `target` from `source`, target first.
pub(crate) fn prefill_writes(target: &str, source: &Value, store: &FormStore) -> Vec<(String, Value)> {
    let suffix = last_segment(target);
    let composite = source.as_str().and_then(CompositeRef::parse);
    let (Some(composite), Some(own)) = (composite, COMPOSITE_SUFFIXES.contains(&suffix).then_some(suffix)) else {
        return vec![(target.to_string(), source.clone())];
    };

    let parent = parent_path(target);
    let mut writes = Vec::with_capacity(COMPOSITE_SUFFIXES.len());
    if let Some(component) = composite.component(own) {
        writes.push((target.to_string(), Value::String(component.to_string())));
    }
    for sibling_suffix in COMPOSITE_SUFFIXES.iter().filter(|candidate| **candidate != own) {
        let sibling = join_path(parent, sibling_suffix);
        let occupied = store.get(&sibling).is_some_and(has_meaningful_value);
        if !occupied && let Some(component) = composite.component(sibling_suffix) {
            writes.push((sibling, Value::String(component.to_string())));
        }
    }
    writes
}
