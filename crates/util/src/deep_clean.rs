//! Recursive emptiness pruning applied to wizard data before validation and save.
//!
//! A value is empty when it is `null`, a string that is blank after trimming, an
//! array with no remaining items, or an object with no remaining keys after its
//! children were cleaned. Numbers and booleans (including `0` and `false`) are kept.

use serde_json::{Map, Value};

/// Returns the cleaned value, or `None` when nothing meaningful remains.
///
/// Cleaning is idempotent: `deep_clean(&deep_clean(x)?)` equals `deep_clean(x)`.
pub fn deep_clean(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(text) => (!text.trim().is_empty()).then(|| value.clone()),
        Value::Bool(_) | Value::Number(_) => Some(value.clone()),
        Value::Array(items) => {
            let cleaned: Vec<Value> = items.iter().filter_map(deep_clean).collect();
            (!cleaned.is_empty()).then_some(Value::Array(cleaned))
        }
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .iter()
                .filter_map(|(key, child)| deep_clean(child).map(|child| (key.clone(), child)))
                .collect();
            (!cleaned.is_empty()).then_some(Value::Object(cleaned))
        }
    }
}

/// True when the value survives [`deep_clean`].
pub fn has_meaningful_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
        Value::Array(items) => items.iter().any(has_meaningful_value),
        Value::Object(map) => map.values().any(has_meaningful_value),
    }
}

/// Drops object rows lacking a meaningful `field` from the arrays matched by `pattern`.
///
/// `pattern` is a dotted path to an array; a `*` segment walks every element of an
/// intermediate array (`groups.*.items`). Rows that are not objects are left alone.
/// Returns the number of rows removed.
pub fn prune_rows_without(value: &mut Value, pattern: &str, field: &str) -> usize {
    let segments: Vec<&str> = pattern.split('.').filter(|segment| !segment.is_empty()).collect();
    prune_at(value, &segments, field)
}

fn prune_at(value: &mut Value, segments: &[&str], field: &str) -> usize {
    let Some((head, rest)) = segments.split_first() else {
        let Value::Array(rows) = value else {
            return 0;
        };
        let before = rows.len();
        rows.retain(|row| match row {
            Value::Object(map) => map.get(field).is_some_and(has_meaningful_value),
            _ => true,
        });
        return before - rows.len();
    };

    match (value, *head) {
        (Value::Array(items), "*") => items.iter_mut().map(|item| prune_at(item, rest, field)).sum(),
        (Value::Object(map), key) => map.get_mut(key).map_or(0, |child| prune_at(child, rest, field)),
        (Value::Array(items), index) => index
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get_mut(index))
            .map_or(0, |child| prune_at(child, rest, field)),
        _ => 0,
    }
}
