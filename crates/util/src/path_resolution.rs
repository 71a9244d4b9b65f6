//! Dotted data paths.
//!
//! Paths address values inside a JSON document with `.`-separated segments; numeric
//! segments index arrays (`spaces.0.name`). Relative paths are resolved against a
//! base path:
//!
//! - `$name` or `$.name` is absolute and ignores the base.
//! - each leading `../` pops one base segment.
//! - a leading `./` is stripped without popping.
//!
//! Popping past the root silently yields an empty base.

use serde_json::{Map, Value};
use thiserror::Error;

/// Prefix marking an absolute path.
pub const ABSOLUTE_MARKER: char = '$';

const SEPARATOR: char = '.';
const PARENT_TOKEN: &str = "../";
const CURRENT_TOKEN: &str = "./";

/// Error raised when a value cannot be written at a path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("cannot descend into scalar at '{path}' while writing segment '{segment}'")]
    NotContainer { path: String, segment: String },
    #[error("segment '{segment}' of '{path}' is not an array index")]
    NotAnIndex { path: String, segment: String },
}

/// Resolves `relative_path` against `base_path` into an absolute dotted path.
pub fn resolve_path(base_path: Option<&str>, relative_path: &str) -> String {
    if let Some(stripped) = relative_path.strip_prefix(ABSOLUTE_MARKER) {
        return stripped.strip_prefix(SEPARATOR).unwrap_or(stripped).to_string();
    }

    let mut base_segments: Vec<&str> = base_path
        .unwrap_or_default()
        .split(SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .collect();
    let mut remainder = relative_path;
    loop {
        if let Some(rest) = remainder.strip_prefix(PARENT_TOKEN) {
            base_segments.pop();
            remainder = rest;
        } else if remainder == ".." {
            base_segments.pop();
            remainder = "";
        } else if let Some(rest) = remainder.strip_prefix(CURRENT_TOKEN) {
            remainder = rest;
        } else if remainder == "." {
            remainder = "";
        } else {
            break;
        }
    }

    if base_segments.is_empty() {
        return remainder.to_string();
    }
    let base = base_segments.join(".");
    join_path(Some(&base), remainder)
}

/// Joins a base path and a segment with a single separator.
pub fn join_path(base_path: Option<&str>, segment: &str) -> String {
    match base_path {
        Some(base) if !base.is_empty() && !segment.is_empty() => format!("{base}{SEPARATOR}{segment}"),
        Some(base) if !base.is_empty() => base.to_string(),
        _ => segment.to_string(),
    }
}

/// Parent of a dotted path, or `None` for a top-level segment.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(SEPARATOR).map(|index| &path[..index])
}

/// Final segment of a dotted path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit(SEPARATOR).next().unwrap_or(path)
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// Reads the value at `path`. The empty path addresses the root.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at `path`, creating intermediate containers.
///
/// Missing or `null` intermediates become arrays when the next segment is numeric and
/// objects otherwise; arrays are padded with `null` up to the written index.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut current = root;
    for (position, segment) in parents.iter().enumerate() {
        let next_is_index = parts[position + 1].parse::<usize>().is_ok();
        current = child_slot(current, path, segment, next_is_index)?;
    }

    match current {
        Value::Null => {
            *current = empty_container(last.parse::<usize>().is_ok());
            write_slot(current, path, last, value)
        }
        _ => write_slot(current, path, last, value),
    }
}

fn empty_container(as_array: bool) -> Value {
    if as_array { Value::Array(Vec::new()) } else { Value::Object(Map::new()) }
}

fn child_slot<'a>(current: &'a mut Value, path: &str, segment: &str, next_is_index: bool) -> Result<&'a mut Value, PathError> {
    if current.is_null() {
        *current = empty_container(segment.parse::<usize>().is_ok());
    }
    let slot = match current {
        Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
        Value::Array(items) => {
            let index = parse_index(path, segment)?;
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[index]
        }
        _ => {
            return Err(PathError::NotContainer {
                path: path.to_string(),
                segment: segment.to_string(),
            });
        }
    };
    if slot.is_null() {
        *slot = empty_container(next_is_index);
    }
    Ok(slot)
}

fn write_slot(current: &mut Value, path: &str, segment: &str, value: Value) -> Result<(), PathError> {
    match current {
        Value::Object(map) => {
            map.insert(segment.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = parse_index(path, segment)?;
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            items[index] = value;
            Ok(())
        }
        _ => Err(PathError::NotContainer {
            path: path.to_string(),
            segment: segment.to_string(),
        }),
    }
}

fn parse_index(path: &str, segment: &str) -> Result<usize, PathError> {
    segment.parse::<usize>().map_err(|_| PathError::NotAnIndex {
        path: path.to_string(),
        segment: segment.to_string(),
    })
}

/// Removes and returns the value at `path`; array elements after it shift down.
pub fn remove_path(root: &mut Value, path: &str) -> Option<Value> {
    let (parent, last) = match parent_path(path) {
        Some(parent) => (get_path_mut(root, parent)?, last_segment(path)),
        None => (root, path),
    };
    match parent {
        Value::Object(map) => map.remove(last),
        Value::Array(items) => {
            let index = last.parse::<usize>().ok()?;
            (index < items.len()).then(|| items.remove(index))
        }
        _ => None,
    }
}

fn get_path_mut<'a>(root: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map.get_mut(segment)?,
            Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
