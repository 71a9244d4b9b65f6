use formwright_types::SelectOption;
use serde_json::{Map, Value};

/// Maps a dynamic option source into select options.
///
/// Strings (and other scalars) become `{value, label}` pairs of themselves. Objects
/// take their value from `id`, `value` or `name`, and their label from `label`,
/// `name` or the chosen value. Entries without a usable value are skipped.
pub fn options_from_value(source: Option<&Value>) -> Vec<SelectOption> {
    let Some(Value::Array(entries)) = source else {
        return Vec::new();
    };
    entries.iter().filter_map(option_from_entry).collect()
}

/// Dynamic options win unless they are empty or absent.
pub fn resolve_options(dynamic: Option<&Value>, fallback: &[SelectOption]) -> Vec<SelectOption> {
    let options = options_from_value(dynamic);
    if options.is_empty() { fallback.to_vec() } else { options }
}

fn option_from_entry(entry: &Value) -> Option<SelectOption> {
    match entry {
        Value::Object(map) => {
            let value = first_text(map, &["id", "value", "name"])?;
            let label = first_text(map, &["label", "name"]).unwrap_or_else(|| value.clone());
            Some(SelectOption { value, label })
        }
        other => scalar_text(other).map(|text| SelectOption::new(text.clone(), text)),
    }
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(scalar_text))
}

/// Text form of a scalar; `None` for blanks, nulls and containers.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_strings_and_objects() {
        let source = json!([
            "plain",
            {"id": "sp-1", "name": "Sales"},
            {"value": 7, "label": "Seven"},
            {"name": "only-name"},
            {"description": "no value"},
            ""
        ]);
        let options = options_from_value(Some(&source));
        assert_eq!(
            options,
            vec![
                SelectOption::new("plain", "plain"),
                SelectOption::new("sp-1", "Sales"),
                SelectOption::new("7", "Seven"),
                SelectOption::new("only-name", "only-name"),
            ]
        );
    }

    #[test]
    fn falls_back_to_static_options() {
        let fallback = vec![SelectOption::new("edge", "Edge")];
        assert_eq!(resolve_options(None, &fallback), fallback);
        assert_eq!(resolve_options(Some(&json!([])), &fallback), fallback);
        assert_eq!(resolve_options(Some(&json!("not a list")), &fallback), fallback);
        assert_eq!(resolve_options(Some(&json!(["node"])), &fallback), vec![SelectOption::new("node", "node")]);
    }
}
