//! `{{name}}` placeholder substitution for row action links.
//!
//! Substituted values are percent-encoded the way `encodeURIComponent` would encode
//! them, so a value can never break out of its URL component. Placeholders without
//! a value are replaced by the empty string and reported back to the caller.

use once_cell::sync::Lazy;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::Regex;
use serde::Serialize;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder regex"));

/// Characters left unescaped by `encodeURIComponent`.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Result of substituting a link template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct LinkSubstitution {
    pub href: String,
    /// Placeholder names that had no value, in order of first appearance.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

impl LinkSubstitution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Placeholder names in order of first appearance, without duplicates.
pub fn placeholder_names(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for captures in PLACEHOLDER_RE.captures_iter(template) {
        let name = captures[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Replaces each `{{name}}` with the encoded value returned by `lookup`.
///
/// `lookup` returning `None` or an empty string leaves the placeholder unresolved.
pub fn substitute_placeholders<F>(template: &str, mut lookup: F) -> LinkSubstitution
where
    F: FnMut(&str) -> Option<String>,
{
    let mut unresolved: Vec<String> = Vec::new();
    let href = PLACEHOLDER_RE
        .replace_all(template, |captures: &regex::Captures<'_>| {
            let name = &captures[1];
            match lookup(name).filter(|value| !value.is_empty()) {
                Some(value) => utf8_percent_encode(&value, COMPONENT_ENCODE_SET).to_string(),
                None => {
                    if !unresolved.iter().any(|existing| existing == name) {
                        unresolved.push(name.to_string());
                    }
                    String::new()
                }
            }
        })
        .into_owned();
    LinkSubstitution { href, unresolved }
}
