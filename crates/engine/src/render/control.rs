use formwright_types::ControlNode;
use formwright_util::{has_meaningful_value, join_path, resolve_path};
use tracing::debug;

use super::options::resolve_options;
use super::prefill::prefill_writes;
use super::view::{ControlView, SuggestionView};
use super::{BoundField, FieldRenderer};
use crate::store::{FormStore, StoreError};

impl FieldRenderer {
    pub(super) fn render_control(
        &mut self,
        control: &ControlNode,
        base: Option<&str>,
        store: &mut FormStore,
        wrote: &mut bool,
    ) -> Result<ControlView, StoreError> {
        let binding = resolve_path(base, &control.id);
        store.register(binding.clone());

        if let Some(from_path) = &control.prefill_from {
            let source_path = resolve_path(base, from_path);
            self.watch(source_path.clone());
            *wrote |= self.apply_prefill(&binding, &source_path, store)?;
        }

        let options = if control.input.is_select() {
            match &control.options_from {
                Some(from_path) => {
                    let source_path = resolve_path(base, from_path);
                    let options = resolve_options(store.get(&source_path), &control.options);
                    self.watch(source_path);
                    options
                }
                None => control.options.clone(),
            }
        } else {
            Vec::new()
        };

        let mut suggestion_paths = Vec::with_capacity(control.suggestions.len());
        let mut suggestions = Vec::new();
        for suggestion in &control.suggestions {
            let source_path = resolve_path(base, &suggestion.from_path);
            if let Some(value) = store.get(&source_path).filter(|value| has_meaningful_value(value)) {
                suggestions.push(SuggestionView {
                    label: suggestion.label.clone(),
                    source: source_path.clone(),
                    value: value.clone(),
                });
            }
            self.watch(source_path.clone());
            suggestion_paths.push(source_path);
        }

        self.bindings.insert(
            binding.clone(),
            BoundField::Control {
                input: control.input,
                read_only: control.read_only,
                suggestions: suggestion_paths,
            },
        );

        Ok(ControlView {
            id: control.id.clone(),
            value: store.get(&binding).cloned(),
            binding,
            label: control.display_label().to_string(),
            help: control.help.clone(),
            placeholder: control.placeholder.clone(),
            max_length: control.max_length,
            input: control.input,
            display: control.read_only.then(|| control.masked_value.clone()).flatten(),
            read_only: control.read_only,
            options,
            suggestions,
        })
    }

    /// Decides the prefill once per mount, on the first pass where the source has a value.
    ///
    /// An occupied target consumes the decision without a write, so clearing it later
    /// never brings the source value back.
    fn apply_prefill(&mut self, binding: &str, source_path: &str, store: &mut FormStore) -> Result<bool, StoreError> {
        let key = self.prefill_key(binding);
        if self.prefilled.contains(&key) {
            return Ok(false);
        }
        let Some(source) = store.get(source_path).filter(|value| has_meaningful_value(value)).cloned() else {
            return Ok(false);
        };
        self.prefilled.insert(key);
        if store.get(binding).is_some_and(has_meaningful_value) {
            return Ok(false);
        }
        for (path, value) in prefill_writes(binding, &source, store) {
            store.set_pristine(&path, value)?;
        }
        debug!(target_path = %binding, source_path = %source_path, "applied one-time prefill");
        Ok(true)
    }

    /// Binding path with every row index replaced by that row's key.
    fn prefill_key(&self, binding: &str) -> String {
        let mut prefix = String::new();
        let mut segments = Vec::new();
        for segment in binding.split('.') {
            let row_key = segment
                .parse::<usize>()
                .ok()
                .and_then(|index| self.row_keys.get(&prefix).and_then(|keys| keys.get(index)));
            segments.push(match row_key {
                Some(key) => format!("#{}", key.0),
                None => segment.to_string(),
            });
            prefix = join_path(Some(prefix.as_str()), segment);
        }
        segments.join(".")
    }
}
