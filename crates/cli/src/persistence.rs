//! File-backed collaborators for scripted runs.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use formwright_engine::{DirectoryPicker, PersistError, StepPersistence};
use formwright_util::OutputFormat;
use serde_json::{Map, Value};
use tracing::info;

/// Writes the cleaned wizard data to one file after every accepted step.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
    format: OutputFormat,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self { path: path.into(), format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, data: &Value) -> Result<()> {
        let document = render_document(data, self.format)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
        tokio::fs::write(&self.path, document)
            .await
            .with_context(|| format!("Failed to write output file: {}", self.path.display()))
    }
}

#[async_trait]
impl StepPersistence for FilePersistence {
    async fn save_step(&self, step_id: &str, data: &Value) -> Result<(), PersistError> {
        self.write(data).await.map_err(|error| PersistError::Unexpected(format!("{error:#}")))?;
        info!(step = %step_id, path = %self.path.display(), "wrote step data");
        Ok(())
    }

    async fn finish(&self, data: &Value) -> Result<(), PersistError> {
        self.write(data).await.map_err(|error| PersistError::Unexpected(format!("{error:#}")))?;
        info!(path = %self.path.display(), "wizard finished");
        Ok(())
    }
}

/// Serializes data with object keys in sorted order.
pub fn render_document(data: &Value, format: OutputFormat) -> Result<String> {
    let sorted = sort_keys(data);
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(&sorted).context("Failed to encode YAML"),
        OutputFormat::Json => {
            let mut text = serde_json::to_string_pretty(&sorted).context("Failed to encode JSON")?;
            text.push('\n');
            Ok(text)
        }
    }
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let sorted: Map<String, Value> = entries.into_iter().map(|(key, value)| (key.clone(), sort_keys(value))).collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Directory picker answering from a queue filled by the script.
#[derive(Debug, Default)]
pub struct ScriptedPicker {
    answers: Mutex<VecDeque<Option<String>>>,
}

impl ScriptedPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next answer; `None` behaves like a cancelled dialog.
    pub fn queue(&self, answer: Option<String>) {
        self.answers.lock().expect("picker lock poisoned").push_back(answer);
    }
}

#[async_trait]
impl DirectoryPicker for ScriptedPicker {
    async fn pick(&self) -> anyhow::Result<Option<String>> {
        let answer = self.answers.lock().expect("picker lock poisoned").pop_front();
        answer.context("the script did not provide a directory for this pick")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn documents_are_sorted() {
        let data = json!({"zeta": 1, "alpha": {"y": true, "b": [ {"k": 1, "a": 2} ]}});
        assert_eq!(render_document(&data, OutputFormat::Yaml).expect("yaml"), "alpha:\n  b:\n  - a: 2\n    k: 1\n  y: true\nzeta: 1\n");
        let json_text = render_document(&data, OutputFormat::Json).expect("json");
        assert!(json_text.find("\"alpha\"") < json_text.find("\"zeta\""));
    }

    #[tokio::test]
    async fn writes_each_save_to_the_output_file() {
        let temp_dir = tempfile::tempdir().expect("tempdir");
        let path = temp_dir.path().join("nested/out.json");
        let persistence = FilePersistence::new(&path, OutputFormat::Json);

        persistence.save_step("module", &json!({"name": "a"})).await.expect("save");
        persistence.finish(&json!({"name": "b"})).await.expect("finish");
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(written, json!({"name": "b"}));
    }

    #[tokio::test]
    async fn pickers_replay_queued_answers() {
        let picker = ScriptedPicker::new();
        picker.queue(Some("/srv".into()));
        picker.queue(None);
        assert_eq!(picker.pick().await.expect("first").as_deref(), Some("/srv"));
        assert_eq!(picker.pick().await.expect("second"), None);
        assert!(picker.pick().await.is_err());
    }
}
