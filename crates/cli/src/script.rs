//! Scripted wizard sessions.
//!
//! A script is a YAML list of events, each tagged by `action`:
//!
//! ```yaml
//! - action: set
//!   path: name
//!   value: sales_pipeline
//! - action: next
//! - action: choose
//!   choice: continue_anyway
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use formwright_engine::{ModalChoice, Transition, Wizard};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::persistence::ScriptedPicker;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptEvent {
    /// Writes a value to a bound field.
    Set { path: String, value: Value },
    /// Types raw text into a field; the control kind decides the stored value.
    Input { path: String, text: String },
    AddRow { path: String },
    RemoveRow { path: String, index: usize },
    MoveRow { path: String, from: usize, to: usize },
    ToggleRow { path: String, index: usize },
    AddString { path: String },
    RemoveString { path: String, index: usize },
    LoadMore { path: String },
    ApplySuggestion { path: String, index: usize },
    /// Answers the directory picker with `value`; omit it to cancel the dialog.
    PickDirectory {
        path: String,
        #[serde(default)]
        value: Option<String>,
    },
    Next,
    Finish,
    Save,
    Navigate {
        step: String,
        #[serde(default)]
        bypass: bool,
    },
    /// Presses a button of the open modal.
    Choose { choice: ModalChoice },
    Discard,
    Location { url: String },
}

impl ScriptEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScriptEvent::Set { .. } => "set",
            ScriptEvent::Input { .. } => "input",
            ScriptEvent::AddRow { .. } => "add_row",
            ScriptEvent::RemoveRow { .. } => "remove_row",
            ScriptEvent::MoveRow { .. } => "move_row",
            ScriptEvent::ToggleRow { .. } => "toggle_row",
            ScriptEvent::AddString { .. } => "add_string",
            ScriptEvent::RemoveString { .. } => "remove_string",
            ScriptEvent::LoadMore { .. } => "load_more",
            ScriptEvent::ApplySuggestion { .. } => "apply_suggestion",
            ScriptEvent::PickDirectory { .. } => "pick_directory",
            ScriptEvent::Next => "next",
            ScriptEvent::Finish => "finish",
            ScriptEvent::Save => "save",
            ScriptEvent::Navigate { .. } => "navigate",
            ScriptEvent::Choose { .. } => "choose",
            ScriptEvent::Discard => "discard",
            ScriptEvent::Location { .. } => "location",
        }
    }
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptEvent>> {
    serde_yaml::from_str(text).context("Failed to parse script events")
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptEvent>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read script: {}", path.display()))?;
    parse_script(&text).with_context(|| format!("Invalid script: {}", path.display()))
}

/// One executed event and the transition it caused, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptStep {
    pub index: usize,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
}

/// Runs every event in order, stopping at the first API misuse.
pub async fn run_script(wizard: &mut Wizard, picker: &Arc<ScriptedPicker>, events: &[ScriptEvent]) -> Result<Vec<ScriptStep>> {
    let mut steps = Vec::with_capacity(events.len());
    for (index, event) in events.iter().enumerate() {
        let transition = apply_event(wizard, picker, event)
            .await
            .with_context(|| format!("Script event {} ({}) failed", index + 1, event.name()))?;
        match &transition {
            Some(transition) => info!(index = index + 1, action = event.name(), ?transition, "script event applied"),
            None => debug!(index = index + 1, action = event.name(), "script event applied"),
        }
        steps.push(ScriptStep {
            index: index + 1,
            action: event.name(),
            transition,
        });
    }
    Ok(steps)
}

async fn apply_event(wizard: &mut Wizard, picker: &Arc<ScriptedPicker>, event: &ScriptEvent) -> Result<Option<Transition>> {
    let transition = match event {
        ScriptEvent::Set { path, value } => {
            wizard.set_field(path, value.clone())?;
            None
        }
        ScriptEvent::Input { path, text } => {
            wizard.input_text(path, text)?;
            None
        }
        ScriptEvent::AddRow { path } => {
            wizard.add_row(path)?;
            None
        }
        ScriptEvent::RemoveRow { path, index } => {
            wizard.remove_row(path, *index)?;
            None
        }
        ScriptEvent::MoveRow { path, from, to } => {
            wizard.move_row(path, *from, *to)?;
            None
        }
        ScriptEvent::ToggleRow { path, index } => {
            wizard.toggle_row(path, *index)?;
            None
        }
        ScriptEvent::AddString { path } => {
            wizard.add_string(path)?;
            None
        }
        ScriptEvent::RemoveString { path, index } => {
            wizard.remove_string(path, *index)?;
            None
        }
        ScriptEvent::LoadMore { path } => {
            wizard.load_more(path)?;
            None
        }
        ScriptEvent::ApplySuggestion { path, index } => {
            wizard.apply_suggestion(path, *index)?;
            None
        }
        ScriptEvent::PickDirectory { path, value } => {
            picker.queue(value.clone());
            wizard.pick_directory(path).await?;
            None
        }
        ScriptEvent::Next => Some(wizard.next().await?),
        ScriptEvent::Finish => Some(wizard.finish().await?),
        ScriptEvent::Save => Some(wizard.manual_save().await?),
        ScriptEvent::Navigate { step, bypass } => {
            let index = wizard
                .steps()
                .iter()
                .position(|candidate| candidate.id == *step)
                .ok_or_else(|| anyhow!("unknown step '{step}'"))?;
            Some(wizard.navigate(index, *bypass)?)
        }
        ScriptEvent::Choose { choice } => Some(wizard.respond(*choice).await?),
        ScriptEvent::Discard => Some(wizard.discard_changes()?),
        ScriptEvent::Location { url } => {
            let url = Url::parse(url).with_context(|| format!("Invalid location URL: {url}"))?;
            Some(wizard.sync_location(url)?)
        }
    };
    Ok(transition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_events() {
        let events = parse_script(
            r#"
- action: set
  path: name
  value: acme
- action: move_row
  path: spaces
  from: 1
  to: 0
- action: pick_directory
  path: output_dir
- action: choose
  choice: save_and_continue
- action: navigate
  step: review
"#,
        )
        .expect("script");
        assert_eq!(
            events,
            vec![
                ScriptEvent::Set {
                    path: "name".into(),
                    value: Value::String("acme".into()),
                },
                ScriptEvent::MoveRow {
                    path: "spaces".into(),
                    from: 1,
                    to: 0,
                },
                ScriptEvent::PickDirectory {
                    path: "output_dir".into(),
                    value: None,
                },
                ScriptEvent::Choose {
                    choice: ModalChoice::SaveAndContinue,
                },
                ScriptEvent::Navigate {
                    step: "review".into(),
                    bypass: false,
                },
            ]
        );
    }

    #[test]
    fn rejects_unknown_actions() {
        assert!(parse_script("- action: explode\n").is_err());
    }
}
