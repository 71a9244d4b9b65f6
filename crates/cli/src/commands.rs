//! Subcommand implementations shared by the binary and its tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use formwright_engine::{
    ChangeDigest, DirectoryPicker, MemoryPersistence, PageLocation, SchemaIssue, StepPersistence, Wizard, coalesce_changes, lint_definition, parse_wizard_file,
    steps_from_definition,
};
use formwright_types::WizardDefinition;
use formwright_util::{OutputFormat, Settings};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::persistence::{FilePersistence, ScriptedPicker};
use crate::script::{ScriptStep, load_script, run_script};

/// Reads initial wizard data from a YAML or JSON file.
pub fn load_data(path: Option<&Path>) -> Result<Value> {
    let Some(path) = path else {
        return Ok(Value::Null);
    };
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read data file: {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("Failed to parse data file: {}", path.display()))
}

fn build_wizard(
    definition: &WizardDefinition,
    settings: &Settings,
    data: Value,
    persistence: Arc<dyn StepPersistence>,
    picker: Option<Arc<dyn DirectoryPicker>>,
    step: Option<&str>,
) -> Result<Wizard> {
    let mut location = PageLocation::new(PageLocation::default().url().clone(), settings.step_query_param.clone());
    if let Some(step) = step {
        location.set_step(step);
    }
    let mut builder = Wizard::builder(persistence)
        .steps(steps_from_definition(definition))
        .data(data)
        .settings(settings.clone())
        .location(location);
    if let Some(phase) = &definition.phase {
        builder = builder.phase(phase.clone());
    }
    if let Some(picker) = picker {
        builder = builder.picker(picker);
    }
    builder.build().with_context(|| format!("Failed to start wizard '{}'", definition.wizard))
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub wizard: PathBuf,
    pub data: Option<PathBuf>,
    pub step: Option<String>,
}

/// Renders one step and returns its view model as JSON.
pub fn render(settings: &Settings, options: &RenderOptions) -> Result<Value> {
    let definition = parse_wizard_file(&options.wizard)?;
    let data = load_data(options.data.as_deref())?;
    let wizard = build_wizard(&definition, settings, data, Arc::new(MemoryPersistence::new()), None, options.step.as_deref())?;
    let step = wizard.current_step();
    Ok(json!({
        "wizard": definition.wizard,
        "title": definition.title,
        "step": {"id": step.id, "title": step.title, "help": step.help},
        "location": wizard.location().url().as_str(),
        "progress": wizard.progress(),
        "view": wizard.view(),
        "modal": wizard.modal(),
        "status": wizard.state().status(),
    }))
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub wizard: PathBuf,
    pub script: PathBuf,
    pub out: PathBuf,
    pub data: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Outcome of a scripted run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub wizard: String,
    pub events: Vec<ScriptStep>,
    pub current_step: String,
    pub finished: bool,
    pub dirty: bool,
    pub output: PathBuf,
}

/// Drives a wizard through a script, persisting accepted steps to `options.out`.
pub async fn run(settings: &Settings, options: &RunOptions) -> Result<RunReport> {
    let definition = parse_wizard_file(&options.wizard)?;
    let events = load_script(&options.script)?;
    let data = load_data(options.data.as_deref())?;
    let persistence = Arc::new(FilePersistence::new(&options.out, options.format));
    let picker = Arc::new(ScriptedPicker::new());

    let mut wizard = build_wizard(&definition, settings, data, persistence, Some(picker.clone() as Arc<dyn DirectoryPicker>), None)?;

    let (digest_sender, mut digest_receiver) = watch::channel(ChangeDigest::default());
    let coalescer = tokio::spawn(coalesce_changes(wizard.subscribe(), settings.frame_interval(), digest_sender));
    let observer = tokio::spawn(async move {
        let mut digests = 0usize;
        while digest_receiver.changed().await.is_ok() {
            let digest = digest_receiver.borrow_and_update().clone();
            digests += 1;
            debug!(revision = digest.revision, paths = ?digest.paths, "form changed");
        }
        digests
    });

    let steps = run_script(&mut wizard, &picker, &events).await?;
    let report = RunReport {
        wizard: definition.wizard.clone(),
        events: steps,
        current_step: wizard.current_step().id.clone(),
        finished: wizard.state().finished,
        dirty: wizard.is_dirty(),
        output: options.out.clone(),
    };

    drop(wizard);
    coalescer.await.context("Change coalescer panicked")?;
    let digests = observer.await.context("Change observer panicked")?;
    info!(events = report.events.len(), digests, finished = report.finished, "script complete");
    Ok(report)
}

/// Loads a wizard file and returns its schema issues.
pub fn lint(wizard: &Path) -> Result<Vec<SchemaIssue>> {
    let definition = parse_wizard_file(wizard)?;
    Ok(lint_definition(&definition))
}
