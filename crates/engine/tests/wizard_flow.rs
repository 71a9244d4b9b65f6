use std::sync::Arc;

use async_trait::async_trait;
use formwright_engine::render::find_control;
use formwright_engine::{
    AfterSave, DirectoryPicker, MemoryPersistence, ModalChoice, PageLocation, PersistError, SaveOutcome, SavePlan, StepPersistence,
    Transition, Wizard, WizardError, WizardStatus, WizardStep, parse_wizard_file, steps_from_definition,
};
use formwright_types::{SchemaNode, ValidationResult, VisibilityRule, WizardDefinition};
use serde_json::{Value, json};

const MODULE_SETUP: &str = include_str!("../../../wizards/module_setup.yaml");

fn schema(yaml: &str) -> Vec<SchemaNode> {
    serde_yaml::from_str(yaml).expect("schema")
}

fn gated_steps(hard_block: bool) -> Vec<WizardStep> {
    let basics = WizardStep::new("basics", "Basics", schema("- kind: control\n  id: name\n")).with_validator(move |data: &Value| {
        match data.get("name").and_then(Value::as_str) {
            Some(name) if name.chars().all(|c| c.is_ascii_lowercase()) => ValidationResult::Valid,
            _ if hard_block => ValidationResult::error("Name must be lowercase").blocking(),
            _ => ValidationResult::warning("Name should be lowercase"),
        }
    });
    vec![basics, WizardStep::new("review", "Review", Vec::new())]
}

struct FixedPicker(Option<String>);

#[async_trait]
impl DirectoryPicker for FixedPicker {
    async fn pick(&self) -> anyhow::Result<Option<String>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn warnings_ask_for_confirmation() {
    let persistence = Arc::new(MemoryPersistence::new());
    let mut wizard = Wizard::builder(persistence.clone()).steps(gated_steps(false)).build().expect("wizard");
    wizard.set_field("name", json!("Acme")).expect("set");

    assert_eq!(wizard.next().await.expect("next"), Transition::AwaitingConfirmation);
    assert_eq!(wizard.state().status(), WizardStatus::BlockedOnValidationWarning);
    let modal = wizard.modal().expect("validation modal");
    assert_eq!(modal.choices, vec![ModalChoice::ContinueAnyway, ModalChoice::GoBack]);
    assert!(persistence.calls().is_empty());

    assert_eq!(wizard.respond(ModalChoice::ContinueAnyway).await.expect("continue"), Transition::Advanced { to: 1 });
    assert_eq!(persistence.last_saved(), Some(json!({"name": "Acme"})));
    assert!(wizard.state().validation["basics"].is_valid());
}

#[tokio::test]
async fn hard_blocks_cannot_be_overridden() {
    let persistence = Arc::new(MemoryPersistence::new());
    let mut wizard = Wizard::builder(persistence.clone()).steps(gated_steps(true)).build().expect("wizard");
    wizard.set_field("name", json!("Acme")).expect("set");

    assert_eq!(wizard.next().await.expect("next"), Transition::Blocked);
    let modal = wizard.modal().expect("validation modal");
    assert_eq!(modal.choices, vec![ModalChoice::GoBack]);
    assert!(matches!(wizard.continue_anyway().await, Err(WizardError::HardBlocked)));
    assert!(matches!(wizard.respond(ModalChoice::ContinueAnyway).await, Err(WizardError::ChoiceUnavailable(_))));

    assert_eq!(wizard.respond(ModalChoice::GoBack).await.expect("go back"), Transition::Dismissed);
    assert_eq!(wizard.modal(), None);
    assert_eq!(wizard.current_index(), 0);

    wizard.set_field("name", json!("acme")).expect("fix");
    assert_eq!(wizard.next().await.expect("next"), Transition::Advanced { to: 1 });
    assert_eq!(persistence.calls().len(), 1);
}

#[tokio::test]
async fn retry_saves_the_latest_edits() {
    let persistence = Arc::new(MemoryPersistence::new());
    let mut wizard = Wizard::builder(persistence.clone()).steps(gated_steps(false)).build().expect("wizard");
    wizard.set_field("name", json!("acme")).expect("set");
    persistence.fail_next(PersistError::Rejected("503 unavailable".into()));

    assert_eq!(wizard.next().await.expect("next"), Transition::Failed);
    assert_eq!(wizard.current_index(), 0);
    let fault = wizard.state().last_error.clone().expect("fault");
    assert_eq!(fault.kind, formwright_engine::wizard::FaultKind::Network);
    assert!(fault.recoverable);

    wizard.set_field("name", json!("acmecorp")).expect("edit");
    assert_eq!(wizard.retry().await.expect("retry"), Transition::Advanced { to: 1 });
    assert_eq!(persistence.last_saved(), Some(json!({"name": "acmecorp"})));
    assert_eq!(wizard.state().command_failure, None);
}

#[tokio::test]
async fn dismissing_a_failure_clears_the_fault() {
    let persistence = Arc::new(MemoryPersistence::new());
    let mut wizard = Wizard::builder(persistence.clone()).steps(gated_steps(false)).build().expect("wizard");
    wizard.set_field("name", json!("acme")).expect("set");
    persistence.fail_next(PersistError::Unexpected("disk full".into()));

    assert_eq!(wizard.next().await.expect("next"), Transition::Failed);
    assert_eq!(wizard.state().status(), WizardStatus::Errored);
    assert_eq!(wizard.respond(ModalChoice::Close).await.expect("dismiss"), Transition::Dismissed);
    assert_eq!(wizard.state().last_error, None);
    assert_eq!(wizard.state().status(), WizardStatus::Idle);
    assert!(wizard.modal().is_none());
}

#[tokio::test]
async fn prefill_runs_once_after_the_previous_step_saves() {
    let persistence = Arc::new(MemoryPersistence::new());
    let steps = vec![
        WizardStep::new("basics", "Basics", schema("- kind: control\n  id: name\n")),
        WizardStep::new("display", "Display", schema("- kind: control\n  id: display_name\n  prefill_from: $.name\n")),
    ];
    let mut wizard = Wizard::builder(persistence).steps(steps).build().expect("wizard");
    wizard.set_field("name", json!("acme")).expect("set");

    assert_eq!(wizard.next().await.expect("next"), Transition::Advanced { to: 1 });
    let display = find_control(wizard.view(), "display_name").expect("display control");
    assert_eq!(display.value, Some(json!("acme")));
    assert!(!wizard.is_dirty(), "prefill is pristine");

    wizard.set_field("display_name", json!("")).expect("clear");
    assert_eq!(wizard.data()["display_name"], json!(""), "cleared target is not prefilled again within the mount");

    wizard.set_field("display_name", json!("Acme Inc")).expect("edit");
    wizard.navigate(0, true).expect("back");
    wizard.set_field("name", json!("other")).expect("rename");
    assert_eq!(wizard.next().await.expect("next"), Transition::Advanced { to: 1 });
    assert_eq!(wizard.data()["display_name"], json!("Acme Inc"));
}

#[tokio::test]
async fn stale_completions_are_ignored() {
    let persistence = Arc::new(MemoryPersistence::new());
    let mut wizard = Wizard::builder(persistence).steps(gated_steps(false)).build().expect("wizard");
    wizard.set_field("name", json!("acme")).expect("set");

    let SavePlan::Ready(first) = wizard.begin_save(AfterSave::Stay, false).expect("begin") else {
        panic!("expected a save request");
    };
    let outcome = wizard.complete_save(first.token, Err(PersistError::Unexpected("timeout".into()))).expect("complete");
    assert_eq!(outcome, SaveOutcome::Applied(Transition::Failed));

    let second = wizard.begin_retry().expect("retry");
    assert!(second.token > first.token);
    assert_eq!(wizard.complete_save(first.token, Ok(())).expect("late"), SaveOutcome::Stale);
    assert!(wizard.state().saving, "stale completion leaves the retry in flight");

    assert_eq!(wizard.complete_save(second.token, Ok(())).expect("complete"), SaveOutcome::Applied(Transition::Saved));
    assert!(!wizard.state().saving);
    assert!(wizard.state().is_completed("basics"));
}

#[tokio::test]
async fn manual_save_keeps_data_and_marks_clean() {
    let persistence = Arc::new(MemoryPersistence::new());
    let mut wizard = Wizard::builder(persistence).steps(gated_steps(false)).build().expect("wizard");
    wizard.set_field("name", json!("acme")).expect("set");
    assert!(wizard.should_warn_before_leave());

    assert_eq!(wizard.manual_save().await.expect("save"), Transition::Saved);
    assert_eq!(wizard.current_index(), 0);
    assert_eq!(wizard.data(), &json!({"name": "acme"}));
    assert!(!wizard.should_warn_before_leave());
}

#[tokio::test]
async fn unsaved_changes_can_be_saved_before_leaving() {
    let persistence = Arc::new(MemoryPersistence::new());
    let mut wizard = Wizard::builder(persistence.clone()).steps(gated_steps(false)).build().expect("wizard");
    wizard.set_field("name", json!("acme")).expect("set");

    assert_eq!(wizard.navigate(1, false).expect("navigate"), Transition::AwaitingConfirmation);
    assert_eq!(wizard.state().status(), WizardStatus::BlockedOnUnsavedChanges);
    assert_eq!(wizard.respond(ModalChoice::SaveAndContinue).await.expect("save"), Transition::Advanced { to: 1 });
    assert_eq!(persistence.calls().len(), 1);
}

#[test]
fn locations_are_corrected_to_visible_steps() {
    let steps = vec![
        WizardStep::new("basics", "Basics", schema("- kind: control\n  id: advanced\n")),
        WizardStep::new("tuning", "Tuning", Vec::new()).with_visibility(vec![VisibilityRule::truthy("advanced")]),
        WizardStep::new("review", "Review", Vec::new()),
    ];
    let location = PageLocation::parse("https://app.example.com/new?step=ghost&project=demo", "step").expect("url");
    let mut wizard = Wizard::builder(Arc::new(MemoryPersistence::new()))
        .steps(steps)
        .location(location)
        .build()
        .expect("wizard");
    assert_eq!(wizard.current_index(), 0);
    assert_eq!(wizard.location().step_id().as_deref(), Some("basics"));
    assert_eq!(wizard.location().query_pairs()[0], ("project".to_string(), "demo".to_string()));

    let hidden = url::Url::parse("https://app.example.com/new?step=tuning").expect("url");
    assert_eq!(wizard.sync_location(hidden).expect("sync"), Transition::Navigated { to: 0 });

    let review = url::Url::parse("https://app.example.com/new?step=review").expect("url");
    assert_eq!(wizard.sync_location(review).expect("sync"), Transition::Navigated { to: 2 });
    assert!(matches!(wizard.navigate(1, true), Err(WizardError::StepHidden(_))));
    assert!(matches!(wizard.navigate(9, true), Err(WizardError::StepOutOfRange { .. })));
}

#[tokio::test]
async fn directory_controls_use_the_injected_picker() {
    let yaml = "- kind: control\n  id: output_dir\n  input: directory\n- kind: control\n  id: name\n";
    let mut without_picker = Wizard::builder(Arc::new(MemoryPersistence::new()))
        .step(WizardStep::new("only", "Only", schema(yaml)))
        .build()
        .expect("wizard");
    assert!(matches!(without_picker.pick_directory("output_dir").await, Err(WizardError::PickerUnavailable)));

    let mut wizard = Wizard::builder(Arc::new(MemoryPersistence::new()))
        .step(WizardStep::new("only", "Only", schema(yaml)))
        .picker(Arc::new(FixedPicker(Some("/srv/modules".into()))))
        .build()
        .expect("wizard");
    assert!(matches!(wizard.pick_directory("name").await, Err(WizardError::NotDirectoryControl(_))));
    assert_eq!(wizard.pick_directory("output_dir").await.expect("pick").as_deref(), Some("/srv/modules"));
    assert_eq!(wizard.data()["output_dir"], json!("/srv/modules"));
}

#[tokio::test]
async fn module_setup_runs_end_to_end() {
    let definition: WizardDefinition = serde_yaml::from_str(MODULE_SETUP).expect("definition");
    let persistence = Arc::new(MemoryPersistence::new());
    let location = PageLocation::parse("https://wizard.local/module?step=module&project=demo", "step").expect("url");
    let mut wizard = Wizard::builder(persistence.clone() as Arc<dyn StepPersistence>)
        .steps(steps_from_definition(&definition))
        .phase(definition.phase.clone().unwrap_or_default())
        .picker(Arc::new(FixedPicker(Some("/srv/modules".into()))))
        .location(location)
        .build()
        .expect("wizard");

    assert_eq!(wizard.progress().total, 2, "review stays hidden until a type is chosen");
    assert!(matches!(wizard.set_field("api_key", json!("secret")), Err(WizardError::ReadOnly(_))));
    assert_eq!(find_control(wizard.view(), "api_key").and_then(|control| control.display.clone()).as_deref(), Some("********"));

    wizard.set_field("name", json!("sales_pipeline")).expect("name");
    wizard.set_field("type", json!("edge")).expect("type");
    wizard.set_field("model.space", json!("sales")).expect("space");
    wizard.pick_directory("output_dir").await.expect("pick");
    assert_eq!(wizard.progress().total, 3);
    assert_eq!(wizard.next().await.expect("next"), Transition::Advanced { to: 1 });

    wizard.set_field("model_ref", json!("sales:SalesModel@v1")).expect("model ref");
    assert_eq!(wizard.data()["target"], json!({"space": "sales", "externalId": "SalesModel", "version": "v1"}));

    wizard.add_row("spaces").expect("space row");
    wizard.set_field("spaces.0.name", json!("sales")).expect("space name");
    wizard.add_row("containers").expect("container row");
    wizard.apply_suggestion("containers.0.name", 0).expect("suggestion");
    let options = &find_control(wizard.view(), "containers.0.space").expect("space select").options;
    assert_eq!(options.iter().map(|option| option.value.as_str()).collect::<Vec<_>>(), vec!["sales"]);
    wizard.add_string("tags").expect("tag");
    wizard.set_field("tags.0", json!("crm")).expect("tag value");
    assert_eq!(wizard.next().await.expect("next"), Transition::Advanced { to: 2 });

    wizard.input_text("confirmed", "yes").expect("confirm");
    assert_eq!(wizard.finish().await.expect("finish"), Transition::Finished);
    assert!(persistence.finished());
    assert_eq!(
        persistence.last_saved(),
        Some(json!({
            "name": "sales_pipeline",
            "type": "edge",
            "model": {"space": "sales"},
            "output_dir": "/srv/modules",
            "model_ref": "sales:SalesModel@v1",
            "target": {"space": "sales", "externalId": "SalesModel", "version": "v1"},
            "spaces": [{"name": "sales"}],
            "containers": [{"name": "sales_pipeline", "space": "sales"}],
            "tags": ["crm"],
            "confirmed": true
        }))
    );
    let progress = wizard.progress();
    assert!(progress.steps.iter().all(|badge| badge.completed));
    assert_eq!(progress.phase.as_deref(), Some("Module"));
}

#[test]
fn parses_the_sample_wizard_from_disk() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../wizards/module_setup.yaml");
    let definition = parse_wizard_file(path).expect("parse");
    assert_eq!(definition.steps.iter().map(|step| step.id.as_str()).collect::<Vec<_>>(), vec!["module", "resources", "review"]);
    assert!(formwright_engine::lint_definition(&definition).is_empty());
}
