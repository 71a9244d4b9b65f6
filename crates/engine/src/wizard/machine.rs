//! The wizard state machine.
//!
//! [`Wizard`] owns the step list, the live [`FormStore`], the renderer of the
//! mounted step and the [`WizardState`] record. Every transition is a `&mut self`
//! method; the async ones await the injected [`StepPersistence`] sequentially.
//!
//! Saves follow a two-phase protocol. [`Wizard::begin_save`] cleans and validates
//! the snapshot, applies the gating policy and, when the save may proceed, issues a
//! [`SaveRequest`] carrying a fresh [`SaveToken`]. [`Wizard::complete_save`] applies
//! the persistence result, but only for the latest token; older completions are
//! reported as [`SaveOutcome::Stale`] and otherwise ignored.

use std::sync::Arc;

use formwright_types::{ControlKind, SchemaNode, ValidationResult};
use formwright_util::{Settings, has_meaningful_value};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use super::cleanup::{clean_snapshot, primary_row_patterns};
use super::gate::{GateDecision, decide};
use super::location::PageLocation;
use super::modal::{ModalChoice, ModalCoordinator, ModalView};
use super::persistence::{PersistError, StepPersistence};
use super::progress::{ProgressView, StepBadge};
use super::state::{AfterSave, CommandFailure, PendingAction, RetryPlan, SaveToken, ValidationNotice, WizardFault, WizardState};
use super::step::WizardStep;
use crate::error::WizardError;
use crate::picker::DirectoryPicker;
use crate::render::{BoundField, FieldRenderer, RenderedNode, RowKey};
use crate::store::{ChangeOrigin, FieldChange, FormStore};
use crate::visibility::is_visible;

/// Result of a transition method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "transition", rename_all = "snake_case")]
pub enum Transition {
    /// Saved and moved to the next visible step.
    Advanced { to: usize },
    /// Saved the last step and called `finish`.
    Finished,
    /// Saved without leaving the step.
    Saved,
    /// Mounted another step without saving.
    Navigated { to: usize },
    /// Reverted unsaved edits and remounted the current step.
    Reverted,
    /// A modal is waiting for the user's decision.
    AwaitingConfirmation,
    /// Validation hard-blocked the save.
    Blocked,
    /// Persistence failed; the command-failed modal is open.
    Failed,
    /// A modal was closed without further action.
    Dismissed,
    /// The completion belonged to a superseded save.
    Superseded,
}

/// A save issued by [`Wizard::begin_save`] or [`Wizard::begin_retry`].
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub token: SaveToken,
    pub step_id: String,
    /// Cleaned snapshot to persist.
    pub data: Value,
    /// Whether `finish` must be called after `save_step` succeeds.
    pub finish: bool,
}

/// What [`Wizard::begin_save`] decided.
#[derive(Debug, Clone, PartialEq)]
pub enum SavePlan {
    Ready(SaveRequest),
    Halted(Transition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Applied(Transition),
    Stale,
}

#[derive(Debug)]
struct InFlightSave {
    token: SaveToken,
    step_index: usize,
    after: AfterSave,
    /// Raw store snapshot taken when the save was issued.
    snapshot: Value,
}

/// Collects the wizard's collaborators and configuration.
pub struct WizardBuilder {
    steps: Vec<WizardStep>,
    data: Value,
    persistence: Arc<dyn StepPersistence>,
    phase: Option<String>,
    picker: Option<Arc<dyn DirectoryPicker>>,
    settings: Settings,
    location: Option<PageLocation>,
}

impl WizardBuilder {
    pub fn new(persistence: Arc<dyn StepPersistence>) -> Self {
        Self {
            steps: Vec::new(),
            data: Value::Null,
            persistence,
            phase: None,
            picker: None,
            settings: Settings::default(),
            location: None,
        }
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = WizardStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn step(mut self, step: WizardStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    pub fn picker(mut self, picker: Arc<dyn DirectoryPicker>) -> Self {
        self.picker = Some(picker);
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn location(mut self, location: PageLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Builds the wizard and mounts the step named by the location, or the first visible step.
    pub fn build(self) -> Result<Wizard, WizardError> {
        if self.steps.is_empty() {
            return Err(WizardError::StepOutOfRange { index: 0, count: 0 });
        }
        let location = self
            .location
            .unwrap_or_else(|| PageLocation::new(PageLocation::default().url().clone(), self.settings.step_query_param.clone()));
        let state = WizardState::new(self.steps.iter().map(|step| step.id.as_str()));
        let row_patterns = primary_row_patterns(&self.steps, &self.settings.primary_name_field);
        let renderer = FieldRenderer::new(Arc::clone(&self.steps[0].schema), self.settings.table_page_size);

        let mut wizard = Wizard {
            steps: self.steps,
            current: 0,
            store: FormStore::new(self.data),
            renderer,
            render_key: 0,
            state,
            persistence: self.persistence,
            picker: self.picker,
            phase: self.phase,
            settings: self.settings,
            location,
            row_patterns,
            last_token: 0,
            in_flight: None,
        };
        let index = wizard.located_step();
        wizard.mount(index)?;
        Ok(wizard)
    }
}

pub struct Wizard {
    steps: Vec<WizardStep>,
    current: usize,
    store: FormStore,
    renderer: FieldRenderer,
    render_key: u64,
    state: WizardState,
    persistence: Arc<dyn StepPersistence>,
    picker: Option<Arc<dyn DirectoryPicker>>,
    phase: Option<String>,
    settings: Settings,
    location: PageLocation,
    row_patterns: Vec<String>,
    last_token: u64,
    in_flight: Option<InFlightSave>,
}

impl Wizard {
    pub fn builder(persistence: Arc<dyn StepPersistence>) -> WizardBuilder {
        WizardBuilder::new(persistence)
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn steps(&self) -> &[WizardStep] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &WizardStep {
        &self.steps[self.current]
    }

    /// Identifies the current mount; bumps on every remount.
    pub fn render_key(&self) -> u64 {
        self.render_key
    }

    pub fn view(&self) -> &[RenderedNode] {
        self.renderer.view()
    }

    /// Live, uncleaned data.
    pub fn data(&self) -> &Value {
        self.store.values()
    }

    /// The snapshot as it would be validated and saved.
    pub fn cleaned_data(&self) -> Value {
        clean_snapshot(&self.store.snapshot(), &self.row_patterns, &self.settings.primary_name_field)
    }

    pub fn store(&self) -> &FormStore {
        &self.store
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn modal(&self) -> Option<ModalView> {
        ModalCoordinator::current(&self.state)
    }

    pub fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    /// Whether leaving the page should prompt the user.
    pub fn should_warn_before_leave(&self) -> bool {
        self.state.dirty
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FieldChange> {
        self.store.subscribe()
    }

    pub fn focus_request(&self) -> Option<&str> {
        self.renderer.focus_request()
    }

    pub fn take_focus_request(&mut self) -> Option<String> {
        self.renderer.take_focus_request()
    }

    pub fn row_keys(&self, path: &str) -> &[RowKey] {
        self.renderer.row_keys(path)
    }

    pub fn progress(&self) -> ProgressView {
        let steps: Vec<StepBadge> = self
            .steps
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_step_visible(*index))
            .map(|(index, step)| StepBadge {
                index,
                id: step.id.clone(),
                title: step.title.clone(),
                current: index == self.current,
                completed: self.state.is_completed(&step.id),
                issue: self.state.validation.get(&step.id).and_then(ValidationResult::severity),
            })
            .collect();
        let position = steps.iter().position(|badge| badge.current).map_or(0, |position| position + 1);
        ProgressView {
            phase: self.phase.clone(),
            position,
            total: steps.len(),
            steps,
        }
    }

    pub fn is_step_visible(&self, index: usize) -> bool {
        self.steps
            .get(index)
            .is_some_and(|step| is_visible(&step.visible_when, None, &self.store))
    }

    /// Writes a value to a rendered, writable binding.
    pub fn set_field(&mut self, path: &str, value: Value) -> Result<(), WizardError> {
        match self.renderer.binding(path) {
            None => return Err(WizardError::UnknownBinding(path.to_string())),
            Some(BoundField::Control { read_only: true, .. }) => return Err(WizardError::ReadOnly(path.to_string())),
            Some(_) => {}
        }
        self.store.set(path, value, ChangeOrigin::User)?;
        let rerendered = self.renderer.on_change(&mut self.store, path)?;
        self.state.dirty = self.store.is_dirty();
        debug!(path, rerendered, dirty = self.state.dirty, "field updated");
        Ok(())
    }

    /// Writes raw text, coerced by the bound control's kind.
    pub fn input_text(&mut self, path: &str, raw: &str) -> Result<(), WizardError> {
        let input = match self.renderer.binding(path) {
            Some(BoundField::Control { input, .. }) => *input,
            Some(_) => ControlKind::Text,
            None => return Err(WizardError::UnknownBinding(path.to_string())),
        };
        self.set_field(path, input.coerce_input(raw))
    }

    /// Copies the `index`th suggestion's source value into the control.
    pub fn apply_suggestion(&mut self, path: &str, index: usize) -> Result<(), WizardError> {
        let Some(BoundField::Control { suggestions, .. }) = self.renderer.binding(path) else {
            return Err(WizardError::UnknownBinding(path.to_string()));
        };
        let source = suggestions.get(index).ok_or_else(|| WizardError::IndexOutOfRange {
            path: path.to_string(),
            index,
            len: suggestions.len(),
        })?;
        let value = self
            .store
            .get(source)
            .filter(|value| has_meaningful_value(value))
            .cloned()
            .ok_or_else(|| WizardError::ChoiceUnavailable(format!("suggestion from '{source}'")))?;
        self.set_field(path, value)
    }

    /// Asks the injected picker for a directory; `Ok(None)` when the user cancelled.
    pub async fn pick_directory(&mut self, path: &str) -> Result<Option<String>, WizardError> {
        match self.renderer.binding(path) {
            Some(BoundField::Control { read_only: true, .. }) => return Err(WizardError::ReadOnly(path.to_string())),
            Some(BoundField::Control {
                input: ControlKind::Directory,
                ..
            }) => {}
            Some(_) => return Err(WizardError::NotDirectoryControl(path.to_string())),
            None => return Err(WizardError::UnknownBinding(path.to_string())),
        }
        let picker = self.picker.clone().ok_or(WizardError::PickerUnavailable)?;
        let picked = picker.pick().await.map_err(|error| WizardError::PickerFailed(format!("{error:#}")))?;
        if let Some(directory) = &picked {
            self.set_field(path, Value::String(directory.clone()))?;
        }
        Ok(picked)
    }

    pub fn add_row(&mut self, path: &str) -> Result<usize, WizardError> {
        let index = self.renderer.add_row(&mut self.store, path)?;
        self.sync_dirty();
        Ok(index)
    }

    pub fn remove_row(&mut self, path: &str, index: usize) -> Result<(), WizardError> {
        self.renderer.remove_row(&mut self.store, path, index)?;
        self.sync_dirty();
        Ok(())
    }

    pub fn move_row(&mut self, path: &str, from: usize, to: usize) -> Result<(), WizardError> {
        self.renderer.move_row(&mut self.store, path, from, to)?;
        self.sync_dirty();
        Ok(())
    }

    pub fn toggle_row(&mut self, path: &str, index: usize) -> Result<bool, WizardError> {
        self.renderer.toggle_row(&mut self.store, path, index)
    }

    /// Shows the next page of a table; returns the new row limit.
    pub fn load_more(&mut self, path: &str) -> Result<usize, WizardError> {
        self.renderer.load_more(&mut self.store, path)
    }

    pub fn add_string(&mut self, path: &str) -> Result<usize, WizardError> {
        let index = self.renderer.add_string(&mut self.store, path)?;
        self.sync_dirty();
        Ok(index)
    }

    pub fn remove_string(&mut self, path: &str, index: usize) -> Result<(), WizardError> {
        self.renderer.remove_string(&mut self.store, path, index)?;
        self.sync_dirty();
        Ok(())
    }

    /// Moves to step `index`. Unsaved changes open the unsaved-changes modal unless `bypass` is set.
    pub fn navigate(&mut self, index: usize, bypass: bool) -> Result<Transition, WizardError> {
        self.check_target(index)?;
        if self.state.dirty && !bypass {
            self.state.pending = PendingAction::Navigate(index);
            self.state.unsaved_modal_open = true;
            debug!(from = self.current, to = index, "navigation deferred by unsaved changes");
            return Ok(Transition::AwaitingConfirmation);
        }
        self.mount(index)?;
        Ok(Transition::Navigated { to: index })
    }

    /// Validates and saves the current step, then advances or finishes.
    pub async fn handle_next(&mut self, is_finish: bool, skip_validation: bool) -> Result<Transition, WizardError> {
        let after = if is_finish {
            AfterSave::Finish
        } else {
            self.next_visible(self.current).map_or(AfterSave::Finish, AfterSave::Navigate)
        };
        self.submit(after, skip_validation).await
    }

    pub async fn next(&mut self) -> Result<Transition, WizardError> {
        self.handle_next(false, false).await
    }

    pub async fn finish(&mut self) -> Result<Transition, WizardError> {
        self.handle_next(true, false).await
    }

    /// Saves the current step without advancing.
    pub async fn manual_save(&mut self) -> Result<Transition, WizardError> {
        self.submit(AfterSave::Stay, false).await
    }

    /// Reverts to the last saved snapshot, remounts, then runs a deferred navigation.
    pub fn discard_changes(&mut self) -> Result<Transition, WizardError> {
        let pending = self.state.pending;
        self.state.clear_pending();
        self.store.revert();
        info!(step = %self.current_step().id, "discarded unsaved changes");
        match pending {
            PendingAction::Navigate(index) if self.check_target(index).is_ok() => {
                self.mount(index)?;
                Ok(Transition::Navigated { to: index })
            }
            _ => {
                self.mount(self.current)?;
                Ok(Transition::Reverted)
            }
        }
    }

    pub fn cancel_pending_action(&mut self) {
        self.state.clear_pending();
    }

    /// "Save and continue" from the unsaved-changes modal.
    pub async fn save_and_continue_pending(&mut self) -> Result<Transition, WizardError> {
        if !self.state.unsaved_modal_open {
            return Err(WizardError::NoModalOpen);
        }
        let after = AfterSave::from_pending(self.state.pending).unwrap_or(AfterSave::Stay);
        self.state.unsaved_modal_open = false;
        self.submit(after, false).await
    }

    /// Overrides a non-blocking validation issue and runs the deferred action.
    pub async fn continue_anyway(&mut self) -> Result<Transition, WizardError> {
        let notice = match (&self.state.validation_notice, self.state.validation_modal_open) {
            (Some(notice), true) => notice,
            _ => return Err(WizardError::NoModalOpen),
        };
        if !notice.can_continue {
            return Err(WizardError::HardBlocked);
        }
        let after = AfterSave::from_pending(self.state.pending).unwrap_or(AfterSave::Stay);
        self.submit(after, true).await
    }

    /// Closes the validation modal so the user can fix the step.
    pub fn go_back(&mut self) -> Result<Transition, WizardError> {
        if !self.state.validation_modal_open {
            return Err(WizardError::NoModalOpen);
        }
        self.state.clear_pending();
        self.state.validation_notice = None;
        Ok(Transition::Dismissed)
    }

    /// Replays the failed save against the latest data.
    pub async fn retry(&mut self) -> Result<Transition, WizardError> {
        let request = self.begin_retry()?;
        self.execute(request).await
    }

    pub fn dismiss_failure(&mut self) -> Result<Transition, WizardError> {
        if self.state.command_failure.take().is_none() {
            return Err(WizardError::NoModalOpen);
        }
        self.state.last_error = None;
        Ok(Transition::Dismissed)
    }

    /// Applies a button of the currently open modal.
    pub async fn respond(&mut self, choice: ModalChoice) -> Result<Transition, WizardError> {
        let modal = self.modal().ok_or(WizardError::NoModalOpen)?;
        if !modal.offers(choice) {
            return Err(WizardError::ChoiceUnavailable(choice.label().to_string()));
        }
        match choice {
            ModalChoice::SaveAndContinue => self.save_and_continue_pending().await,
            ModalChoice::Discard => self.discard_changes(),
            ModalChoice::Cancel => {
                self.cancel_pending_action();
                Ok(Transition::Dismissed)
            }
            ModalChoice::ContinueAnyway => self.continue_anyway().await,
            ModalChoice::GoBack => self.go_back(),
            ModalChoice::Retry => self.retry().await,
            ModalChoice::Close => self.dismiss_failure(),
        }
    }

    /// Follows an external location change such as a deep link or back/forward.
    ///
    /// Unknown or hidden step ids are corrected to the first visible step.
    pub fn sync_location(&mut self, url: Url) -> Result<Transition, WizardError> {
        self.location.replace_url(url);
        let index = self.located_step();
        self.mount(index)?;
        Ok(Transition::Navigated { to: index })
    }

    /// Re-initializes with new data; nothing is merged.
    pub fn reset(&mut self, data: Value) -> Result<(), WizardError> {
        self.store.reset(data);
        self.state = WizardState::new(self.steps.iter().map(|step| step.id.as_str()));
        self.in_flight = None;
        let index = self.first_visible();
        self.mount(index)?;
        Ok(())
    }

    /// Cleans and validates the current step and, when the gate allows, issues a save.
    pub fn begin_save(&mut self, after: AfterSave, skip_validation: bool) -> Result<SavePlan, WizardError> {
        if self.state.saving {
            return Err(WizardError::SaveInFlight);
        }
        let snapshot = self.store.snapshot();
        let data = clean_snapshot(&snapshot, &self.row_patterns, &self.settings.primary_name_field);
        let step = &self.steps[self.current];

        let result = if skip_validation { ValidationResult::Valid } else { step.validate(&data) };
        if !skip_validation {
            self.state.validation.insert(step.id.clone(), result.clone());
        }

        match decide(&result, skip_validation) {
            GateDecision::Proceed => {}
            GateDecision::Confirm { error_styled } => {
                self.state.validation_notice = Some(notice(&step.id, &result, error_styled, true));
                self.state.validation_modal_open = true;
                self.state.unsaved_modal_open = false;
                self.state.pending = after.as_pending();
                debug!(step = %step.id, error_styled, "save awaits confirmation");
                return Ok(SavePlan::Halted(Transition::AwaitingConfirmation));
            }
            GateDecision::Block { error_styled } => {
                self.state.validation_notice = Some(notice(&step.id, &result, error_styled, false));
                self.state.validation_modal_open = true;
                self.state.unsaved_modal_open = false;
                self.state.pending = PendingAction::None;
                debug!(step = %step.id, "save blocked by validation");
                return Ok(SavePlan::Halted(Transition::Blocked));
            }
        }

        let step_id = step.id.clone();
        self.state.clear_pending();
        self.state.validation_notice = None;
        Ok(SavePlan::Ready(self.issue(self.current, after, snapshot, data, step_id)))
    }

    /// Issues a save replaying the last failure; supersedes any save still in flight.
    pub fn begin_retry(&mut self) -> Result<SaveRequest, WizardError> {
        let failure = self.state.command_failure.take().ok_or(WizardError::NoRetryPending)?;
        let snapshot = self.store.snapshot();
        let data = clean_snapshot(&snapshot, &self.row_patterns, &self.settings.primary_name_field);
        if let Some(superseded) = &self.in_flight {
            debug!(token = superseded.token.0, "retry supersedes in-flight save");
        }
        Ok(self.issue(failure.retry.step_index, failure.retry.after, snapshot, data, failure.step_id))
    }

    /// Applies the result of a save; only the latest token counts.
    pub fn complete_save(&mut self, token: SaveToken, result: Result<(), PersistError>) -> Result<SaveOutcome, WizardError> {
        let Some(in_flight) = self.in_flight.take_if(|in_flight| in_flight.token == token) else {
            debug!(token = token.0, latest = self.last_token, "discarding stale save completion");
            return Ok(SaveOutcome::Stale);
        };
        self.state.saving = false;
        let step_id = self.steps[in_flight.step_index].id.clone();

        if let Err(error) = result {
            warn!(step = %step_id, token = token.0, error = %error, "save failed");
            self.state.last_error = Some(WizardFault::from(&error));
            self.state.validation.insert(step_id.clone(), ValidationResult::error(error.to_string()));
            self.state.command_failure = Some(CommandFailure {
                step_id,
                message: error.to_string(),
                retry: RetryPlan {
                    step_index: in_flight.step_index,
                    after: in_flight.after,
                },
            });
            return Ok(SaveOutcome::Applied(Transition::Failed));
        }

        self.state.completed.insert(step_id.clone(), true);
        self.state.validation.insert(step_id.clone(), ValidationResult::Valid);
        self.state.last_error = None;
        self.state.command_failure = None;
        self.store.mark_clean_at(&in_flight.snapshot);
        self.sync_dirty();
        info!(step = %step_id, token = token.0, after = ?in_flight.after, "step saved");

        let transition = match in_flight.after {
            AfterSave::Stay => Transition::Saved,
            AfterSave::Navigate(index) => {
                self.mount(index)?;
                Transition::Advanced { to: index }
            }
            AfterSave::Finish => {
                self.state.finished = true;
                Transition::Finished
            }
        };
        Ok(SaveOutcome::Applied(transition))
    }

    async fn submit(&mut self, after: AfterSave, skip_validation: bool) -> Result<Transition, WizardError> {
        match self.begin_save(after, skip_validation)? {
            SavePlan::Halted(transition) => Ok(transition),
            SavePlan::Ready(request) => self.execute(request).await,
        }
    }

    async fn execute(&mut self, request: SaveRequest) -> Result<Transition, WizardError> {
        let persistence = Arc::clone(&self.persistence);
        let mut result = persistence.save_step(&request.step_id, &request.data).await;
        if result.is_ok() && request.finish {
            result = persistence.finish(&request.data).await;
        }
        match self.complete_save(request.token, result)? {
            SaveOutcome::Applied(transition) => Ok(transition),
            SaveOutcome::Stale => Ok(Transition::Superseded),
        }
    }

    fn issue(&mut self, step_index: usize, after: AfterSave, snapshot: Value, data: Value, step_id: String) -> SaveRequest {
        self.last_token += 1;
        let token = SaveToken(self.last_token);
        self.state.saving = true;
        self.in_flight = Some(InFlightSave {
            token,
            step_index,
            after,
            snapshot,
        });
        debug!(step = %step_id, token = token.0, "save issued");
        SaveRequest {
            token,
            step_id,
            data,
            finish: after == AfterSave::Finish,
        }
    }

    fn mount(&mut self, index: usize) -> Result<(), WizardError> {
        let schema: Arc<[SchemaNode]> = Arc::clone(&self.steps[index].schema);
        self.current = index;
        self.render_key += 1;
        self.location.set_step(&self.steps[index].id);
        let mut renderer = FieldRenderer::new(schema, self.settings.table_page_size);
        renderer.set_query_params(self.location.query_pairs());
        renderer.refresh(&mut self.store)?;
        self.renderer = renderer;
        self.sync_dirty();
        debug!(step = %self.steps[index].id, render_key = self.render_key, "step mounted");
        Ok(())
    }

    fn check_target(&self, index: usize) -> Result<(), WizardError> {
        let Some(step) = self.steps.get(index) else {
            return Err(WizardError::StepOutOfRange {
                index,
                count: self.steps.len(),
            });
        };
        if !self.is_step_visible(index) {
            return Err(WizardError::StepHidden(step.id.clone()));
        }
        Ok(())
    }

    /// Step named by the location when it exists and is visible, else the first visible step.
    fn located_step(&self) -> usize {
        let requested = self.location.step_id();
        let found = requested.as_deref().and_then(|id| {
            self.steps
                .iter()
                .position(|step| step.id == id)
                .filter(|index| self.is_step_visible(*index))
        });
        match (found, requested) {
            (Some(index), _) => index,
            (None, Some(requested)) => {
                let index = self.first_visible();
                info!(requested = %requested, corrected = %self.steps[index].id, "corrected step location");
                index
            }
            (None, None) => self.first_visible(),
        }
    }

    fn first_visible(&self) -> usize {
        (0..self.steps.len()).find(|index| self.is_step_visible(*index)).unwrap_or(0)
    }

    fn next_visible(&self, from: usize) -> Option<usize> {
        (from + 1..self.steps.len()).find(|index| self.is_step_visible(*index))
    }

    fn sync_dirty(&mut self) {
        self.state.dirty = self.store.is_dirty();
    }
}

fn notice(step_id: &str, result: &ValidationResult, error_styled: bool, can_continue: bool) -> ValidationNotice {
    let issue = result.details();
    ValidationNotice {
        step_id: step_id.to_string(),
        severity: result.severity().unwrap_or_default(),
        message: issue.map(|issue| issue.message.clone()).unwrap_or_default(),
        details: issue.map(|issue| issue.details.clone()).unwrap_or_default(),
        error_styled,
        can_continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::persistence::MemoryPersistence;
    use serde_json::json;

    fn schema(yaml: &str) -> Vec<SchemaNode> {
        serde_yaml::from_str(yaml).expect("schema")
    }

    fn two_steps() -> Vec<WizardStep> {
        vec![
            WizardStep::new("basics", "Basics", schema("- kind: control\n  id: name\n")).with_validator(|data: &Value| {
                if data.get("name").is_some() { ValidationResult::Valid } else { ValidationResult::warning("Name is empty") }
            }),
            WizardStep::new("details", "Details", schema("- kind: control\n  id: description\n")),
        ]
    }

    fn wizard(persistence: Arc<MemoryPersistence>) -> Wizard {
        Wizard::builder(persistence).steps(two_steps()).build().expect("wizard")
    }

    #[tokio::test]
    async fn next_saves_and_advances() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut wizard = wizard(Arc::clone(&persistence));
        wizard.set_field("name", json!("acme")).expect("set");
        assert!(wizard.is_dirty());

        assert_eq!(wizard.next().await.expect("next"), Transition::Advanced { to: 1 });
        assert_eq!(wizard.current_index(), 1);
        assert!(wizard.state().is_completed("basics"));
        assert!(!wizard.is_dirty());
        assert_eq!(persistence.last_saved(), Some(json!({"name": "acme"})));
        assert_eq!(wizard.location().step_id().as_deref(), Some("details"));
    }

    #[tokio::test]
    async fn last_step_next_finishes() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut wizard = wizard(Arc::clone(&persistence));
        wizard.navigate(1, false).expect("navigate");
        assert_eq!(wizard.next().await.expect("next"), Transition::Finished);
        assert!(wizard.state().finished);
        assert!(persistence.finished());
    }

    #[tokio::test]
    async fn dirty_navigation_waits_for_a_decision() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut wizard = wizard(persistence);
        wizard.set_field("name", json!("acme")).expect("set");

        assert_eq!(wizard.navigate(1, false).expect("navigate"), Transition::AwaitingConfirmation);
        assert_eq!(wizard.state().pending, PendingAction::Navigate(1));
        assert_eq!(wizard.modal().map(|modal| modal.choices.len()), Some(3));

        wizard.cancel_pending_action();
        assert_eq!(wizard.modal(), None);
        assert_eq!(wizard.current_index(), 0);
        assert_eq!(wizard.data(), &json!({"name": "acme"}));
    }

    #[tokio::test]
    async fn discard_reverts_and_runs_the_deferred_navigation() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut wizard = wizard(persistence);
        let key = wizard.render_key();
        wizard.set_field("name", json!("acme")).expect("set");
        wizard.navigate(1, false).expect("navigate");

        assert_eq!(wizard.respond(ModalChoice::Discard).await.expect("discard"), Transition::Navigated { to: 1 });
        assert_eq!(wizard.data(), &json!({}));
        assert!(!wizard.is_dirty());
        assert!(wizard.render_key() > key);
    }

    #[tokio::test]
    async fn warnings_can_be_overridden() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut wizard = wizard(Arc::clone(&persistence));

        assert_eq!(wizard.next().await.expect("next"), Transition::AwaitingConfirmation);
        let modal = wizard.modal().expect("modal");
        assert_eq!(modal.message, "Name is empty");
        assert!(modal.offers(ModalChoice::ContinueAnyway));

        assert_eq!(wizard.respond(ModalChoice::ContinueAnyway).await.expect("continue"), Transition::Advanced { to: 1 });
        assert_eq!(persistence.calls().len(), 1);
    }

    #[tokio::test]
    async fn modal_actions_require_an_open_modal() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut wizard = wizard(persistence);
        assert!(matches!(wizard.continue_anyway().await, Err(WizardError::NoModalOpen)));
        assert!(matches!(wizard.respond(ModalChoice::Retry).await, Err(WizardError::NoModalOpen)));
        assert!(matches!(wizard.go_back(), Err(WizardError::NoModalOpen)));
    }

    #[tokio::test]
    async fn failures_open_the_command_modal_until_retried() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut wizard = wizard(Arc::clone(&persistence));
        wizard.set_field("name", json!("acme")).expect("set");
        persistence.fail_next(PersistError::Unexpected("disk full".into()));

        assert_eq!(wizard.manual_save().await.expect("save"), Transition::Failed);
        assert!(!wizard.state().saving);
        assert_eq!(wizard.modal().map(|modal| modal.choices), Some(vec![ModalChoice::Retry, ModalChoice::Close]));
        assert!(!wizard.state().validation["basics"].is_valid());

        assert_eq!(wizard.respond(ModalChoice::Retry).await.expect("retry"), Transition::Saved);
        assert_eq!(wizard.state().last_error, None);
        assert_eq!(wizard.modal(), None);
    }

    #[test]
    fn saves_are_rejected_while_one_is_in_flight() {
        let persistence = Arc::new(MemoryPersistence::new());
        let mut wizard = wizard(persistence);
        wizard.set_field("name", json!("acme")).expect("set");
        let SavePlan::Ready(_) = wizard.begin_save(AfterSave::Stay, false).expect("begin") else {
            panic!("expected a save request");
        };
        assert!(matches!(wizard.begin_save(AfterSave::Stay, false), Err(WizardError::SaveInFlight)));
        assert_eq!(wizard.navigate(1, true).expect("navigate"), Transition::Navigated { to: 1 });
    }

    #[test]
    fn read_only_and_unknown_bindings_reject_writes() {
        let persistence = Arc::new(MemoryPersistence::new());
        let step = WizardStep::new(
            "basics",
            "Basics",
            schema("- kind: control\n  id: token\n  read_only: true\n  masked_value: '****'\n"),
        );
        let mut wizard = Wizard::builder(persistence).step(step).build().expect("wizard");
        assert!(matches!(wizard.set_field("token", json!("x")), Err(WizardError::ReadOnly(_))));
        assert!(matches!(wizard.set_field("missing", json!("x")), Err(WizardError::UnknownBinding(_))));
    }

    #[test]
    fn progress_counts_visible_steps() {
        let persistence = Arc::new(MemoryPersistence::new());
        let steps = vec![
            WizardStep::new("basics", "Basics", schema("- kind: control\n  id: advanced\n  input: checkbox\n")),
            WizardStep::new("tuning", "Tuning", Vec::new()).with_visibility(vec![formwright_types::VisibilityRule::truthy("advanced")]),
            WizardStep::new("review", "Review", Vec::new()),
        ];
        let mut wizard = Wizard::builder(persistence).steps(steps).phase("Setup").build().expect("wizard");

        let progress = wizard.progress();
        assert_eq!((progress.position, progress.total), (1, 2));
        assert_eq!(progress.phase.as_deref(), Some("Setup"));

        wizard.input_text("advanced", "true").expect("toggle");
        assert_eq!(wizard.progress().total, 3);
    }
}
