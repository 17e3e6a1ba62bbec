//! Multi-step guided form that ends in a single save.
//!
//! The session owns the field values for every step, the repeated-item lists
//! of repeated steps and the screen banner. Navigation is gated by the
//! step's [`Requirement`]; saving hands the composed fields to the entry
//! store and either clears the form (success) or keeps every value (failure).

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use indexmap::IndexMap;
use shared::{
    content::{ExerciseContent, Requirement, StepBody},
    protocol::{Entry, EntryFields},
};
use tracing::{info, warn};

use crate::{
    error::ClientError,
    items::RepeatedItems,
    navigation::NavigationRequest,
    notice::{Notice, NoticeBoard, DEFAULT_SUCCESS_TTL},
    store::EntryStore,
};

const REQUIRED_FIELD_MESSAGE: &str = "Fill in at least one field before continuing.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// 1-based.
    Step(usize),
    Saving,
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepChange {
    Moved(usize),
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub entry: Entry,
    pub navigation: NavigationRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Editing,
    Saving,
    Saved,
}

pub struct WizardSession {
    content: Arc<ExerciseContent>,
    store: Arc<dyn EntryStore>,
    current_step: usize,
    phase: Phase,
    field_values: IndexMap<String, String>,
    repeated: BTreeMap<usize, RepeatedItems>,
    notice: NoticeBoard,
    notice_ttl: Duration,
}

impl WizardSession {
    pub fn new(
        content: Arc<ExerciseContent>,
        store: Arc<dyn EntryStore>,
    ) -> Result<Self, shared::content::ContentError> {
        content.validate()?;
        let mut session = Self {
            content,
            store,
            current_step: 1,
            phase: Phase::Editing,
            field_values: IndexMap::new(),
            repeated: BTreeMap::new(),
            notice: NoticeBoard::default(),
            notice_ttl: DEFAULT_SUCCESS_TTL,
        };
        session.reset_values();
        Ok(session)
    }

    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    pub fn content(&self) -> &ExerciseContent {
        &self.content
    }

    pub fn state(&self) -> WizardState {
        match self.phase {
            Phase::Editing => WizardState::Step(self.current_step),
            Phase::Saving => WizardState::Saving,
            Phase::Saved => WizardState::Saved,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.content.total_steps()
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step == self.total_steps()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.current()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice.dismiss();
    }

    pub fn field(&self, field_id: &str) -> &str {
        self.field_values
            .get(field_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn field_values(&self) -> &IndexMap<String, String> {
        &self.field_values
    }

    /// No validation happens on input; gating is applied on `next`/`save`.
    pub fn set_field(&mut self, field_id: impl Into<String>, value: impl Into<String>) {
        self.leave_saved();
        self.field_values.insert(field_id.into(), value.into());
    }

    pub fn items(&self, step: usize) -> Option<&RepeatedItems> {
        self.repeated.get(&step)
    }

    pub fn items_mut(&mut self, step: usize) -> Option<&mut RepeatedItems> {
        self.leave_saved();
        self.repeated.get_mut(&step)
    }

    pub fn next(&mut self) -> Result<StepChange, ClientError> {
        self.ensure_not_saving()?;
        self.leave_saved();
        if self.is_last_step() {
            return Ok(StepChange::Unchanged);
        }
        self.check_requirement(self.current_step)?;
        self.current_step += 1;
        Ok(StepChange::Moved(self.current_step))
    }

    pub fn back(&mut self) -> Result<StepChange, ClientError> {
        self.ensure_not_saving()?;
        self.leave_saved();
        if self.current_step <= 1 {
            return Ok(StepChange::Unchanged);
        }
        self.current_step -= 1;
        Ok(StepChange::Moved(self.current_step))
    }

    /// Out-of-range targets are ignored.
    pub fn jump_to(&mut self, step: usize) -> Result<StepChange, ClientError> {
        self.ensure_not_saving()?;
        self.leave_saved();
        if step < 1 || step > self.total_steps() || step == self.current_step {
            return Ok(StepChange::Unchanged);
        }
        self.current_step = step;
        Ok(StepChange::Moved(step))
    }

    /// Where a hardware/back gesture should go from the current step.
    pub fn navigation_for_back(&self) -> NavigationRequest {
        if self.current_step > 1 {
            NavigationRequest::BackOneStep
        } else {
            NavigationRequest::ExercisesMenu
        }
    }

    pub fn clear_form(&mut self) {
        self.reset_values();
        self.current_step = 1;
        self.phase = Phase::Editing;
        self.notice.dismiss();
    }

    /// Entry payload: declared fields in content order, then repeated items,
    /// blanks omitted.
    pub fn compose_fields(&self) -> EntryFields {
        let mut fields = EntryFields::new();
        for (field_id, value) in &self.field_values {
            if !value.trim().is_empty() {
                fields.insert(field_id.clone(), value.clone());
            }
        }
        for items in self.repeated.values() {
            items.flatten_into(&mut fields);
        }
        fields
    }

    /// First half of a save: validates and enters `Saving`. Pair with
    /// [`WizardSession::complete_save`].
    pub fn begin_save(&mut self) -> Result<EntryFields, ClientError> {
        self.ensure_not_saving()?;
        if !self.is_last_step() || self.phase == Phase::Saved {
            return self.reject("Finish every step before saving.");
        }
        self.check_requirement(self.current_step)?;
        self.phase = Phase::Saving;
        Ok(self.compose_fields())
    }

    pub fn complete_save(
        &mut self,
        result: Result<Entry, ClientError>,
    ) -> Result<SaveOutcome, ClientError> {
        if self.phase != Phase::Saving {
            return Err(ClientError::validation("no save in progress"));
        }
        match result {
            Ok(entry) => {
                info!(exercise = %self.content.kind, entry_id = %entry.id, "wizard: saved");
                self.reset_values();
                self.current_step = 1;
                self.phase = Phase::Saved;
                let message = self.content.saved_notice().to_string();
                self.notice.success(message, self.notice_ttl);
                Ok(SaveOutcome {
                    entry,
                    navigation: NavigationRequest::EntriesList(self.content.kind.clone()),
                })
            }
            Err(err) => {
                warn!(exercise = %self.content.kind, error = %err, "wizard: save failed");
                self.phase = Phase::Editing;
                self.notice.error(err.user_message());
                Err(err)
            }
        }
    }

    pub async fn save(&mut self) -> Result<SaveOutcome, ClientError> {
        let fields = self.begin_save()?;
        let store = Arc::clone(&self.store);
        let result = store.create_entry(&self.content.kind, fields).await;
        self.complete_save(result)
    }

    fn check_requirement(&mut self, step: usize) -> Result<(), ClientError> {
        let Some(content) = self.content.step(step) else {
            return Ok(());
        };
        if content.required == Requirement::None {
            return Ok(());
        }
        let shortfall = match &content.body {
            StepBody::Repeated { min_items, .. } => {
                let met = self
                    .repeated
                    .get(&step)
                    .is_some_and(RepeatedItems::meets_minimum);
                match (met, *min_items) {
                    (true, _) => None,
                    (false, 0 | 1) => Some(REQUIRED_FIELD_MESSAGE.to_string()),
                    (false, min) => Some(format!(
                        "Fill in at least {min} items before continuing."
                    )),
                }
            }
            StepBody::Fields { .. } | StepBody::Subsections { .. } => {
                let filled = content
                    .field_ids()
                    .into_iter()
                    .any(|field_id| !self.field(field_id).trim().is_empty());
                (!filled).then(|| REQUIRED_FIELD_MESSAGE.to_string())
            }
        };
        match shortfall {
            None => Ok(()),
            Some(message) => self.reject(&message),
        }
    }

    fn reject<T>(&mut self, message: &str) -> Result<T, ClientError> {
        self.notice.error(message);
        Err(ClientError::validation(message))
    }

    fn ensure_not_saving(&self) -> Result<(), ClientError> {
        if self.phase == Phase::Saving {
            return Err(ClientError::validation("a save is already in progress"));
        }
        Ok(())
    }

    fn leave_saved(&mut self) {
        if self.phase == Phase::Saved {
            self.phase = Phase::Editing;
        }
    }

    fn reset_values(&mut self) {
        self.field_values.clear();
        self.repeated.clear();
        for (index, step) in self.content.steps.iter().enumerate() {
            match &step.body {
                StepBody::Repeated {
                    item_fields,
                    min_items,
                } => {
                    self.repeated.insert(
                        index + 1,
                        RepeatedItems::with_min_items(
                            item_fields.iter().map(|field| field.id.clone()),
                            *min_items,
                        ),
                    );
                }
                StepBody::Fields { .. } | StepBody::Subsections { .. } => {
                    for field_id in step.field_ids() {
                        self.field_values.insert(field_id.to_string(), String::new());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
