//! `EditorSession`: an [`EditorState`] plus the asynchronous boundaries
//! around it (schedule fetches, save and discard round-trips) and the
//! navigation guard.
//!
//! Every boundary is split into a request and a completion so the caller's
//! executor decides how the I/O runs. The `fetch_schedules`, `save` and
//! `discard` helpers drive both halves against a synchronous backend.

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use scenedit_common::{EntityId, PropertyValue};
use scenedit_engine::schedule::{merge_monthly, merge_schedules};
use scenedit_engine::sync::verify_consistency;
use scenedit_engine::{
    Action, ActionOutcome, CanonicalStore, ChangeSet, ChangeSummary, ConsistencyViolation,
    EditorState, EngineError, MergedGrid, Schedule, Selection, SyncError,
};
use serde::Serialize;

use crate::config::{SelectionPolicy, SessionConfig};
use crate::error::SessionError;
use crate::fetch::{FetchOutcome, FetchTicket, FetchTracker};
use crate::loader::{LoaderStats, ScenarioLoader};
use crate::traits::{SavePayload, ScenarioBackend};

#[derive(Debug)]
pub enum DispatchOutcome {
    Applied(ActionOutcome),
    /// Held until the selection's schedules finish loading.
    Queued { pending: usize },
}

/// Result of settling one fetch ticket.
#[derive(Debug)]
pub struct FetchCompletion {
    pub entity: EntityId,
    pub outcome: FetchOutcome,
    /// Queued edits replayed because this completion emptied the in-flight set.
    pub replayed: Vec<Result<ActionOutcome, SessionError>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    id: u64,
    epoch: u64,
}

impl SaveTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveReceipt {
    pub started_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
    /// What was pending when the save started.
    pub summary: ChangeSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscardReport {
    pub epoch: u64,
    pub discarded: ChangeSummary,
    /// Entities whose schedule was re-fetched because it had pending edits.
    pub refetched: Vec<EntityId>,
    /// Re-fetches that failed; also listed in the fetch error map.
    pub failed: Vec<EntityId>,
}

#[derive(Debug)]
enum ScheduleEdit {
    Hourly {
        category: String,
        day: String,
        index: usize,
        value: PropertyValue,
    },
    Monthly {
        index: usize,
        value: f64,
    },
}

impl TryFrom<Action> for ScheduleEdit {
    type Error = Action;

    fn try_from(action: Action) -> Result<Self, Action> {
        match action {
            Action::EditSchedule {
                category,
                day,
                index,
                value,
            } => Ok(ScheduleEdit::Hourly {
                category,
                day,
                index,
                value,
            }),
            Action::EditMonthly { index, value } => Ok(ScheduleEdit::Monthly { index, value }),
            other => Err(other),
        }
    }
}

/// A schedule edit held back while its targets load.
#[derive(Debug)]
struct QueuedEdit {
    epoch: u64,
    targets: Vec<EntityId>,
    edit: ScheduleEdit,
}

#[derive(Debug)]
struct PendingSave {
    ticket: SaveTicket,
    started_at: DateTime<Utc>,
    summary: ChangeSummary,
}

#[derive(Debug)]
pub struct EditorSession {
    state: EditorState,
    config: SessionConfig,
    fetches: FetchTracker,
    queued: Vec<QueuedEdit>,
    save: Option<PendingSave>,
    next_save_id: u64,
    last_save: Option<SaveReceipt>,
    poisoned: Option<ConsistencyViolation>,
    stats: LoaderStats,
}

impl EditorSession {
    pub fn new(store: CanonicalStore, config: SessionConfig) -> Self {
        let mut state = EditorState::new(store, config.layout.clone());
        state.set_log_enabled(config.enable_change_log);
        Self {
            state,
            config,
            fetches: FetchTracker::new(),
            queued: Vec::new(),
            save: None,
            next_save_id: 0,
            last_save: None,
            poisoned: None,
            stats: LoaderStats::default(),
        }
    }

    /// Load a scenario from `backend`.
    pub fn open<B: ScenarioBackend>(backend: &mut B, config: SessionConfig) -> Result<Self, SessionError> {
        let mut loader = ScenarioLoader::new(&config.layout, config.verify_on_load);
        let store = loader.load(backend)?;
        let stats = loader.into_stats();
        let mut session = Self::new(store, config);
        session.stats = stats;
        Ok(session)
    }

    // Read access

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn store(&self) -> &CanonicalStore {
        self.state.store()
    }

    pub fn change_set(&self) -> &ChangeSet {
        self.state.change_set()
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> &LoaderStats {
        &self.stats
    }

    pub fn epoch(&self) -> u64 {
        self.fetches.epoch()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.state.has_pending_changes()
    }

    pub fn fetch_errors(&self) -> &BTreeMap<EntityId, String> {
        self.fetches.errors()
    }

    /// True while any selected entity's schedule is being fetched.
    pub fn is_loading(&self) -> bool {
        !self
            .fetches
            .in_flight_among(self.state.selection().ids())
            .is_empty()
    }

    pub fn queued_edits(&self) -> usize {
        self.queued.len()
    }

    pub fn is_saving(&self) -> bool {
        self.save.is_some()
    }

    pub fn last_save(&self) -> Option<&SaveReceipt> {
        self.last_save.as_ref()
    }

    pub fn poisoned(&self) -> Option<&ConsistencyViolation> {
        self.poisoned.as_ref()
    }

    // Editing

    pub fn dispatch(&mut self, action: Action) -> Result<DispatchOutcome, SessionError> {
        self.ensure_healthy()?;
        if action.is_edit() && self.save.is_some() {
            return Err(SessionError::EditsBlocked);
        }
        let action = match ScheduleEdit::try_from(action) {
            Ok(edit) => {
                let targets = self.state.selection().to_vec();
                if !self.fetches.in_flight_among(&targets).is_empty() {
                    self.queued.push(QueuedEdit {
                        epoch: self.fetches.epoch(),
                        targets,
                        edit,
                    });
                    return Ok(DispatchOutcome::Queued {
                        pending: self.queued.len(),
                    });
                }
                return self
                    .apply_schedule_edit(targets, edit)
                    .map(DispatchOutcome::Applied);
            }
            Err(action) => action,
        };
        let result = self.state.dispatch(action);
        self.check_fatal(result).map(DispatchOutcome::Applied)
    }

    /// Comparison grid for the selection.
    pub fn merged_schedule(&self, category: &str, day: &str) -> Result<MergedGrid<PropertyValue>, SessionError> {
        let targets = self.grid_targets()?;
        Ok(merge_schedules(self.store(), &targets, category, day))
    }

    pub fn merged_monthly(&self) -> Result<MergedGrid<f64>, SessionError> {
        let targets = self.grid_targets()?;
        Ok(merge_monthly(self.store(), &targets))
    }

    // Schedule fetches

    /// Tickets for every id whose schedule is neither loaded nor in flight.
    pub fn request_schedules<'a>(&mut self, ids: impl IntoIterator<Item = &'a EntityId>) -> Vec<FetchTicket> {
        let store = self.state.store();
        self.fetches
            .request(ids, |id| store.has_schedule(id.as_str()))
    }

    /// Settle a fetch. Results from before the last discard are dropped.
    pub fn complete_fetch<E: Display>(
        &mut self,
        ticket: FetchTicket,
        result: Result<Schedule, E>,
    ) -> FetchCompletion {
        if !self.fetches.is_current(&ticket) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                entity = %ticket.entity,
                ticket_epoch = ticket.epoch,
                epoch = self.fetches.epoch(),
                "dropping stale schedule fetch"
            );
            return FetchCompletion {
                entity: ticket.entity,
                outcome: FetchOutcome::Stale,
                replayed: Vec::new(),
            };
        }
        let outcome = match result {
            _ if !self.state.contains_entity(ticket.entity.as_str()) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(entity = %ticket.entity, "dropping schedule fetch of a deleted entity");
                self.fetches.settle(&ticket, None);
                FetchOutcome::Orphaned
            }
            Ok(schedule) => {
                self.fetches.settle(&ticket, None);
                self.state.load_schedule(ticket.entity.clone(), schedule);
                FetchOutcome::Loaded
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(entity = %ticket.entity, error = %err, "schedule fetch failed");
                self.fetches.settle(&ticket, Some(err.to_string()));
                FetchOutcome::Failed
            }
        };
        let replayed = if self.fetches.is_idle() {
            self.replay_queued()
        } else {
            Vec::new()
        };
        FetchCompletion {
            entity: ticket.entity,
            outcome,
            replayed,
        }
    }

    /// Request and complete fetches for `ids` against `backend`.
    pub fn fetch_schedules<'a, B: ScenarioBackend>(
        &mut self,
        backend: &mut B,
        ids: impl IntoIterator<Item = &'a EntityId>,
    ) -> Vec<FetchCompletion> {
        let tickets = self.request_schedules(ids);
        tickets
            .into_iter()
            .map(|ticket| {
                let result = backend.fetch_schedule(&ticket.entity);
                self.complete_fetch(ticket, result)
            })
            .collect()
    }

    /// Fetch whatever the current selection is missing.
    pub fn load_selection<B: ScenarioBackend>(&mut self, backend: &mut B) -> Vec<FetchCompletion> {
        let selected = self.state.selection().to_vec();
        self.fetch_schedules(backend, &selected)
    }

    // Save

    /// Start a save. Edits are refused until [`Self::finish_save`].
    pub fn begin_save(&mut self) -> Result<(SaveTicket, SavePayload), SessionError> {
        self.ensure_healthy()?;
        if self.save.is_some() {
            return Err(SessionError::SaveInFlight);
        }
        self.next_save_id += 1;
        let ticket = SaveTicket {
            id: self.next_save_id,
            epoch: self.fetches.epoch(),
        };
        self.save = Some(PendingSave {
            ticket: ticket.clone(),
            started_at: Utc::now(),
            summary: self.state.tracker().summary(),
        });
        Ok((ticket, SavePayload::from_store(self.store())))
    }

    /// Settle a save. Success clears the change set; failure keeps it.
    pub fn finish_save<E>(&mut self, ticket: SaveTicket, result: Result<(), E>) -> Result<SaveReceipt, SessionError>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.settle_save(ticket, result.map_err(|e| SessionError::from_backend("backend", e)))
    }

    pub fn save<B: ScenarioBackend>(&mut self, backend: &mut B) -> Result<SaveReceipt, SessionError> {
        let (ticket, payload) = self.begin_save()?;
        let name = backend.name();
        let result = backend
            .save(&payload)
            .map_err(|e| SessionError::from_backend(name, e));
        self.settle_save(ticket, result)
    }

    fn settle_save(&mut self, ticket: SaveTicket, result: Result<(), SessionError>) -> Result<SaveReceipt, SessionError> {
        match &self.save {
            Some(pending) if pending.ticket == ticket => {}
            _ => return Err(SessionError::NoSaveInFlight),
        }
        let Some(pending) = self.save.take() else {
            return Err(SessionError::NoSaveInFlight);
        };
        if let Err(err) = result {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "save failed; pending changes kept");
            return Err(err);
        }
        self.state.commit_saved();
        let receipt = SaveReceipt {
            started_at: pending.started_at,
            saved_at: Utc::now(),
            summary: pending.summary,
        };
        self.last_save = Some(receipt.clone());
        #[cfg(feature = "tracing")]
        tracing::debug!(
            fields = receipt.summary.updated_fields,
            deleted = receipt.summary.deleted_entities,
            "scenario saved"
        );
        Ok(receipt)
    }

    // Discard

    /// Replace the store with the authoritative dataset and drop every
    /// pending change, queued edit and outstanding fetch.
    pub fn discard<B: ScenarioBackend>(&mut self, backend: &mut B) -> Result<DiscardReport, SessionError> {
        if self.save.is_some() {
            return Err(SessionError::SaveInFlight);
        }
        let layout = &self.config.layout;
        let refetch = self
            .state
            .tracker()
            .entities_with_updates(&layout.schedules_table);
        let base = backend
            .fetch_base()
            .map_err(|e| SessionError::from_backend(backend.name(), e))?;

        // Schedules without pending edits are still the baseline.
        let base_ids = base.tables.get(&layout.base_table);
        let mut schedules: BTreeMap<EntityId, Schedule> = self
            .store()
            .schedules()
            .iter()
            .filter(|(id, _)| !refetch.contains(id))
            .filter(|(id, _)| base_ids.is_some_and(|t| t.contains(id.as_str())))
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect();
        let mut failed = Vec::new();
        for id in &refetch {
            match backend.fetch_schedule(id) {
                Ok(schedule) => {
                    schedules.insert(id.clone(), schedule);
                }
                Err(err) => failed.push((id.clone(), err.to_string())),
            }
        }

        let store = base.into_store(schedules, self.store().columns().clone());
        if self.config.verify_on_load {
            if let Err(violation) = verify_consistency(&store, layout) {
                self.poisoned = Some(violation.clone());
                return Err(SessionError::Consistency(violation));
            }
        }

        let discarded = self.state.tracker().summary();
        self.state.replace_store(store);
        let epoch = self.fetches.invalidate();
        self.queued.clear();
        self.poisoned = None;
        let failed_ids = failed.iter().map(|(id, _)| id.clone()).collect();
        for (id, message) in failed {
            self.fetches.record_error(id, message);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            epoch,
            refetched = refetch.len(),
            "discarded pending changes"
        );
        Ok(DiscardReport {
            epoch,
            discarded,
            refetched: refetch,
            failed: failed_ids,
        })
    }

    // Navigation guard

    /// Ask before leaving the editor. `confirm` is only called when there is
    /// something to lose; the return value says whether to proceed.
    pub fn request_navigation(&self, confirm: impl FnOnce(&ChangeSummary) -> bool) -> bool {
        if !self.has_pending_changes() {
            return true;
        }
        confirm(&self.state.tracker().summary())
    }

    // Internals

    fn ensure_healthy(&self) -> Result<(), SessionError> {
        match &self.poisoned {
            Some(violation) => Err(SessionError::Poisoned(violation.clone())),
            None => Ok(()),
        }
    }

    /// Entities a grid read may use, honoring the selection policy.
    fn grid_targets(&self) -> Result<Vec<EntityId>, SessionError> {
        let selected = self.state.selection().to_vec();
        let loading = self.fetches.in_flight_among(&selected);
        if !loading.is_empty() {
            return Err(SessionError::SchedulesLoading(loading));
        }
        self.apply_policy(selected)
    }

    fn apply_policy(&self, mut targets: Vec<EntityId>) -> Result<Vec<EntityId>, SessionError> {
        let failed = self.fetches.failed_among(&targets);
        if failed.is_empty() {
            return Ok(targets);
        }
        match self.config.selection_policy {
            SelectionPolicy::RequireAll => Err(SessionError::ScheduleFetchFailed(failed)),
            SelectionPolicy::ExcludeFailed => {
                targets.retain(|id| !failed.contains(id));
                Ok(targets)
            }
        }
    }

    fn apply_schedule_edit(&mut self, targets: Vec<EntityId>, edit: ScheduleEdit) -> Result<ActionOutcome, SessionError> {
        let targets = self.apply_policy(targets)?;
        let result = match edit {
            ScheduleEdit::Hourly {
                category,
                day,
                index,
                value,
            } => self
                .state
                .edit_schedule_for(&targets, &category, &day, index, value),
            ScheduleEdit::Monthly { index, value } => self.state.edit_monthly_for(&targets, index, value),
        };
        self.check_fatal(result.map(ActionOutcome::ScheduleEdited))
    }

    fn replay_queued(&mut self) -> Vec<Result<ActionOutcome, SessionError>> {
        let epoch = self.fetches.epoch();
        let queued = std::mem::take(&mut self.queued);
        queued
            .into_iter()
            .filter(|edit| edit.epoch == epoch)
            .map(|QueuedEdit { mut targets, edit, .. }| {
                self.ensure_healthy()?;
                if self.save.is_some() {
                    return Err(SessionError::EditsBlocked);
                }
                targets.retain(|id| self.state.contains_entity(id.as_str()));
                self.apply_schedule_edit(targets, edit)
            })
            .collect()
    }

    fn check_fatal(&mut self, result: Result<ActionOutcome, EngineError>) -> Result<ActionOutcome, SessionError> {
        result.map_err(|err| {
            if let EngineError::Sync(SyncError::Consistency(violation)) = &err {
                #[cfg(feature = "tracing")]
                tracing::warn!(%violation, "consistency violation; session poisoned");
                self.poisoned = Some(violation.clone());
            }
            SessionError::Engine(err)
        })
    }
}
