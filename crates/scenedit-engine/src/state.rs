//! `EditorState` owns everything the editing views share and is the only
//! way to mutate it: callers build an [`Action`] and [`EditorState::dispatch`]
//! it. Nothing here performs I/O.

use scenedit_common::{EntityId, PropertyValue};

use crate::change_set::ChangeSet;
use crate::error::EngineError;
use crate::layout::DatasetLayout;
use crate::schedule::{self, MergedGrid, ScheduleEditReport};
use crate::selection::Selection;
use crate::store::{CanonicalStore, Schedule};
use crate::sync::{self, DeleteReport, UpdateReport};
use crate::tracker::ChangeTracker;

/// A user-level mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Set properties on entities of a table. With `entities: None` the
    /// current selection in the active layer is used.
    UpdateProperties {
        table: Option<String>,
        entities: Option<Vec<EntityId>>,
        updates: Vec<(String, PropertyValue)>,
    },
    DeleteEntities(Vec<EntityId>),
    DeleteSelection,
    /// Edit one hourly cell of the comparison grid for the selection.
    EditSchedule {
        category: String,
        day: String,
        index: usize,
        value: PropertyValue,
    },
    EditMonthly {
        index: usize,
        value: f64,
    },
    Select(Vec<EntityId>),
    Toggle(EntityId),
    /// Select every entity of the active layer.
    SelectAll,
    ClearSelection,
    SetActiveLayer(Option<String>),
}

impl Action {
    pub fn update<E, K, V>(
        table: impl Into<String>,
        entities: impl IntoIterator<Item = E>,
        updates: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        E: Into<EntityId>,
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        Action::UpdateProperties {
            table: Some(table.into()),
            entities: Some(entities.into_iter().map(Into::into).collect()),
            updates: updates
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Whether the action mutates the store or change set.
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Action::UpdateProperties { .. }
                | Action::DeleteEntities(_)
                | Action::DeleteSelection
                | Action::EditSchedule { .. }
                | Action::EditMonthly { .. }
        )
    }

    pub fn is_schedule_edit(&self) -> bool {
        matches!(self, Action::EditSchedule { .. } | Action::EditMonthly { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Updated(UpdateReport),
    Deleted(DeleteReport),
    ScheduleEdited(ScheduleEditReport),
    /// Selection actions and empty deletes.
    SelectionChanged { selected: usize },
    Noop,
}

#[derive(Debug)]
pub struct EditorState {
    store: CanonicalStore,
    tracker: ChangeTracker,
    selection: Selection,
    layout: DatasetLayout,
}

impl EditorState {
    pub fn new(store: CanonicalStore, layout: DatasetLayout) -> Self {
        let selection = Selection::for_layer(layout.base_table.clone());
        Self {
            store,
            tracker: ChangeTracker::new(),
            selection,
            layout,
        }
    }

    pub fn store(&self) -> &CanonicalStore {
        &self.store
    }

    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    pub fn change_set(&self) -> &ChangeSet {
        self.tracker.change_set()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    pub fn has_pending_changes(&self) -> bool {
        self.tracker.has_pending_changes()
    }

    /// Whether `id` still has a row in some table of the layout.
    pub fn contains_entity(&self, id: &str) -> bool {
        self.layout.classify(&self.store, id).is_some()
    }

    /// Comparison grid for the current selection.
    pub fn merged_schedule(&self, category: &str, day: &str) -> MergedGrid<PropertyValue> {
        schedule::merge_schedules(&self.store, &self.selection.to_vec(), category, day)
    }

    pub fn merged_monthly(&self) -> MergedGrid<f64> {
        schedule::merge_monthly(&self.store, &self.selection.to_vec())
    }

    /// Insert a fetched schedule. Loading is not an edit and is not tracked.
    pub fn load_schedule(&mut self, id: EntityId, schedule: Schedule) {
        self.store.set_schedule(id, schedule);
    }

    pub fn dispatch(&mut self, action: Action) -> Result<ActionOutcome, EngineError> {
        match action {
            Action::UpdateProperties {
                table,
                entities,
                updates,
            } => {
                let table = match table {
                    Some(t) => t,
                    None => self.active_layer()?.to_string(),
                };
                let entities = entities.unwrap_or_else(|| self.selection.to_vec());
                let report = sync::apply_update(
                    &mut self.store,
                    &mut self.tracker,
                    &self.layout,
                    &table,
                    &entities,
                    &updates,
                )?;
                Ok(ActionOutcome::Updated(report))
            }
            Action::DeleteEntities(ids) => self.delete(&ids),
            Action::DeleteSelection => {
                let ids = self.selection.to_vec();
                self.delete(&ids)
            }
            Action::EditSchedule {
                category,
                day,
                index,
                value,
            } => {
                let ids = self.selection.to_vec();
                let report = self.edit_schedule_for(&ids, &category, &day, index, value)?;
                Ok(ActionOutcome::ScheduleEdited(report))
            }
            Action::EditMonthly { index, value } => {
                let ids = self.selection.to_vec();
                let report = self.edit_monthly_for(&ids, index, value)?;
                Ok(ActionOutcome::ScheduleEdited(report))
            }
            Action::Select(ids) => {
                self.selection.select(ids);
                Ok(self.selection_changed())
            }
            Action::Toggle(id) => {
                self.selection.toggle(id);
                Ok(self.selection_changed())
            }
            Action::SelectAll => {
                let layer = self.active_layer()?;
                let ids: Vec<EntityId> = self
                    .store
                    .table(layer)
                    .map(|t| t.ids().cloned().collect())
                    .unwrap_or_default();
                self.selection.select_all(ids);
                Ok(self.selection_changed())
            }
            Action::ClearSelection => {
                self.selection.clear();
                Ok(self.selection_changed())
            }
            Action::SetActiveLayer(layer) => {
                self.selection.set_active_layer(layer);
                Ok(self.selection_changed())
            }
        }
    }

    /// Grid edit against an explicit entity set rather than the selection.
    pub fn edit_schedule_for(
        &mut self,
        entities: &[EntityId],
        category: &str,
        day: &str,
        index: usize,
        value: PropertyValue,
    ) -> Result<ScheduleEditReport, EngineError> {
        Ok(schedule::apply_schedule_edit(
            &mut self.store,
            &mut self.tracker,
            &self.layout,
            entities,
            category,
            day,
            index,
            value,
        )?)
    }

    pub fn edit_monthly_for(
        &mut self,
        entities: &[EntityId],
        index: usize,
        value: f64,
    ) -> Result<ScheduleEditReport, EngineError> {
        Ok(schedule::apply_monthly_edit(
            &mut self.store,
            &mut self.tracker,
            &self.layout,
            entities,
            index,
            value,
        )?)
    }

    /// Swap in a freshly fetched dataset. Pending changes and the selection
    /// are dropped; the active layer is kept.
    pub fn replace_store(&mut self, store: CanonicalStore) {
        self.store = store;
        self.tracker.reset();
        self.selection.clear();
    }

    /// The store was persisted; nothing is pending any more.
    pub fn commit_saved(&mut self) {
        self.tracker.reset();
    }

    pub fn set_log_enabled(&mut self, enabled: bool) {
        self.tracker.set_log_enabled(enabled);
    }

    pub fn into_store(self) -> CanonicalStore {
        self.store
    }

    fn active_layer(&self) -> Result<&str, EngineError> {
        self.selection
            .active_layer()
            .ok_or(EngineError::NoActiveLayer)
    }

    fn delete(&mut self, ids: &[EntityId]) -> Result<ActionOutcome, EngineError> {
        let report = sync::apply_delete(&mut self.store, &mut self.tracker, &self.layout, ids)?;
        let Some(report) = report else {
            return Ok(ActionOutcome::Noop);
        };
        self.selection.retain(|id| !report.entities.contains(id));
        Ok(ActionOutcome::Deleted(report))
    }

    fn selection_changed(&self) -> ActionOutcome {
        ActionOutcome::SelectionChanged {
            selected: self.selection.len(),
        }
    }
}
