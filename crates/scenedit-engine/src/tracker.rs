//! The change tracker: the only component that decides whether a field is
//! dirty.
//!
//! Every operation here is pure bookkeeping over the [`ChangeSet`]; nothing
//! performs I/O and nothing can fail. Values are expected to be validated
//! before they get here.

use std::collections::BTreeMap;

use scenedit_common::{EntityId, PropertyValue};

use crate::change_log::{ChangeEvent, ChangeLog};
use crate::change_set::{ChangeSet, ChangeSummary, FieldDiff};
use crate::path::{ensure_path, prune_entity, prune_path};

/// What [`ChangeTracker::record_update`] did with an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOutcome {
    /// The field diverged from baseline for the first time.
    Created,
    /// The field was already dirty; only its new value changed.
    Updated,
    /// The field returned to its baseline; the entry is gone.
    Cancelled,
    /// Nothing to record.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct ChangeTracker {
    changes: ChangeSet,
    log: ChangeLog,
    /// Provenance each stamped row had before its first live edit, keyed by
    /// table then entity. Not part of the ChangeSet.
    provenance: BTreeMap<String, BTreeMap<EntityId, PropertyValue>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit of `table.entity.property` from `baseline` to `new`.
    ///
    /// `baseline` is only consulted when no entry exists yet. Once an entry
    /// exists, its stored `old_value` is the reference: reaching it again
    /// cancels the entry, anything else overwrites `new_value` only. The
    /// stored `old_value` is therefore always the pre-edit baseline however
    /// many times the field is edited.
    pub fn record_update(
        &mut self,
        table: &str,
        entity: &EntityId,
        property: &str,
        baseline: &PropertyValue,
        new: &PropertyValue,
    ) -> DiffOutcome {
        if let Some(existing) = self.changes.entry(table, entity.as_str(), property) {
            if *new == existing.old_value {
                prune_path(&mut self.changes.update, table, entity.as_str(), property);
                self.log.record(ChangeEvent::FieldCancelled {
                    table: table.to_string(),
                    entity: entity.clone(),
                    property: property.to_string(),
                });
                return DiffOutcome::Cancelled;
            }
            if *new == existing.new_value {
                return DiffOutcome::Unchanged;
            }
            let previous = existing.new_value.clone();
            if let Some(diff) = ensure_path(&mut self.changes.update, table, entity).get_mut(property)
            {
                diff.new_value = new.clone();
            }
            self.log.record(ChangeEvent::FieldUpdated {
                table: table.to_string(),
                entity: entity.clone(),
                property: property.to_string(),
                previous,
                new: new.clone(),
            });
            return DiffOutcome::Updated;
        }

        if new == baseline {
            return DiffOutcome::Unchanged;
        }
        ensure_path(&mut self.changes.update, table, entity).insert(
            property.to_string(),
            FieldDiff {
                old_value: baseline.clone(),
                new_value: new.clone(),
            },
        );
        self.log.record(ChangeEvent::FieldRecorded {
            table: table.to_string(),
            entity: entity.clone(),
            property: property.to_string(),
            old: baseline.clone(),
            new: new.clone(),
        });
        DiffOutcome::Created
    }

    /// Mark `entities` deleted under `layer` and drop every pending update
    /// they have, in every table. Returns the number of dropped fields.
    pub fn record_delete(&mut self, entities: &[EntityId], layer: &str) -> usize {
        if entities.is_empty() {
            return 0;
        }
        let deleted = self.changes.delete.entry(layer.to_string()).or_default();
        deleted.extend(entities.iter().cloned());

        for rows in self.provenance.values_mut() {
            for entity in entities {
                rows.remove(entity);
            }
        }
        self.provenance.retain(|_, rows| !rows.is_empty());

        let tables: Vec<String> = self.changes.update.keys().cloned().collect();
        let mut dropped = 0;
        for table in &tables {
            for entity in entities {
                dropped += prune_entity(&mut self.changes.update, table, entity.as_str());
            }
        }
        self.log.record(ChangeEvent::EntitiesDeleted {
            layer: layer.to_string(),
            entities: entities.to_vec(),
            dropped_fields: dropped,
        });
        dropped
    }

    /// Clear both the update and delete sets.
    pub fn reset(&mut self) {
        self.changes = ChangeSet::new();
        self.provenance.clear();
        self.log.clear();
        self.log.record(ChangeEvent::Reset);
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    pub fn change_set(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn entry(&self, table: &str, entity: &str, property: &str) -> Option<&FieldDiff> {
        self.changes.entry(table, entity, property)
    }

    /// True when `table.entity` has at least one live field diff.
    pub fn has_updates(&self, table: &str, entity: &str) -> bool {
        self.changes
            .update
            .get(table)
            .is_some_and(|entities| entities.contains_key(entity))
    }

    /// Keep `current` as the row's original provenance unless one is
    /// already remembered.
    pub(crate) fn remember_provenance(
        &mut self,
        table: &str,
        entity: &EntityId,
        current: &PropertyValue,
    ) {
        self.provenance
            .entry(table.to_string())
            .or_default()
            .entry(entity.clone())
            .or_insert_with(|| current.clone());
    }

    /// Hand back the original provenance of a row whose last diff is gone.
    pub(crate) fn restore_provenance(
        &mut self,
        table: &str,
        entity: &str,
    ) -> Option<PropertyValue> {
        let rows = self.provenance.get_mut(table)?;
        let original = rows.remove(entity);
        if rows.is_empty() {
            self.provenance.remove(table);
        }
        original
    }

    /// Entities with at least one pending update in `table`.
    pub fn entities_with_updates(&self, table: &str) -> Vec<EntityId> {
        self.changes
            .update
            .get(table)
            .map(|entities| entities.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn summary(&self) -> ChangeSummary {
        self.changes.summary()
    }

    pub fn log(&self) -> &ChangeLog {
        &self.log
    }

    pub fn set_log_enabled(&mut self, enabled: bool) {
        self.log.set_enabled(enabled);
    }

    /// Group the diffs of one user action in the audit log.
    pub(crate) fn begin_group(&mut self, description: impl Into<String>) {
        self.log.begin_compound(description.into());
    }

    pub(crate) fn end_group(&mut self) {
        self.log.end_compound();
    }
}
