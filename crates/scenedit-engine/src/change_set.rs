//! The in-memory record of pending, unsaved edits and deletions.

use std::collections::BTreeMap;

use indexmap::IndexSet;
use scenedit_common::{EntityId, PropertyValue};
use serde::{Deserialize, Serialize};

/// A tracked field: the baseline it started from and what it is now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    pub old_value: PropertyValue,
    pub new_value: PropertyValue,
}

/// property → diff
pub type EntityUpdates = BTreeMap<String, FieldDiff>;
/// entity → property → diff
pub type TableUpdates = BTreeMap<EntityId, EntityUpdates>;
/// table → entity → property → diff
pub type UpdateMap = BTreeMap<String, TableUpdates>;
/// table/layer → deleted entities, in deletion order
pub type DeleteMap = BTreeMap<String, IndexSet<EntityId>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default)]
    pub update: UpdateMap,
    #[serde(default)]
    pub delete: DeleteMap,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.update.is_empty() && self.delete.is_empty()
    }

    pub fn entry(&self, table: &str, entity: &str, property: &str) -> Option<&FieldDiff> {
        self.update
            .get(table)
            .and_then(|t| t.get(entity))
            .and_then(|e| e.get(property))
    }

    pub fn is_deleted(&self, table: &str, entity: &str) -> bool {
        self.delete.get(table).is_some_and(|ids| ids.contains(entity))
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for entities in self.update.values() {
            summary.updated_tables += 1;
            summary.updated_entities += entities.len();
            summary.updated_fields += entities.values().map(BTreeMap::len).sum::<usize>();
        }
        summary.deleted_entities = self.delete.values().map(IndexSet::len).sum();
        summary
    }
}

/// Counts shown next to the save/discard affordances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub updated_tables: usize,
    pub updated_entities: usize,
    pub updated_fields: usize,
    pub deleted_entities: usize,
}

impl ChangeSummary {
    pub fn is_empty(&self) -> bool {
        self.updated_fields == 0 && self.deleted_entities == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_diff_fields() {
        let mut cs = ChangeSet::new();
        cs.update
            .entry("zone".into())
            .or_default()
            .entry(EntityId::from("B1"))
            .or_default()
            .insert(
                "floors_ag".into(),
                FieldDiff {
                    old_value: PropertyValue::Int(3),
                    new_value: PropertyValue::Int(5),
                },
            );
        cs.delete
            .entry("trees".into())
            .or_default()
            .insert(EntityId::from("T1"));
        let v = serde_json::to_value(&cs).unwrap();
        assert_eq!(v["update"]["zone"]["B1"]["floors_ag"]["oldValue"], 3);
        assert_eq!(v["update"]["zone"]["B1"]["floors_ag"]["newValue"], 5);
        assert_eq!(v["delete"]["trees"][0], "T1");

        let summary = cs.summary();
        assert_eq!(summary.updated_fields, 1);
        assert_eq!(summary.deleted_entities, 1);
    }
}
