//! Multi-view synchronization: one accepted edit or delete, propagated into
//! the table row, the mirrored feature, the schedules and the tracker.
//!
//! Every mutation runs in two passes. The staging pass performs all checks
//! that can fail (coercion, lookups, table/feature pairing) without touching
//! anything. The commit pass cannot fail, so callers never observe a table
//! updated without its feature or the other way round.

use scenedit_common::{EntityId, PropertyValue};
use smallvec::SmallVec;

use crate::error::{ConsistencyViolation, SyncError};
use crate::layout::{DatasetLayout, EntityKind};
use crate::store::CanonicalStore;
use crate::tracker::{ChangeTracker, DiffOutcome};

/// Tally of what one update did across the selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub created: usize,
    pub updated: usize,
    pub cancelled: usize,
    pub unchanged: usize,
    pub features_touched: usize,
}

impl UpdateReport {
    fn tally(&mut self, outcome: DiffOutcome) {
        match outcome {
            DiffOutcome::Created => self.created += 1,
            DiffOutcome::Updated => self.updated += 1,
            DiffOutcome::Cancelled => self.cancelled += 1,
            DiffOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub kind: EntityKind,
    /// Table/layer the deletion was recorded under.
    pub layer: String,
    pub entities: Vec<EntityId>,
    pub rows_removed: usize,
    pub features_removed: usize,
    pub schedules_removed: usize,
    /// Pending updates discarded because their entity is gone.
    pub dropped_fields: usize,
}

struct StagedRow {
    entity: EntityId,
    feature: Option<usize>,
}

/// Apply `updates` to every entity of `entities` in `table`.
pub fn apply_update(
    store: &mut CanonicalStore,
    tracker: &mut ChangeTracker,
    layout: &DatasetLayout,
    table: &str,
    entities: &[EntityId],
    updates: &[(String, PropertyValue)],
) -> Result<UpdateReport, SyncError> {
    // Stage
    let Some(rows) = store.table(table) else {
        return Err(SyncError::UnknownTable(table.to_string()));
    };
    let mut coerced = Vec::with_capacity(updates.len());
    for (property, value) in updates {
        if *property == layout.id_property || *property == layout.reference_property {
            return Err(SyncError::ImmutableProperty {
                property: property.clone(),
            });
        }
        let value = store.columns().coerce(table, property, value.clone())?;
        coerced.push((property.as_str(), value));
    }

    let collection = layout.geometry_of(table);
    let mut staged = Vec::with_capacity(entities.len());
    for entity in entities {
        if !rows.contains(entity.as_str()) {
            return Err(SyncError::UnknownEntity {
                table: table.to_string(),
                entity: entity.clone(),
            });
        }
        let feature = match collection {
            Some(name) => {
                let fc = store.features(name).ok_or_else(|| ConsistencyViolation {
                    table: table.to_string(),
                    collection: name.to_string(),
                    entity: entity.clone(),
                    detail: "feature collection is missing".to_string(),
                })?;
                let pos = fc
                    .position(&layout.id_property, entity.as_str())
                    .ok_or_else(|| ConsistencyViolation {
                        table: table.to_string(),
                        collection: name.to_string(),
                        entity: entity.clone(),
                        detail: "row has no matching feature".to_string(),
                    })?;
                Some(pos)
            }
            None => None,
        };
        staged.push(StagedRow {
            entity: entity.clone(),
            feature,
        });
    }

    // Commit
    let mut report = UpdateReport::default();
    if staged.is_empty() || coerced.is_empty() {
        return Ok(report);
    }
    tracker.begin_group(format!("update {table} x{}", staged.len()));
    let reference = layout.reference_property.as_str();
    let stamp = PropertyValue::from(layout.user_reference.as_str());
    let (rows, mut features) = store.table_and_features_mut(table, collection);
    let Some(rows) = rows else {
        tracker.end_group();
        return Err(SyncError::UnknownTable(table.to_string()));
    };
    for StagedRow { entity, feature } in &staged {
        let Some(row) = rows.get_mut(entity.as_str()) else {
            continue;
        };
        for (property, value) in &coerced {
            let baseline = row.get(*property).cloned().unwrap_or_default();
            report.tally(tracker.record_update(table, entity, property, &baseline, value));
            row.insert((*property).to_string(), value.clone());
        }
        // A row is stamped while it has a live diff; once its last diff
        // cancels it gets its original provenance back.
        let provenance = match row.get(reference) {
            Some(current) if tracker.has_updates(table, entity.as_str()) => {
                tracker.remember_provenance(table, entity, current);
                Some(stamp.clone())
            }
            Some(_) => tracker.restore_provenance(table, entity.as_str()),
            None => None,
        };
        if let Some(provenance) = &provenance {
            row.insert(reference.to_string(), provenance.clone());
        }

        if let (Some(idx), Some(fc)) = (feature, features.as_deref_mut()) {
            let props = &mut fc.features[*idx].properties;
            for (property, value) in &coerced {
                props.insert((*property).to_string(), value.clone());
            }
            if let Some(provenance) = provenance {
                if props.contains_key(reference) {
                    props.insert(reference.to_string(), provenance);
                }
            }
            report.features_touched += 1;
        }
    }
    tracker.end_group();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        table,
        entities = staged.len(),
        created = report.created,
        cancelled = report.cancelled,
        "applied property update"
    );
    debug_assert!(
        verify_entities(store, layout, table, entities).is_ok(),
        "dual write left `{table}` out of sync with its features"
    );
    Ok(report)
}

/// Delete `entities`. The kind of the first entity decides the fan-out.
pub fn apply_delete(
    store: &mut CanonicalStore,
    tracker: &mut ChangeTracker,
    layout: &DatasetLayout,
    entities: &[EntityId],
) -> Result<Option<DeleteReport>, SyncError> {
    let Some(first) = entities.first() else {
        return Ok(None);
    };

    // Stage
    let Some((owner, kind)) = layout.classify(store, first.as_str()) else {
        return Err(SyncError::UnknownEntity {
            table: layout.base_table.clone(),
            entity: first.clone(),
        });
    };
    let owner = owner.to_string();
    let affected: SmallVec<[String; 8]> = match kind {
        EntityKind::Structural => store
            .table_names()
            .filter(|name| {
                !layout.is_derived(name) && layout.kind_of_table(name) == EntityKind::Structural
            })
            .map(str::to_string)
            .collect(),
        EntityKind::Peripheral => SmallVec::from_iter([owner.clone()]),
    };
    for entity in entities {
        let present = affected
            .iter()
            .any(|t| store.table(t).is_some_and(|rows| rows.contains(entity.as_str())));
        if !present {
            return Err(SyncError::UnknownEntity {
                table: owner.clone(),
                entity: entity.clone(),
            });
        }
        for table in &affected {
            check_pair(store, layout, table, entity)?;
        }
    }
    let layer = match kind {
        EntityKind::Structural => layout.base_table.clone(),
        EntityKind::Peripheral => owner,
    };

    // Commit
    let mut report = DeleteReport {
        kind,
        layer: layer.clone(),
        entities: entities.to_vec(),
        rows_removed: 0,
        features_removed: 0,
        schedules_removed: 0,
        dropped_fields: 0,
    };
    tracker.begin_group(format!("delete {layer} x{}", entities.len()));
    for table in &affected {
        if let Some(rows) = store.tables_mut().get_mut(table.as_str()) {
            for entity in entities {
                if rows.remove(entity.as_str()).is_some() {
                    report.rows_removed += 1;
                }
            }
        }
        if let Some(collection) = layout.geometry_of(table) {
            if let Some(fc) = store.geojsons_mut().get_mut(collection) {
                report.features_removed += fc.remove_entities(&layout.id_property, entities);
            }
        }
    }
    if kind == EntityKind::Structural {
        for entity in entities {
            if store.remove_schedule(entity.as_str()).is_some() {
                report.schedules_removed += 1;
            }
        }
    }
    report.dropped_fields = tracker.record_delete(entities, &layer);
    tracker.end_group();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        layer = %report.layer,
        entities = report.entities.len(),
        rows = report.rows_removed,
        features = report.features_removed,
        "applied delete"
    );
    Ok(Some(report))
}

/// Row and feature for `entity` must exist together or not at all.
fn check_pair(
    store: &CanonicalStore,
    layout: &DatasetLayout,
    table: &str,
    entity: &EntityId,
) -> Result<(), ConsistencyViolation> {
    let Some(collection) = layout.geometry_of(table) else {
        return Ok(());
    };
    let has_row = store.table(table).is_some_and(|t| t.contains(entity.as_str()));
    let has_feature = store
        .features(collection)
        .is_some_and(|fc| fc.position(&layout.id_property, entity.as_str()).is_some());
    if has_row == has_feature {
        return Ok(());
    }
    Err(ConsistencyViolation {
        table: table.to_string(),
        collection: collection.to_string(),
        entity: entity.clone(),
        detail: if has_row {
            "row has no matching feature".to_string()
        } else {
            "feature has no matching row".to_string()
        },
    })
}

/// Check that every listed entity's row and feature agree on all
/// overlapping properties.
pub fn verify_entities(
    store: &CanonicalStore,
    layout: &DatasetLayout,
    table: &str,
    entities: &[EntityId],
) -> Result<(), ConsistencyViolation> {
    let Some(collection) = layout.geometry_of(table) else {
        return Ok(());
    };
    for entity in entities {
        check_pair(store, layout, table, entity)?;
        let row = store.table(table).and_then(|t| t.get(entity.as_str()));
        let feature = store
            .features(collection)
            .and_then(|fc| fc.feature(&layout.id_property, entity.as_str()));
        let (Some(row), Some(feature)) = (row, feature) else {
            continue;
        };
        for (property, value) in &feature.properties {
            if let Some(row_value) = row.get(property) {
                if row_value != value {
                    return Err(ConsistencyViolation {
                        table: table.to_string(),
                        collection: collection.to_string(),
                        entity: entity.clone(),
                        detail: format!("`{property}` is {row_value} in the table, {value} in the feature"),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Walk every geometry-backed table and report the first row/feature pair
/// that disagrees.
pub fn verify_consistency(
    store: &CanonicalStore,
    layout: &DatasetLayout,
) -> Result<(), ConsistencyViolation> {
    for (table, collection) in layout.geometry_tables() {
        let rows = store.table(table);
        let fc = store.features(collection);
        let row_ids: Vec<EntityId> = rows.map(|t| t.ids().cloned().collect()).unwrap_or_default();
        verify_entities(store, layout, table, &row_ids)?;
        if let Some(fc) = fc {
            for feature in &fc.features {
                let id = match feature.properties.get(&layout.id_property) {
                    Some(PropertyValue::Null) | None => None,
                    Some(PropertyValue::Text(s)) => Some(s.clone()),
                    Some(other) => Some(other.to_string()),
                };
                let Some(id) = id else {
                    return Err(ConsistencyViolation {
                        table: table.to_string(),
                        collection: collection.to_string(),
                        entity: EntityId::from(""),
                        detail: format!("feature without `{}`", layout.id_property),
                    });
                };
                if !rows.is_some_and(|t| t.contains(&id)) {
                    return Err(ConsistencyViolation {
                        table: table.to_string(),
                        collection: collection.to_string(),
                        entity: EntityId::from(id),
                        detail: "feature has no matching row".to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}
