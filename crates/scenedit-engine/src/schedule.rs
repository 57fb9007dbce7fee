//! Comparison grids over several entities' schedules.
//!
//! Reading merges the selected entities' arrays into one grid of
//! [`GridCell`]s, where positions the entities disagree on become
//! [`GridCell::Conflict`]. Writing goes the other way: one grid edit is
//! disaggregated into a per-entity edit against each entity's own value.
//! A `GridCell` is never a `PropertyValue`, so a conflict marker cannot be
//! written into the store or the change set.

use std::fmt;
use std::str::FromStr;

use scenedit_common::{EntityId, PropertyValue};

use crate::error::ScheduleError;
use crate::layout::DatasetLayout;
use crate::store::{CanonicalStore, Schedule};
use crate::tracker::{ChangeTracker, DiffOutcome};

/// One position of a comparison grid.
#[derive(Debug, Clone, PartialEq)]
pub enum GridCell<T> {
    /// Every merged entity holds this value.
    Scalar(T),
    /// At least two merged entities disagree, or one lacks the position.
    Conflict,
}

impl<T> GridCell<T> {
    pub fn is_conflict(&self) -> bool {
        matches!(self, GridCell::Conflict)
    }

    pub fn scalar(&self) -> Option<&T> {
        match self {
            GridCell::Scalar(v) => Some(v),
            GridCell::Conflict => None,
        }
    }
}

impl<T: fmt::Display> fmt::Display for GridCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridCell::Scalar(v) => v.fmt(f),
            GridCell::Conflict => f.write_str("DIFF"),
        }
    }
}

/// Merge two partial grids. Conflict absorbs; a position present in only
/// one side is a conflict.
pub fn merge_cells<T: PartialEq + Clone>(a: &[GridCell<T>], b: &[GridCell<T>]) -> Vec<GridCell<T>> {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| match (a.get(i), b.get(i)) {
            (Some(GridCell::Scalar(x)), Some(GridCell::Scalar(y))) if x == y => {
                GridCell::Scalar(x.clone())
            }
            _ => GridCell::Conflict,
        })
        .collect()
}

/// Fold any number of arrays into one grid. The first array is copied; each
/// further array can only add conflicts. Order of the arrays does not affect
/// the result.
pub fn merge_arrays<'a, T, I>(arrays: I) -> Vec<GridCell<T>>
where
    T: PartialEq + Clone + 'a,
    I: IntoIterator<Item = &'a [T]>,
{
    let mut acc: Option<Vec<GridCell<T>>> = None;
    for values in arrays {
        let cells: Vec<GridCell<T>> = values.iter().cloned().map(GridCell::Scalar).collect();
        acc = Some(match acc {
            None => cells,
            Some(prev) => merge_cells(&prev, &cells),
        });
    }
    acc.unwrap_or_default()
}

/// Result of merging a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedGrid<T> {
    pub cells: Vec<GridCell<T>>,
    /// Entities that contributed, in selection order.
    pub merged: Vec<EntityId>,
    /// Entities skipped because their schedule (or this series) is not loaded.
    pub missing: Vec<EntityId>,
}

impl<T> MergedGrid<T> {
    pub fn conflicts(&self) -> usize {
        self.cells.iter().filter(|c| c.is_conflict()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Merge the `category/day` hourly arrays of `entities`.
pub fn merge_schedules(
    store: &CanonicalStore,
    entities: &[EntityId],
    category: &str,
    day: &str,
) -> MergedGrid<PropertyValue> {
    let mut merged = Vec::new();
    let mut missing = Vec::new();
    let mut arrays = Vec::new();
    for entity in entities {
        match store
            .schedule(entity.as_str())
            .and_then(|s| s.hours(category, day))
        {
            Some(hours) => {
                merged.push(entity.clone());
                arrays.push(hours);
            }
            None => missing.push(entity.clone()),
        }
    }
    MergedGrid {
        cells: merge_arrays(arrays),
        merged,
        missing,
    }
}

/// Merge the monthly multipliers of `entities`.
pub fn merge_monthly(store: &CanonicalStore, entities: &[EntityId]) -> MergedGrid<f64> {
    let mut merged = Vec::new();
    let mut missing = Vec::new();
    let mut arrays = Vec::new();
    for entity in entities {
        match store.schedule(entity.as_str()) {
            Some(s) => {
                merged.push(entity.clone());
                arrays.push(s.monthly_multiplier.as_slice());
            }
            None => missing.push(entity.clone()),
        }
    }
    MergedGrid {
        cells: merge_arrays(arrays),
        merged,
        missing,
    }
}

/// Where a schedule value lives, and the property key it is tracked under
/// in the schedules table of the change set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScheduleCoord {
    Hour {
        category: String,
        day: String,
        index: usize,
    },
    Monthly {
        index: usize,
    },
}

impl ScheduleCoord {
    pub fn hour(category: impl Into<String>, day: impl Into<String>, index: usize) -> Self {
        ScheduleCoord::Hour {
            category: category.into(),
            day: day.into(),
            index,
        }
    }

    pub fn monthly(index: usize) -> Self {
        ScheduleCoord::Monthly { index }
    }

    pub fn index(&self) -> usize {
        match self {
            ScheduleCoord::Hour { index, .. } | ScheduleCoord::Monthly { index } => *index,
        }
    }

    /// Current value at this coordinate, `None` when the series is absent.
    pub fn read(&self, schedule: &Schedule) -> Option<PropertyValue> {
        match self {
            ScheduleCoord::Hour {
                category,
                day,
                index,
            } => schedule
                .hours(category, day)
                .and_then(|h| h.get(*index))
                .cloned(),
            ScheduleCoord::Monthly { index } => schedule
                .monthly_multiplier
                .get(*index)
                .copied()
                .map(PropertyValue::Number),
        }
    }
}

impl fmt::Display for ScheduleCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleCoord::Hour {
                category,
                day,
                index,
            } => write!(f, "SCHEDULES/{category}/{day}/{index}"),
            ScheduleCoord::Monthly { index } => write!(f, "MONTHLY_MULTIPLIER/{index}"),
        }
    }
}

impl FromStr for ScheduleCoord {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidKey(s.to_string());
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            ["SCHEDULES", category, day, index] if !category.is_empty() && !day.is_empty() => {
                let index = index.parse().map_err(|_| invalid())?;
                Ok(ScheduleCoord::hour(*category, *day, index))
            }
            ["MONTHLY_MULTIPLIER", index] => {
                let index = index.parse().map_err(|_| invalid())?;
                Ok(ScheduleCoord::monthly(index))
            }
            _ => Err(invalid()),
        }
    }
}

/// Tally of one disaggregated grid edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleEditReport {
    /// Entities whose value was rewritten.
    pub written: Vec<EntityId>,
    /// Entities that already held the new value.
    pub untouched: Vec<EntityId>,
    pub created: usize,
    pub updated: usize,
    pub cancelled: usize,
}

/// Set `category/day[index]` to `new_value` on every entity of `entities`.
pub fn apply_schedule_edit(
    store: &mut CanonicalStore,
    tracker: &mut ChangeTracker,
    layout: &DatasetLayout,
    entities: &[EntityId],
    category: &str,
    day: &str,
    index: usize,
    new_value: PropertyValue,
) -> Result<ScheduleEditReport, ScheduleError> {
    if let PropertyValue::Number(n) = new_value {
        if !n.is_finite() {
            return Err(ScheduleError::NonFinite(n));
        }
    }
    apply_edit(
        store,
        tracker,
        layout,
        entities,
        ScheduleCoord::hour(category, day, index),
        new_value,
    )
}

/// Set `MONTHLY_MULTIPLIER[index]` to `new_value` on every entity.
pub fn apply_monthly_edit(
    store: &mut CanonicalStore,
    tracker: &mut ChangeTracker,
    layout: &DatasetLayout,
    entities: &[EntityId],
    index: usize,
    new_value: f64,
) -> Result<ScheduleEditReport, ScheduleError> {
    if !new_value.is_finite() {
        return Err(ScheduleError::NonFinite(new_value));
    }
    apply_edit(
        store,
        tracker,
        layout,
        entities,
        ScheduleCoord::monthly(index),
        PropertyValue::Number(new_value),
    )
}

fn apply_edit(
    store: &mut CanonicalStore,
    tracker: &mut ChangeTracker,
    layout: &DatasetLayout,
    entities: &[EntityId],
    coord: ScheduleCoord,
    new_value: PropertyValue,
) -> Result<ScheduleEditReport, ScheduleError> {
    let mut report = ScheduleEditReport::default();
    if entities.is_empty() {
        return Ok(report);
    }

    // Stage: every entity must be loaded and addressable before any write.
    let not_loaded: Vec<EntityId> = entities
        .iter()
        .filter(|e| !store.has_schedule(e.as_str()))
        .cloned()
        .collect();
    if !not_loaded.is_empty() {
        return Err(ScheduleError::NotLoaded(not_loaded));
    }
    let mut current = Vec::with_capacity(entities.len());
    for entity in entities {
        let schedule = store
            .schedule(entity.as_str())
            .ok_or_else(|| ScheduleError::NotLoaded(vec![entity.clone()]))?;
        let len = match &coord {
            ScheduleCoord::Hour { category, day, .. } => schedule
                .hours(category, day)
                .map(<[PropertyValue]>::len)
                .ok_or_else(|| ScheduleError::UnknownSeries {
                    entity: entity.clone(),
                    category: category.clone(),
                    day: day.clone(),
                })?,
            ScheduleCoord::Monthly { .. } => schedule.monthly_multiplier.len(),
        };
        let value = coord
            .read(schedule)
            .ok_or_else(|| ScheduleError::IndexOutOfRange {
                entity: entity.clone(),
                index: coord.index(),
                len,
            })?;
        current.push(value);
    }

    // Commit
    let key = coord.to_string();
    tracker.begin_group(format!("schedule edit {key} x{}", entities.len()));
    for (entity, baseline) in entities.iter().zip(current) {
        if baseline == new_value {
            report.untouched.push(entity.clone());
            continue;
        }
        let Some(schedule) = store.schedule_mut(entity.as_str()) else {
            continue;
        };
        write_value(schedule, &coord, &new_value);
        match tracker.record_update(&layout.schedules_table, entity, &key, &baseline, &new_value) {
            DiffOutcome::Created => report.created += 1,
            DiffOutcome::Updated => report.updated += 1,
            DiffOutcome::Cancelled => report.cancelled += 1,
            DiffOutcome::Unchanged => {}
        }
        report.written.push(entity.clone());
    }
    tracker.end_group();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        key = %key,
        written = report.written.len(),
        untouched = report.untouched.len(),
        "applied schedule edit"
    );
    Ok(report)
}

fn write_value(schedule: &mut Schedule, coord: &ScheduleCoord, value: &PropertyValue) {
    match coord {
        ScheduleCoord::Hour {
            category,
            day,
            index,
        } => {
            if let Some(slot) = schedule
                .hours_mut(category, day)
                .and_then(|h| h.get_mut(*index))
            {
                *slot = value.clone();
            }
        }
        ScheduleCoord::Monthly { index } => {
            if let (Some(slot), Some(n)) = (schedule.monthly_multiplier.get_mut(*index), value.as_f64())
            {
                *slot = n;
            }
        }
    }
}
