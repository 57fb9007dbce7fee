use super::common::*;
use crate::error::ScheduleError;
use crate::schedule::{
    GridCell, ScheduleCoord, apply_monthly_edit, apply_schedule_edit, merge_monthly,
    merge_schedules,
};
use crate::tracker::ChangeTracker;
use crate::PropertyValue;

#[test]
fn merged_grid_marks_disagreement() {
    let store = scenario();
    let grid = merge_schedules(&store, &ids(&["B1", "B2", "B3"]), "COOLING", "MON");
    assert_eq!(
        grid.cells,
        vec![
            GridCell::Scalar(PropertyValue::Int(1)),
            GridCell::Conflict,
            GridCell::Scalar(PropertyValue::Int(1)),
        ]
    );
    assert_eq!(grid.conflicts(), 1);
    assert!(grid.is_complete());
}

#[test]
fn unloaded_entities_are_excluded_from_merge() {
    let mut store = scenario();
    store.remove_schedule("B2");
    let grid = merge_schedules(&store, &ids(&["B1", "B2", "B3"]), "COOLING", "MON");
    assert_eq!(grid.conflicts(), 0);
    assert_eq!(grid.missing, ids(&["B2"]));
    assert_eq!(grid.merged, ids(&["B1", "B3"]));
}

#[test]
fn grid_edit_only_touches_entities_that_differ() {
    let mut store = scenario();
    let mut tracker = ChangeTracker::new();
    let layout = layout();

    let report = apply_schedule_edit(
        &mut store,
        &mut tracker,
        &layout,
        &ids(&["B1", "B2", "B3"]),
        "COOLING",
        "MON",
        1,
        PropertyValue::Int(1),
    )
    .unwrap();
    assert_eq!(report.written, ids(&["B2"]));
    assert_eq!(report.untouched, ids(&["B1", "B3"]));

    let key = ScheduleCoord::hour("COOLING", "MON", 1).to_string();
    let diff = tracker.entry("schedules", "B2", &key).unwrap();
    assert_eq!(diff.old_value, PropertyValue::Int(0));
    assert_eq!(diff.new_value, PropertyValue::Int(1));
    assert!(tracker.entry("schedules", "B1", &key).is_none());
    assert!(tracker.entry("schedules", "B3", &key).is_none());
    assert_eq!(tracker.summary().updated_fields, 1);

    let grid = merge_schedules(&store, &ids(&["B1", "B2", "B3"]), "COOLING", "MON");
    assert_eq!(grid.conflicts(), 0);
}

#[test]
fn each_entity_keeps_its_own_baseline() {
    let mut store = scenario();
    let mut tracker = ChangeTracker::new();
    let layout = layout();
    let all = ids(&["B1", "B2", "B3"]);

    apply_schedule_edit(
        &mut store,
        &mut tracker,
        &layout,
        &all,
        "COOLING",
        "MON",
        1,
        PropertyValue::Int(5),
    )
    .unwrap();
    let key = ScheduleCoord::hour("COOLING", "MON", 1).to_string();
    assert_eq!(tracker.entry("schedules", "B1", &key).unwrap().old_value, PropertyValue::Int(1));
    assert_eq!(tracker.entry("schedules", "B2", &key).unwrap().old_value, PropertyValue::Int(0));

    // Writing B2's baseline back to everyone cancels B2 and rewrites B1/B3.
    let report = apply_schedule_edit(
        &mut store,
        &mut tracker,
        &layout,
        &all,
        "COOLING",
        "MON",
        1,
        PropertyValue::Int(0),
    )
    .unwrap();
    assert_eq!(report.cancelled, 1);
    assert_eq!(report.updated, 2);
    assert!(tracker.entry("schedules", "B2", &key).is_none());
    let b1 = tracker.entry("schedules", "B1", &key).unwrap();
    assert_eq!(b1.old_value, PropertyValue::Int(1));
    assert_eq!(b1.new_value, PropertyValue::Int(0));
}

#[test]
fn edit_with_unloaded_schedule_is_rejected() {
    let mut store = scenario();
    store.remove_schedule("B3");
    let before = store.clone();
    let mut tracker = ChangeTracker::new();
    let err = apply_schedule_edit(
        &mut store,
        &mut tracker,
        &layout(),
        &ids(&["B1", "B3"]),
        "COOLING",
        "MON",
        0,
        PropertyValue::Int(0),
    )
    .unwrap_err();
    assert_eq!(err, ScheduleError::NotLoaded(ids(&["B3"])));
    assert_eq!(store, before);
    assert!(!tracker.has_pending_changes());
}

#[test]
fn out_of_range_index_mutates_nothing() {
    let mut store = scenario();
    let before = store.clone();
    let mut tracker = ChangeTracker::new();
    let err = apply_schedule_edit(
        &mut store,
        &mut tracker,
        &layout(),
        &ids(&["B1"]),
        "COOLING",
        "MON",
        24,
        PropertyValue::Int(0),
    )
    .unwrap_err();
    assert!(matches!(err, ScheduleError::IndexOutOfRange { index: 24, len: 3, .. }));
    assert_eq!(store, before);
}

#[test]
fn empty_selection_is_noop() {
    let mut store = scenario();
    let mut tracker = ChangeTracker::new();
    let report = apply_schedule_edit(
        &mut store,
        &mut tracker,
        &layout(),
        &[],
        "COOLING",
        "MON",
        0,
        PropertyValue::Int(9),
    )
    .unwrap();
    assert!(report.written.is_empty());
    assert!(tracker.log().is_empty());
}

#[test]
fn enumerated_values_merge_and_edit() {
    let mut store = scenario();
    let mut tracker = ChangeTracker::new();
    let all = ids(&["B1", "B2"]);
    let grid = merge_schedules(&store, &all, "OCCUPANCY", "MON");
    assert_eq!(grid.cells[0], GridCell::Scalar(PropertyValue::from("OFF")));

    apply_schedule_edit(
        &mut store,
        &mut tracker,
        &layout(),
        &all,
        "OCCUPANCY",
        "MON",
        0,
        PropertyValue::from("ON"),
    )
    .unwrap();
    assert_eq!(tracker.summary().updated_fields, 2);
}

#[test]
fn monthly_multiplier_fans_out() {
    let mut store = scenario();
    store.schedule_mut("B3").unwrap().monthly_multiplier[0] = 0.5;
    let mut tracker = ChangeTracker::new();
    let all = ids(&["B1", "B2", "B3"]);

    let grid = merge_monthly(&store, &all);
    assert!(grid.cells[0].is_conflict());
    assert_eq!(grid.cells[1], GridCell::Scalar(1.0));

    let report = apply_monthly_edit(&mut store, &mut tracker, &layout(), &all, 0, 0.5).unwrap();
    assert_eq!(report.written, ids(&["B1", "B2"]));
    let key = ScheduleCoord::monthly(0).to_string();
    assert_eq!(
        tracker.entry("schedules", "B1", &key).unwrap().old_value,
        PropertyValue::Number(1.0)
    );
    assert!(merge_monthly(&store, &all).cells[0] == GridCell::Scalar(0.5));

    let err = apply_monthly_edit(&mut store, &mut tracker, &layout(), &all, 0, f64::NAN).unwrap_err();
    assert!(matches!(err, ScheduleError::NonFinite(_)));
}

#[test]
fn fan_out_is_one_group_in_the_log() {
    let mut store = scenario();
    let mut tracker = ChangeTracker::new();
    apply_schedule_edit(
        &mut store,
        &mut tracker,
        &layout(),
        &ids(&["B1", "B2", "B3"]),
        "COOLING",
        "MON",
        0,
        PropertyValue::Int(0),
    )
    .unwrap();
    assert_eq!(tracker.log().last_group().len(), 3);
}
