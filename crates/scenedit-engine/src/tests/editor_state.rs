use super::common::*;
use crate::error::EngineError;
use crate::state::{Action, ActionOutcome, EditorState};
use crate::{PropertyValue, Schedule};

fn state() -> EditorState {
    EditorState::new(scenario(), layout())
}

#[test]
fn selection_scoped_update_goes_through_dispatch() {
    let mut st = state();
    st.dispatch(Action::Select(ids(&["B2", "B3"]))).unwrap();
    let outcome = st
        .dispatch(Action::UpdateProperties {
            table: None,
            entities: None,
            updates: vec![("floors_ag".into(), 10.into())],
        })
        .unwrap();
    let ActionOutcome::Updated(report) = outcome else {
        panic!("expected an update, got {outcome:?}");
    };
    assert_eq!(report.created, 2);
    assert_eq!(st.change_set().update["zone"].len(), 2);
}

#[test]
fn delete_selection_prunes_selection() {
    let mut st = state();
    st.dispatch(Action::SelectAll).unwrap();
    assert_eq!(st.selection().len(), 3);
    st.dispatch(Action::Toggle(id("B3"))).unwrap();
    st.dispatch(Action::DeleteSelection).unwrap();
    assert!(st.selection().is_empty());
    assert_eq!(st.store().table("zone").unwrap().len(), 1);
    assert!(st.has_pending_changes());
}

#[test]
fn switching_layer_clears_selection() {
    let mut st = state();
    st.dispatch(Action::Select(ids(&["B1"]))).unwrap();
    st.dispatch(Action::SetActiveLayer(Some("trees".into())))
        .unwrap();
    assert!(st.selection().is_empty());
    st.dispatch(Action::SelectAll).unwrap();
    assert_eq!(st.selection().to_vec(), ids(&["T1"]));
}

#[test]
fn no_active_layer_rejects_selection_scoped_actions() {
    let mut st = state();
    st.dispatch(Action::SetActiveLayer(None)).unwrap();
    let err = st.dispatch(Action::SelectAll).unwrap_err();
    assert_eq!(err, EngineError::NoActiveLayer);
}

#[test]
fn schedule_edit_uses_current_selection() {
    let mut st = state();
    st.dispatch(Action::Select(ids(&["B1", "B2"]))).unwrap();
    assert_eq!(st.merged_schedule("COOLING", "MON").conflicts(), 1);
    st.dispatch(Action::EditSchedule {
        category: "COOLING".into(),
        day: "MON".into(),
        index: 1,
        value: PropertyValue::Int(0),
    })
    .unwrap();
    assert_eq!(st.merged_schedule("COOLING", "MON").conflicts(), 0);
    assert_eq!(st.tracker().entities_with_updates("schedules"), ids(&["B1"]));
}

#[test]
fn save_and_replace_clear_pending_changes() {
    let mut st = state();
    st.dispatch(Action::update("zone", ["B1"], [("floors_ag", 4)]))
        .unwrap();
    assert!(st.has_pending_changes());
    st.commit_saved();
    assert!(!st.has_pending_changes());

    st.dispatch(Action::update("zone", ["B1"], [("floors_ag", 6)]))
        .unwrap();
    st.dispatch(Action::Select(ids(&["B1"]))).unwrap();
    st.replace_store(scenario());
    assert!(!st.has_pending_changes());
    assert!(st.selection().is_empty());
    assert_eq!(
        st.store().value("zone", "B1", "floors_ag"),
        Some(&PropertyValue::Int(3))
    );
}

#[test]
fn loading_a_schedule_is_not_an_edit() {
    let mut st = state();
    st.load_schedule(id("B9"), Schedule::new(vec![1.0; Schedule::MONTHS]));
    assert!(!st.has_pending_changes());
    assert!(st.store().has_schedule("B9"));
}

#[test]
fn consistency_failures_are_fatal() {
    let mut store = scenario();
    store.features_mut("zone").unwrap().features.clear();
    let mut st = EditorState::new(store, layout());
    let err = st
        .dispatch(Action::update("zone", ["B1"], [("floors_ag", 4)]))
        .unwrap_err();
    assert!(err.is_fatal());
}
