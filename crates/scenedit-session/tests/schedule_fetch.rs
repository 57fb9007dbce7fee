mod common;

use common::{ScriptedBackend, id, ids, open, open_with};
use scenedit_engine::GridCell;
use scenedit_session::{
    Action, ActionOutcome, DispatchOutcome, EditorSession, FetchOutcome, FetchTicket,
    PropertyValue, ScenarioBackend, SessionConfig, SessionError,
};
use scenedit_testkit::ScenarioDoc;

fn cooling_mon(index: usize, value: i64) -> Action {
    Action::EditSchedule {
        category: "COOLING".into(),
        day: "MON".into(),
        index,
        value: PropertyValue::Int(value),
    }
}

#[test]
fn lazy_load_starts_without_schedules() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea());
    let session = open(&mut backend);
    assert!(session.store().schedules().is_empty());
    assert_eq!(session.stats().schedules_loaded, 0);
    assert_eq!(session.stats().rows_loaded, 11);
}

#[test]
fn fetches_are_deduplicated_per_entity() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea());
    let mut session = open(&mut backend);

    let first = session.request_schedules(&ids(&["B1", "B2"]));
    assert_eq!(first.len(), 2);
    let second = session.request_schedules(&ids(&["B1", "B2", "B3"]));
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].entity, id("B3"));

    for ticket in first.into_iter().chain(second) {
        let result = backend.fetch_schedule(&ticket.entity);
        assert_eq!(session.complete_fetch(ticket, result).outcome, FetchOutcome::Loaded);
    }
    assert_eq!(backend.schedule_fetches.len(), 3);
    assert!(session.request_schedules(&ids(&["B1", "B2", "B3"])).is_empty());
    // Loading a fetched schedule is not an edit.
    assert!(!session.has_pending_changes());
}

#[test]
fn grid_waits_for_the_selection_then_merges() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea());
    let mut session = open(&mut backend);
    session
        .dispatch(Action::Select(ids(&["B1", "B2", "B3"])))
        .unwrap();

    let tickets = request_selection(&mut session);
    assert!(session.is_loading());
    match session.merged_schedule("COOLING", "MON") {
        Err(SessionError::SchedulesLoading(loading)) => assert_eq!(loading.len(), 3),
        other => panic!("expected loading, got {other:?}"),
    }

    for ticket in tickets {
        let result = backend.fetch_schedule(&ticket.entity);
        session.complete_fetch(ticket, result);
    }
    assert!(!session.is_loading());
    let grid = session.merged_schedule("COOLING", "MON").unwrap();
    assert_eq!(
        grid.cells,
        vec![
            GridCell::Scalar(PropertyValue::Int(1)),
            GridCell::Conflict,
            GridCell::Scalar(PropertyValue::Int(1)),
        ]
    );
    assert_eq!(grid.merged, ids(&["B1", "B2", "B3"]));
}

#[test]
fn edits_queue_while_loading_and_replay_on_completion() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea());
    let mut session = open(&mut backend);
    session
        .dispatch(Action::Select(ids(&["B1", "B2", "B3"])))
        .unwrap();
    let tickets = request_selection(&mut session);

    let outcome = session.dispatch(cooling_mon(1, 1)).unwrap();
    assert!(matches!(outcome, DispatchOutcome::Queued { pending: 1 }));
    assert_eq!(session.queued_edits(), 1);
    assert!(!session.has_pending_changes());

    let mut completions: Vec<_> = tickets
        .into_iter()
        .map(|ticket| {
            let result = backend.fetch_schedule(&ticket.entity);
            session.complete_fetch(ticket, result)
        })
        .collect();
    let last = completions.pop().unwrap();
    assert!(completions.iter().all(|c| c.replayed.is_empty()));
    assert_eq!(last.replayed.len(), 1);
    match &last.replayed[0] {
        Ok(ActionOutcome::ScheduleEdited(report)) => {
            assert_eq!(report.written, ids(&["B2"]));
            assert_eq!(report.untouched, ids(&["B1", "B3"]));
        }
        other => panic!("expected a schedule edit, got {other:?}"),
    }
    assert_eq!(session.queued_edits(), 0);

    let diff = session
        .change_set()
        .entry("schedules", "B2", "SCHEDULES/COOLING/MON/1")
        .unwrap();
    assert_eq!(diff.old_value, PropertyValue::Int(0));
    assert_eq!(diff.new_value, PropertyValue::Int(1));
}

#[test]
fn queued_edit_keeps_its_targets_when_the_selection_moves() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea());
    let mut session = open(&mut backend);
    session.dispatch(Action::Select(ids(&["B2"]))).unwrap();
    let tickets = request_selection(&mut session);

    session.dispatch(cooling_mon(0, 0)).unwrap();
    session.dispatch(Action::Select(ids(&["B1"]))).unwrap();
    for ticket in tickets {
        let result = backend.fetch_schedule(&ticket.entity);
        session.complete_fetch(ticket, result);
    }
    assert!(session.change_set().entry("schedules", "B2", "SCHEDULES/COOLING/MON/0").is_some());
    assert!(!session.store().has_schedule("B1"));
}

#[test]
fn stale_fetch_after_discard_is_dropped() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea());
    let mut session = open(&mut backend);
    session.dispatch(Action::Select(ids(&["B1"]))).unwrap();
    let mut tickets = request_selection(&mut session);
    let ticket = tickets.remove(0);
    session.dispatch(cooling_mon(0, 0)).unwrap();
    assert_eq!(session.queued_edits(), 1);

    let report = session.discard(&mut backend).unwrap();
    assert_eq!(report.epoch, 1);
    assert_eq!(session.queued_edits(), 0);

    let result = backend.fetch_schedule(&ticket.entity);
    let completion = session.complete_fetch(ticket, result);
    assert_eq!(completion.outcome, FetchOutcome::Stale);
    assert!(completion.replayed.is_empty());
    assert!(!session.store().has_schedule("B1"));
    assert!(!session.has_pending_changes());
}

#[test]
fn discard_after_a_failed_fetch_drops_the_queued_edit() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea()).failing_schedule("B2");
    let mut session = open(&mut backend);
    session
        .dispatch(Action::Select(ids(&["B1", "B2"])))
        .unwrap();
    let mut tickets = request_selection(&mut session);
    let b1 = tickets.remove(0);
    let b2 = tickets.remove(0);
    assert!(matches!(
        session.dispatch(cooling_mon(2, 0)).unwrap(),
        DispatchOutcome::Queued { .. }
    ));

    let result = backend.fetch_schedule(&b2.entity);
    let failed = session.complete_fetch(b2, result);
    assert_eq!(failed.outcome, FetchOutcome::Failed);
    assert!(failed.replayed.is_empty());

    session.discard(&mut backend).unwrap();
    assert!(session.fetch_errors().is_empty());

    let result = backend.fetch_schedule(&b1.entity);
    let late = session.complete_fetch(b1, result);
    assert_eq!(late.outcome, FetchOutcome::Stale);
    assert!(late.replayed.is_empty());
    assert_eq!(session.queued_edits(), 0);
    assert!(!session.has_pending_changes());
    assert!(session.store().schedules().is_empty());
}

#[test]
fn deleting_an_entity_mid_fetch_keeps_it_out_of_the_changes() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea());
    let mut session = open(&mut backend);
    session
        .dispatch(Action::Select(ids(&["B1", "B2"])))
        .unwrap();
    let tickets = request_selection(&mut session);
    session.dispatch(cooling_mon(1, 7)).unwrap();
    session
        .dispatch(Action::DeleteEntities(ids(&["B2"])))
        .unwrap();

    let completions: Vec<_> = tickets
        .into_iter()
        .map(|ticket| {
            let result = backend.fetch_schedule(&ticket.entity);
            session.complete_fetch(ticket, result)
        })
        .collect();
    assert_eq!(completions[0].outcome, FetchOutcome::Loaded);
    assert_eq!(completions[1].outcome, FetchOutcome::Orphaned);
    match &completions[1].replayed[..] {
        [Ok(ActionOutcome::ScheduleEdited(report))] => {
            assert_eq!(report.written, ids(&["B1"]));
        }
        other => panic!("expected one replayed edit, got {other:?}"),
    }

    let changes = session.change_set();
    assert!(changes.is_deleted("zone", "B2"));
    assert!(changes.entry("schedules", "B2", "SCHEDULES/COOLING/MON/1").is_none());
    assert!(changes.entry("schedules", "B1", "SCHEDULES/COOLING/MON/1").is_some());
    assert!(!session.store().has_schedule("B2"));
    assert!(session.fetch_errors().is_empty());
}

#[test]
fn require_all_blocks_a_selection_with_a_failed_fetch() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea()).failing_schedule("B2");
    let mut session = open(&mut backend);
    session
        .dispatch(Action::Select(ids(&["B1", "B2", "B3"])))
        .unwrap();

    let completions = session.load_selection(&mut backend);
    let failed: Vec<_> = completions
        .iter()
        .filter(|c| c.outcome == FetchOutcome::Failed)
        .map(|c| c.entity.clone())
        .collect();
    assert_eq!(failed, ids(&["B2"]));
    assert!(
        session.fetch_errors()[&id("B2")].contains("schedule unavailable")
    );

    assert!(matches!(
        session.merged_schedule("COOLING", "MON"),
        Err(SessionError::ScheduleFetchFailed(_))
    ));
    assert!(matches!(
        session.dispatch(cooling_mon(1, 1)),
        Err(SessionError::ScheduleFetchFailed(_))
    ));
    assert!(!session.has_pending_changes());

    // Retrying clears the error.
    backend.failing_schedules.clear();
    let retry = session.load_selection(&mut backend);
    assert_eq!(retry.len(), 1);
    assert_eq!(retry[0].outcome, FetchOutcome::Loaded);
    assert!(session.fetch_errors().is_empty());
    assert_eq!(session.merged_schedule("COOLING", "MON").unwrap().conflicts(), 1);
}

#[test]
fn exclude_failed_merges_and_edits_the_rest() {
    let mut backend = ScriptedBackend::lazy(&ScenarioDoc::cea()).failing_schedule("B2");
    let mut session = open_with(&mut backend, SessionConfig::lenient());
    session
        .dispatch(Action::Select(ids(&["B1", "B2", "B3"])))
        .unwrap();
    session.load_selection(&mut backend);

    let grid = session.merged_schedule("COOLING", "MON").unwrap();
    assert_eq!(grid.merged, ids(&["B1", "B3"]));
    assert_eq!(grid.conflicts(), 0);

    match session.dispatch(cooling_mon(1, 0)).unwrap() {
        DispatchOutcome::Applied(ActionOutcome::ScheduleEdited(report)) => {
            assert_eq!(report.written, ids(&["B1", "B3"]));
        }
        other => panic!("expected an applied edit, got {other:?}"),
    }
    assert!(!session.store().has_schedule("B2"));
}

fn request_selection(session: &mut EditorSession) -> Vec<FetchTicket> {
    let selected = session.selection().to_vec();
    session.request_schedules(&selected)
}
