use super::*;
use pretty_assertions::assert_eq;

#[test]
fn older_and_newer_walk_pages_within_bounds() {
    let mut state = loaded_state(numbered_snapshot(45));
    assert_eq!(state.view().summary.to_string(), "Showing 1-20 of 45");

    assert!(user(&mut state, UserAction::NewerPage).is_empty());

    user(&mut state, UserAction::OlderPage);
    user(&mut state, UserAction::OlderPage);
    assert_eq!(state.prefs.current_page, 3);
    assert_eq!(page_ids(&state), vec![1, 2, 3, 4, 5]);
    assert_eq!(state.view().summary.to_string(), "Showing 41-45 of 45");

    assert!(user(&mut state, UserAction::OlderPage).is_empty());
    assert_eq!(state.prefs.current_page, 3);

    user(&mut state, UserAction::NewerPage);
    assert_eq!(state.prefs.current_page, 2);
    assert_eq!(page_ids(&state), (6..=25).collect::<Vec<_>>());
}

#[test]
fn page_size_changes_return_to_first_page() {
    let mut state = loaded_state(numbered_snapshot(45));
    user(&mut state, UserAction::OlderPage);

    user(&mut state, UserAction::CycleRecordsPerPage);
    assert_eq!(state.prefs.records_per_page, 50);
    assert_eq!(state.prefs.current_page, 1);
    assert_eq!(page_ids(&state), (1..=45).collect::<Vec<_>>());

    assert!(user(&mut state, UserAction::SetRecordsPerPage(13)).is_empty());
    user(&mut state, UserAction::SetRecordsPerPage(10));
    assert_eq!(state.view().summary.total_pages, 5);
}

#[test]
fn stale_page_is_clamped_after_messages_shrink() {
    let mut state = loaded_state(numbered_snapshot(45));
    user(&mut state, UserAction::OlderPage);
    user(&mut state, UserAction::OlderPage);

    run_sync(
        &mut state,
        SyncAction::SnapshotApplied(Arc::new(numbered_snapshot(10))),
    );
    assert_eq!(state.view().summary.page, 1);
    assert_eq!(page_ids(&state), (1..=10).collect::<Vec<_>>());
}

#[test]
fn navigating_clears_the_new_message_count() {
    let mut state = loaded_state(numbered_snapshot(45));
    run_sync(
        &mut state,
        SyncAction::SnapshotApplied(Arc::new(numbered_snapshot(48))),
    );
    assert_eq!(state.new_since_last_refresh, 3);

    user(&mut state, UserAction::OlderPage);
    assert_eq!(state.new_since_last_refresh, 0);
}
