use super::*;
use pretty_assertions::assert_eq;

#[test]
fn message_cursor_is_clamped_when_the_page_shrinks() {
    let mut state = loaded_state(numbered_snapshot(5));
    for _ in 0..4 {
        user(&mut state, UserAction::CursorDown);
    }
    assert_eq!(state.interaction.message_cursor, 4);
    assert!(user(&mut state, UserAction::CursorDown).is_empty());

    run_sync(
        &mut state,
        SyncAction::SnapshotReplaced(Arc::new(numbered_snapshot(2))),
    );
    assert_eq!(state.interaction.message_cursor, 1);
    assert_eq!(state.selected_message().map(|message| message.id), Some(1));
}

#[test]
fn focus_cycles_and_cursors_are_independent() {
    let mut state = loaded_state(numbered_snapshot(5));
    user(&mut state, UserAction::CursorDown);

    user(&mut state, UserAction::FocusNext);
    assert_eq!(state.interaction.focus, Focus::Channels);
    user(&mut state, UserAction::CursorDown);
    assert!(user(&mut state, UserAction::CursorDown).is_empty());
    assert_eq!(state.interaction.channel_cursor, 1);
    assert_eq!(state.interaction.message_cursor, 1);

    user(&mut state, UserAction::FocusNext);
    user(&mut state, UserAction::FocusNext);
    assert_eq!(state.interaction.focus, Focus::Messages);
    assert!(user(&mut state, UserAction::CursorUp).len() == 1);
    assert!(user(&mut state, UserAction::CursorUp).is_empty());
}

#[test]
fn activate_toggles_the_focused_sidebar_entry() {
    let mut state = loaded_state(snapshot_with(vec![
        message(1, "1", "box box"),
        message(2, "2", "yellow flag"),
    ]));

    user(&mut state, UserAction::FocusNext);
    user(&mut state, UserAction::CursorDown);
    user(&mut state, UserAction::ActivateSelection);
    assert!(!state.is_channel_active("2"));

    user(&mut state, UserAction::FocusNext);
    // "box" ranks first with two matches.
    user(&mut state, UserAction::ActivateSelection);
    assert!(state.prefs.active_keywords.contains("box"));
    assert_eq!(page_ids(&state), vec![1]);
}

#[test]
fn copy_selected_yields_message_text() {
    let mut state = loaded_state(numbered_snapshot(3));
    assert_eq!(
        user(&mut state, UserAction::CopySelected),
        vec![FeedEffect::CopyToClipboard("message 3".to_string())]
    );

    let mut empty = super::state();
    assert!(user(&mut empty, UserAction::CopySelected).is_empty());
}
