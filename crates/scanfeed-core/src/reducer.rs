use std::sync::Arc;

use super::actions::FeedAction;
use super::actions::SyncAction;
use super::actions::UserAction;
use super::models::FeedSnapshot;
use super::models::MessageId;
use super::paginate::next_page_size;
use super::paginate::PAGE_SIZE_OPTIONS;
use super::state::sidebar_keywords;
use super::state::FeedState;
use super::state::Focus;
use super::state::LoadStatus;
use super::state::Notice;
use super::state::NoticeLevel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEffect {
    RequestFrame,
    PersistPreferences,
    Refresh,
    DeleteMessage(MessageId),
    CopyToClipboard(String),
}

pub fn reduce(state: &mut FeedState, action: FeedAction) -> Vec<FeedEffect> {
    let effects = match action {
        FeedAction::User(user) => reduce_user(state, user),
        FeedAction::Sync(sync) => reduce_sync(state, sync),
    };
    reconcile_cursors(state);
    effects
}

fn reduce_user(state: &mut FeedState, action: UserAction) -> Vec<FeedEffect> {
    match action {
        UserAction::SetQuery(query) => {
            state.prefs.query = query;
            predicates_changed(state)
        }
        UserAction::BeginQueryEdit => {
            state.interaction.editing_query = true;
            vec![FeedEffect::RequestFrame]
        }
        UserAction::QueryInput(ch) => {
            state.prefs.query.push(ch);
            predicates_changed(state)
        }
        UserAction::QueryBackspace => {
            if state.prefs.query.pop().is_none() {
                return Vec::new();
            }
            predicates_changed(state)
        }
        UserAction::EndQueryEdit => {
            state.interaction.editing_query = false;
            vec![FeedEffect::RequestFrame]
        }
        UserAction::ToggleChannel(id) => {
            if !state.snapshot.channels.contains_key(&id) {
                return Vec::new();
            }
            let active = state.is_channel_active(&id);
            state.prefs.channel_visibility.insert(id, !active);
            predicates_changed(state)
        }
        UserAction::ToggleKeyword(keyword) => {
            if !state.prefs.active_keywords.remove(&keyword) {
                state.prefs.active_keywords.insert(keyword);
            }
            predicates_changed(state)
        }
        UserAction::SetTimeWindow(window) => {
            state.prefs.time_window = window;
            predicates_changed(state)
        }
        UserAction::CycleTimeWindow => {
            state.prefs.time_window = state.prefs.time_window.next();
            predicates_changed(state)
        }
        UserAction::SetRecordsPerPage(size) => {
            if !PAGE_SIZE_OPTIONS.contains(&size) {
                return Vec::new();
            }
            state.prefs.records_per_page = size;
            predicates_changed(state)
        }
        UserAction::CycleRecordsPerPage => {
            state.prefs.records_per_page = next_page_size(state.prefs.records_per_page);
            predicates_changed(state)
        }
        UserAction::NewerPage => {
            let summary = state.view().summary;
            if !summary.has_newer() {
                return Vec::new();
            }
            go_to_page(state, summary.page - 1)
        }
        UserAction::OlderPage => {
            let summary = state.view().summary;
            if !summary.has_older() {
                return Vec::new();
            }
            go_to_page(state, summary.page + 1)
        }
        UserAction::ToggleField(field) => {
            state.prefs.fields.toggle(field);
            vec![FeedEffect::PersistPreferences, FeedEffect::RequestFrame]
        }
        UserAction::FocusNext => {
            state.interaction.focus = state.interaction.focus.next();
            vec![FeedEffect::RequestFrame]
        }
        UserAction::CursorUp => {
            let cursor = focused_cursor(state);
            if *cursor == 0 {
                return Vec::new();
            }
            *cursor -= 1;
            vec![FeedEffect::RequestFrame]
        }
        UserAction::CursorDown => {
            let len = focused_len(state);
            let cursor = focused_cursor(state);
            if *cursor + 1 >= len {
                return Vec::new();
            }
            *cursor += 1;
            vec![FeedEffect::RequestFrame]
        }
        UserAction::ActivateSelection => match state.interaction.focus {
            Focus::Channels => match state.selected_channel().map(|channel| channel.id.clone()) {
                Some(id) => reduce_user(state, UserAction::ToggleChannel(id)),
                None => Vec::new(),
            },
            Focus::Keywords => match state.selected_keyword() {
                Some(keyword) => reduce_user(state, UserAction::ToggleKeyword(keyword)),
                None => Vec::new(),
            },
            Focus::Messages => Vec::new(),
        },
        UserAction::DeleteMessage(id) => request_delete(state, id),
        UserAction::DeleteSelected => match state.selected_message().map(|message| message.id) {
            Some(id) => request_delete(state, id),
            None => Vec::new(),
        },
        UserAction::CopySelected => match state.selected_message() {
            Some(message) => vec![FeedEffect::CopyToClipboard(message.text.clone())],
            None => Vec::new(),
        },
        UserAction::RefreshNow => vec![FeedEffect::Refresh],
        UserAction::DismissNotice => {
            if state.notice.take().is_none() {
                return Vec::new();
            }
            vec![FeedEffect::RequestFrame]
        }
    }
}

fn reduce_sync(state: &mut FeedState, action: SyncAction) -> Vec<FeedEffect> {
    match action {
        SyncAction::ClockTick(now) => {
            if now == state.now {
                return Vec::new();
            }
            state.now = now;
            vec![FeedEffect::RequestFrame]
        }
        SyncAction::LoadingStarted => {
            state.load = LoadStatus::Loading;
            vec![FeedEffect::RequestFrame]
        }
        SyncAction::CacheRestored(snapshot) => {
            install_snapshot(state, snapshot);
            vec![FeedEffect::RequestFrame]
        }
        SyncAction::SnapshotApplied(snapshot) => {
            let previous = state.snapshot.messages.len();
            let had_data = !state.snapshot.is_empty();
            let arrived = snapshot.messages.len().saturating_sub(previous);
            install_snapshot(state, snapshot);
            if had_data {
                state.new_since_last_refresh = state.new_since_last_refresh.saturating_add(arrived);
            }
            if state
                .notice
                .as_ref()
                .is_some_and(|notice| notice.level == NoticeLevel::Warning)
            {
                state.notice = None;
            }
            vec![FeedEffect::RequestFrame]
        }
        SyncAction::SnapshotReplaced(snapshot) => {
            install_snapshot(state, snapshot);
            vec![FeedEffect::RequestFrame]
        }
        SyncAction::RefreshFailed(message) => {
            if state.snapshot.is_empty() {
                state.load = LoadStatus::Failed(Arc::from(message.as_str()));
            } else {
                state.load = LoadStatus::Ready;
                state.notice = Some(Notice::new(
                    NoticeLevel::Warning,
                    format!("refresh failed, showing cached data ({message})"),
                ));
            }
            vec![FeedEffect::RequestFrame]
        }
        SyncAction::DeleteConfirmed { id, snapshot } => {
            state.hidden.remove(&id);
            install_snapshot(state, snapshot);
            vec![FeedEffect::RequestFrame]
        }
        SyncAction::DeleteFailed { id, message } => {
            state.hidden.remove(&id);
            state.notice = Some(Notice::new(
                NoticeLevel::Error,
                format!("could not delete message {id}: {message}"),
            ));
            vec![FeedEffect::RequestFrame]
        }
        SyncAction::ChannelUpdateFailed { id, message } => {
            state.notice = Some(Notice::new(
                NoticeLevel::Error,
                format!("could not update channel {id}: {message}"),
            ));
            vec![FeedEffect::RequestFrame]
        }
    }
}

fn install_snapshot(state: &mut FeedState, snapshot: Arc<FeedSnapshot>) {
    state.snapshot = snapshot;
    state.load = LoadStatus::Ready;
}

fn predicates_changed(state: &mut FeedState) -> Vec<FeedEffect> {
    state.prefs.current_page = 1;
    state.interaction.message_cursor = 0;
    vec![FeedEffect::PersistPreferences, FeedEffect::RequestFrame]
}

fn go_to_page(state: &mut FeedState, page: usize) -> Vec<FeedEffect> {
    state.prefs.current_page = page;
    state.interaction.message_cursor = 0;
    state.new_since_last_refresh = 0;
    vec![FeedEffect::PersistPreferences, FeedEffect::RequestFrame]
}

fn request_delete(state: &mut FeedState, id: MessageId) -> Vec<FeedEffect> {
    if state.hidden.contains(&id) || state.snapshot.message(id).is_none() {
        return Vec::new();
    }
    state.hidden.insert(id);
    vec![FeedEffect::DeleteMessage(id), FeedEffect::RequestFrame]
}

fn focused_len(state: &FeedState) -> usize {
    match state.interaction.focus {
        Focus::Messages => state.view().page.len(),
        Focus::Channels => state.snapshot.channels.len(),
        Focus::Keywords => {
            let view = state.view();
            sidebar_keywords(&state.snapshot.keywords, &view.keyword_counts).len()
        }
    }
}

fn focused_cursor(state: &mut FeedState) -> &mut usize {
    match state.interaction.focus {
        Focus::Messages => &mut state.interaction.message_cursor,
        Focus::Channels => &mut state.interaction.channel_cursor,
        Focus::Keywords => &mut state.interaction.keyword_cursor,
    }
}

fn reconcile_cursors(state: &mut FeedState) {
    let view = state.view();
    let page_len = view.page.len();
    let keyword_len = sidebar_keywords(&state.snapshot.keywords, &view.keyword_counts).len();
    drop(view);
    let channel_len = state.snapshot.channels.len();

    let clamp = |cursor: &mut usize, len: usize| *cursor = (*cursor).min(len.saturating_sub(1));
    clamp(&mut state.interaction.message_cursor, page_len);
    clamp(&mut state.interaction.channel_cursor, channel_len);
    clamp(&mut state.interaction.keyword_cursor, keyword_len);
}

#[cfg(test)]
mod tests;
