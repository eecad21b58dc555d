use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;

pub(super) use super::reduce;
pub(super) use crate::actions::FeedAction;
pub(super) use crate::actions::SyncAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::filter::TimeWindow;
pub(super) use crate::models::Channel;
pub(super) use crate::models::DisplayField;
pub(super) use crate::models::FeedSnapshot;
pub(super) use crate::models::Message;
pub(super) use crate::models::MessageStatus;
pub(super) use crate::persistence::ViewPreferences;
pub(super) use crate::reducer::FeedEffect;
pub(super) use crate::state::FeedState;
pub(super) use crate::state::Focus;
pub(super) use crate::state::LoadStatus;
pub(super) use crate::state::NoticeLevel;

mod paging;
mod selection_reconcile;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 12, 12, 0, 0).unwrap()
}

fn state() -> FeedState {
    FeedState::new(ViewPreferences::default(), now())
}

fn loaded_state(snapshot: FeedSnapshot) -> FeedState {
    let mut state = state();
    run_sync(&mut state, SyncAction::CacheRestored(Arc::new(snapshot)));
    state
}

fn message(id: i64, channel: &str, text: &str) -> Message {
    Message {
        id,
        channel: channel.to_string(),
        // one minute apart, ending shortly before `now()`
        time: format!("20250312_11{:02}00", id.rem_euclid(60)),
        text: text.to_string(),
        status: MessageStatus::New,
        url: None,
    }
}

fn snapshot_with(messages: Vec<Message>) -> FeedSnapshot {
    FeedSnapshot {
        channels: BTreeMap::from([
            ("1".to_string(), Channel::new("1", "Pit")),
            ("2".to_string(), Channel::new("2", "Race")),
        ]),
        messages,
        keywords: vec!["box".to_string(), "flag".to_string()],
        ..FeedSnapshot::default()
    }
}

/// `count` messages alternating between channels 1 and 2.
fn numbered_snapshot(count: i64) -> FeedSnapshot {
    let messages = (1..=count)
        .map(|id| {
            let channel = if id % 2 == 0 { "2" } else { "1" };
            message(id, channel, &format!("message {id}"))
        })
        .collect();
    snapshot_with(messages)
}

fn user(state: &mut FeedState, action: UserAction) -> Vec<FeedEffect> {
    reduce(state, FeedAction::User(action))
}

fn run_sync(state: &mut FeedState, action: SyncAction) -> Vec<FeedEffect> {
    reduce(state, FeedAction::Sync(action))
}

fn page_ids(state: &FeedState) -> Vec<i64> {
    state.view().page.iter().map(|message| message.id).collect()
}
