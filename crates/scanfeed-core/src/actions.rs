use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use super::filter::TimeWindow;
use super::models::ChannelId;
use super::models::DisplayField;
use super::models::FeedSnapshot;
use super::models::MessageId;

#[derive(Debug, Clone)]
pub enum FeedAction {
    User(UserAction),
    Sync(SyncAction),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    SetQuery(String),
    BeginQueryEdit,
    QueryInput(char),
    QueryBackspace,
    EndQueryEdit,
    ToggleChannel(ChannelId),
    ToggleKeyword(String),
    SetTimeWindow(TimeWindow),
    CycleTimeWindow,
    SetRecordsPerPage(usize),
    CycleRecordsPerPage,
    NewerPage,
    OlderPage,
    ToggleField(DisplayField),
    FocusNext,
    CursorUp,
    CursorDown,
    /// Toggles whatever the cursor is on in the focused sidebar list.
    ActivateSelection,
    DeleteMessage(MessageId),
    DeleteSelected,
    CopySelected,
    RefreshNow,
    DismissNotice,
}

/// Outcomes reported by the sync worker.
#[derive(Debug, Clone)]
pub enum SyncAction {
    ClockTick(DateTime<Utc>),
    /// The startup refresh began; cached content stays visible until it ends.
    LoadingStarted,
    CacheRestored(Arc<FeedSnapshot>),
    /// A full refresh landed.
    SnapshotApplied(Arc<FeedSnapshot>),
    /// Local edit (e.g. a channel settings write) replaced the snapshot.
    SnapshotReplaced(Arc<FeedSnapshot>),
    RefreshFailed(String),
    DeleteConfirmed {
        id: MessageId,
        snapshot: Arc<FeedSnapshot>,
    },
    DeleteFailed {
        id: MessageId,
        message: String,
    },
    ChannelUpdateFailed {
        id: ChannelId,
        message: String,
    },
}
