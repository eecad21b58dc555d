use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;

use crate::aggregate::channel_counts;
use crate::aggregate::keyword_counts;
use crate::filter::within_window;
use crate::filter::MessageFilter;
use crate::models::Channel;
use crate::models::ChannelId;
use crate::models::FeedSnapshot;
use crate::models::Message;
use crate::models::MessageId;
use crate::paginate::paginate;
use crate::paginate::PageSummary;
use crate::persistence::ViewPreferences;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    /// Initial load failed with nothing cached to fall back on.
    Failed(Arc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Messages,
    Channels,
    Keywords,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Self::Messages => Self::Channels,
            Self::Channels => Self::Keywords,
            Self::Keywords => Self::Messages,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interaction {
    pub focus: Focus,
    /// Index into the page as displayed (newest first).
    pub message_cursor: usize,
    pub channel_cursor: usize,
    pub keyword_cursor: usize,
    pub editing_query: bool,
}

#[derive(Debug, Clone)]
pub struct FeedState {
    pub snapshot: Arc<FeedSnapshot>,
    pub prefs: ViewPreferences,
    pub load: LoadStatus,
    /// Messages hidden while their delete request is in flight.
    pub hidden: BTreeSet<MessageId>,
    pub notice: Option<Notice>,
    pub new_since_last_refresh: usize,
    pub interaction: Interaction,
    pub now: DateTime<Utc>,
}

impl FeedState {
    pub fn new(prefs: ViewPreferences, now: DateTime<Utc>) -> Self {
        Self {
            snapshot: Arc::new(FeedSnapshot::default()),
            prefs: prefs.sanitized(),
            load: LoadStatus::Loading,
            hidden: BTreeSet::new(),
            notice: None,
            new_since_last_refresh: 0,
            interaction: Interaction::default(),
            now,
        }
    }

    pub fn view(&self) -> FeedView<'_> {
        derive_view(&self.snapshot, &self.prefs, &self.hidden, self.now)
    }

    pub fn channel_order(&self) -> Vec<&Channel> {
        channel_order(&self.snapshot)
    }

    pub fn is_channel_active(&self, id: &str) -> bool {
        effective_activity(&self.snapshot, &self.prefs)
            .get(id)
            .copied()
            .unwrap_or(false)
    }

    /// Message under the cursor on the current page.
    pub fn selected_message(&self) -> Option<&Message> {
        let view = self.view();
        let selected = view.newest_first().nth(self.interaction.message_cursor);
        selected
    }

    pub fn selected_channel(&self) -> Option<&Channel> {
        self.channel_order()
            .into_iter()
            .nth(self.interaction.channel_cursor)
    }

    pub fn selected_keyword(&self) -> Option<String> {
        let view = self.view();
        sidebar_keywords(&self.snapshot.keywords, &view.keyword_counts)
            .into_iter()
            .nth(self.interaction.keyword_cursor)
            .map(|(keyword, _)| keyword)
    }
}

/// Snapshot activity flags with the user's overrides applied.
pub fn effective_activity(
    snapshot: &FeedSnapshot,
    prefs: &ViewPreferences,
) -> BTreeMap<ChannelId, bool> {
    snapshot
        .channels
        .iter()
        .map(|(id, channel)| {
            let active = prefs
                .channel_visibility
                .get(id)
                .copied()
                .unwrap_or(channel.is_active);
            (id.clone(), active)
        })
        .collect()
}

/// Numeric ids in numeric order, anything else after them lexically.
pub fn channel_order(snapshot: &FeedSnapshot) -> Vec<&Channel> {
    let mut channels: Vec<&Channel> = snapshot.channels.values().collect();
    channels.sort_by(|a, b| compare_ids(&a.id, &b.id));
    channels
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Every tracked keyword with its count, highest first, ties by keyword.
pub fn sidebar_keywords(
    keywords: &[String],
    counts: &BTreeMap<String, usize>,
) -> Vec<(String, usize)> {
    let mut rows: Vec<(String, usize)> = keywords
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|keyword| (keyword.clone(), counts.get(keyword).copied().unwrap_or(0)))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    rows
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedView<'a> {
    /// Current page, oldest first.
    pub page: Vec<&'a Message>,
    pub summary: PageSummary,
    pub channel_counts: BTreeMap<ChannelId, usize>,
    pub keyword_counts: BTreeMap<String, usize>,
}

impl<'a> FeedView<'a> {
    pub fn newest_first(&self) -> impl Iterator<Item = &'a Message> + '_ {
        self.page.iter().rev().copied()
    }
}

/// Window, then count, then filter, then page. Counters and pages are both
/// drawn from the same windowed set; pending deletes are excluded up front.
pub fn derive_view<'a>(
    snapshot: &'a FeedSnapshot,
    prefs: &ViewPreferences,
    hidden: &BTreeSet<MessageId>,
    now: DateTime<Utc>,
) -> FeedView<'a> {
    let windowed = within_window(
        snapshot
            .messages
            .iter()
            .filter(|message| !hidden.contains(&message.id)),
        prefs.time_window,
        now,
    );

    let channel_counts = channel_counts(windowed.iter().copied());
    let keyword_counts = keyword_counts(&windowed, &snapshot.keywords);

    let activity = effective_activity(snapshot, prefs);
    let filter = MessageFilter {
        active_channels: &activity,
        query: &prefs.query,
        active_keywords: &prefs.active_keywords,
    };
    let visible = filter.apply(windowed.iter().copied());

    let summary = PageSummary::new(visible.len(), prefs.records_per_page, prefs.current_page);
    let page = paginate(&visible, summary.page_size, summary.page).to_vec();

    FeedView {
        page,
        summary,
        channel_counts,
        keyword_counts,
    }
}
