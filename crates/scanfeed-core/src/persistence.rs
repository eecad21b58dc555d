use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::cache::keys;
use crate::cache::CacheStore;
use crate::filter::TimeWindow;
use crate::models::Channel;
use crate::models::ChannelId;
use crate::models::DisplayFields;
use crate::models::FeedSnapshot;
use crate::models::Message;
use crate::paginate::DEFAULT_PAGE_SIZE;
use crate::paginate::PAGE_SIZE_OPTIONS;
use crate::timestamp::resolve_timezone_or_utc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPreferences {
    pub time_window: TimeWindow,
    pub fields: DisplayFields,
    /// Per-channel overrides of the snapshot's `isActive` flag.
    pub channel_visibility: BTreeMap<ChannelId, bool>,
    pub active_keywords: BTreeSet<String>,
    pub query: String,
    pub records_per_page: usize,
    pub current_page: usize,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            time_window: TimeWindow::All,
            fields: DisplayFields::default(),
            channel_visibility: BTreeMap::new(),
            active_keywords: BTreeSet::new(),
            query: String::new(),
            records_per_page: DEFAULT_PAGE_SIZE,
            current_page: 1,
        }
    }
}

impl ViewPreferences {
    /// Stored preferences, or defaults when absent or corrupt.
    pub fn load(cache: &CacheStore) -> Self {
        cache
            .get::<Self>(keys::VIEW_PREFERENCES)
            .unwrap_or_default()
            .sanitized()
    }

    pub fn save(&self, cache: &CacheStore) {
        cache.set(keys::VIEW_PREFERENCES, self);
    }

    pub fn sanitized(mut self) -> Self {
        if !PAGE_SIZE_OPTIONS.contains(&self.records_per_page) {
            self.records_per_page = DEFAULT_PAGE_SIZE;
        }
        self.current_page = self.current_page.max(1);
        self
    }
}

/// Rebuilds the last snapshot written by [`store_snapshot`]. Returns `None`
/// when nothing usable was cached.
pub fn load_cached_snapshot(cache: &CacheStore) -> Option<FeedSnapshot> {
    let channels = cache.get::<BTreeMap<ChannelId, Channel>>(keys::CHANNELS);
    let messages = cache.get::<Vec<Message>>(keys::MESSAGES);
    let keywords = cache.get::<Vec<String>>(keys::KEYWORDS);
    if channels.is_none() && messages.is_none() && keywords.is_none() {
        return None;
    }
    let timezone = cache.get::<String>(keys::TIMEZONE);
    Some(FeedSnapshot {
        channels: channels.unwrap_or_default(),
        messages: messages.unwrap_or_default(),
        keywords: keywords.unwrap_or_default(),
        timezone: resolve_timezone_or_utc(timezone.as_deref()),
        fetched_at_ms: cache.get::<i64>(keys::LAST_FETCH),
    })
}

/// Writes every part of `snapshot` and stamps the fetch time.
pub fn store_snapshot(cache: &CacheStore, snapshot: &FeedSnapshot) {
    store_channels(cache, &snapshot.channels);
    store_messages(cache, &snapshot.messages);
    cache.set(keys::KEYWORDS, &snapshot.keywords);
    cache.set(keys::TIMEZONE, snapshot.timezone.name());
    match snapshot.fetched_at_ms {
        Some(fetched_at_ms) => cache.set(keys::LAST_FETCH, &fetched_at_ms),
        None => cache.mark_written(keys::LAST_FETCH),
    }
}

pub fn store_messages(cache: &CacheStore, messages: &[Message]) {
    cache.set(keys::MESSAGES, messages);
}

pub fn store_channels(cache: &CacheStore, channels: &BTreeMap<ChannelId, Channel>) {
    cache.set(keys::CHANNELS, channels);
}
