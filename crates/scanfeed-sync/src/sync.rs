//! Keeps one in-memory feed snapshot in step with the backend and the cache.
//!
//! Refreshes are single-flight: a refresh requested while another is running
//! returns [`RefreshOutcome::Skipped`]. Every refresh takes an epoch, and
//! deletes are tombstoned with the epoch current at the time, so messages
//! deleted while a refresh was in flight stay deleted when it lands.

use std::future::Future;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use std::time::Duration;

use chrono_tz::Tz;
use scanfeed_core::cache::keys;
use scanfeed_core::cache::CACHE_TTL;
use scanfeed_core::persistence::load_cached_snapshot;
use scanfeed_core::persistence::store_channels;
use scanfeed_core::persistence::store_messages;
use scanfeed_core::persistence::store_snapshot;
use scanfeed_core::timestamp::resolve_timezone_or_utc;
use scanfeed_core::CacheStore;
use scanfeed_core::ChannelUpdate;
use scanfeed_core::FeedSnapshot;
use scanfeed_core::MessageId;
use thiserror::Error;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::backend::BackendError;
use crate::backend::FeedBackend;
use crate::contracts::channels_from_records;
use crate::contracts::messages_from_records;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetch {endpoint} failed: {source}")]
    Fetch {
        endpoint: &'static str,
        #[source]
        source: BackendError,
    },
    #[error("delete message {id} failed: {source}")]
    Delete {
        id: MessageId,
        #[source]
        source: BackendError,
    },
    #[error("update channel {id} failed: {source}")]
    UpdateChannel {
        id: String,
        #[source]
        source: BackendError,
    },
    #[error("unknown channel {0}")]
    UnknownChannel(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Applied(Arc<FeedSnapshot>),
    /// Another refresh was already running.
    Skipped,
}

#[derive(Debug, Clone, Default)]
pub struct StartupReport {
    pub restored: Option<Arc<FeedSnapshot>>,
    pub refreshed: Option<RefreshOutcome>,
}

#[derive(Debug)]
struct FeedSlot {
    snapshot: Arc<FeedSnapshot>,
    /// Epoch of the refresh that produced `snapshot`; 0 for cache or empty.
    epoch: u64,
    /// Deleted ids with the latest epoch issued when they were deleted.
    tombstones: Vec<(MessageId, u64)>,
}

struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DataSync<B> {
    backend: B,
    cache: CacheStore,
    feed: RwLock<FeedSlot>,
    refreshing: AtomicBool,
    next_epoch: AtomicU64,
    cache_ttl: Duration,
    /// Used when the settings response names no timezone at all.
    fallback_timezone: Tz,
}

impl<B: FeedBackend> DataSync<B> {
    pub fn new(backend: B, cache: CacheStore) -> Self {
        Self {
            backend,
            cache,
            feed: RwLock::new(FeedSlot {
                snapshot: Arc::new(FeedSnapshot::default()),
                epoch: 0,
                tombstones: Vec::new(),
            }),
            refreshing: AtomicBool::new(false),
            next_epoch: AtomicU64::new(0),
            cache_ttl: CACHE_TTL,
            fallback_timezone: Tz::UTC,
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_fallback_timezone(mut self, timezone: Tz) -> Self {
        self.fallback_timezone = timezone;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn snapshot(&self) -> Arc<FeedSnapshot> {
        self.read_slot().snapshot.clone()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub fn cache_is_fresh(&self) -> bool {
        self.cache.is_fresh(keys::LAST_FETCH, self.cache_ttl)
    }

    /// Installs the cached snapshot, unless a refresh already landed.
    pub fn restore_from_cache(&self) -> Option<Arc<FeedSnapshot>> {
        let cached = Arc::new(load_cached_snapshot(&self.cache)?);
        let mut slot = self.write_slot();
        if slot.epoch > 0 {
            return None;
        }
        info!(
            channels = cached.channels.len(),
            messages = cached.messages.len(),
            "restored feed from cache"
        );
        slot.snapshot = cached.clone();
        Some(cached)
    }

    /// Full refresh only when the last successful fetch is older than the TTL.
    pub async fn refresh_if_stale(&self) -> Result<Option<RefreshOutcome>, SyncError> {
        if self.cache_is_fresh() {
            debug!("cached feed is fresh, skipping startup refresh");
            return Ok(None);
        }
        self.refresh().await.map(Some)
    }

    pub async fn start(&self) -> Result<StartupReport, SyncError> {
        let restored = self.restore_from_cache();
        let refreshed = self.refresh_if_stale().await?;
        Ok(StartupReport {
            restored,
            refreshed,
        })
    }

    /// Fetches channels, recordings and settings together and replaces the
    /// whole snapshot. Any failed request leaves state and cache untouched.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SyncError> {
        let Some(_guard) = RefreshGuard::acquire(&self.refreshing) else {
            debug!("refresh already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };
        let epoch = self.next_epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(epoch, "refresh started");

        let (channels, recordings, settings) = tokio::try_join!(
            tagged("/channels", self.backend.fetch_channels()),
            tagged("/recordings", self.backend.fetch_recordings()),
            tagged("/settings", self.backend.fetch_settings()),
        )?;

        let mut snapshot = FeedSnapshot {
            channels: channels_from_records(channels),
            messages: messages_from_records(recordings, self.backend.base_url()),
            keywords: settings.keywords,
            timezone: match settings.global_timezone.as_deref() {
                Some(name) => resolve_timezone_or_utc(Some(name)),
                None => self.fallback_timezone,
            },
            fetched_at_ms: Some(self.cache.now_ms()),
        };

        let snapshot = {
            let mut slot = self.write_slot();
            slot.tombstones
                .retain(|(_, deleted_at)| *deleted_at >= epoch);
            let tombstoned = &slot.tombstones;
            snapshot
                .messages
                .retain(|message| !tombstoned.iter().any(|(id, _)| *id == message.id));
            let snapshot = Arc::new(snapshot);
            slot.snapshot = snapshot.clone();
            slot.epoch = epoch;
            snapshot
        };

        store_snapshot(&self.cache, &snapshot);
        debug!(
            epoch,
            channels = snapshot.channels.len(),
            messages = snapshot.messages.len(),
            keywords = snapshot.keywords.len(),
            "refresh applied"
        );
        Ok(RefreshOutcome::Applied(snapshot))
    }

    /// Deletes on the backend first; local state changes only on success.
    pub async fn delete_message(&self, id: MessageId) -> Result<Arc<FeedSnapshot>, SyncError> {
        self.backend
            .delete_recording(id)
            .await
            .map_err(|source| SyncError::Delete { id, source })?;

        let snapshot = {
            let mut slot = self.write_slot();
            let issued = self.next_epoch.load(Ordering::Acquire);
            slot.tombstones.push((id, issued));
            if let Some(next) = slot.snapshot.without_message(id) {
                slot.snapshot = Arc::new(next);
            }
            slot.snapshot.clone()
        };
        store_messages(&self.cache, &snapshot.messages);
        info!(id, "message deleted");
        Ok(snapshot)
    }

    pub async fn update_channel(
        &self,
        id: &str,
        update: &ChannelUpdate,
    ) -> Result<Arc<FeedSnapshot>, SyncError> {
        if !self.snapshot().channels.contains_key(id) {
            return Err(SyncError::UnknownChannel(id.to_string()));
        }
        self.backend
            .update_channel(id, update)
            .await
            .map_err(|source| SyncError::UpdateChannel {
                id: id.to_string(),
                source,
            })?;

        let snapshot = {
            let mut slot = self.write_slot();
            let mut next = (*slot.snapshot).clone();
            if let Some(channel) = next.channels.get_mut(id) {
                channel.apply_update(update);
            }
            slot.snapshot = Arc::new(next);
            slot.snapshot.clone()
        };
        store_channels(&self.cache, &snapshot.channels);
        info!(id, "channel settings updated");
        Ok(snapshot)
    }

    pub async fn ping(&self) -> Result<(), SyncError> {
        self.backend.ping().await?;
        Ok(())
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, FeedSlot> {
        self.feed.read().unwrap_or_else(|poisoned| {
            warn!("feed lock poisoned, continuing");
            poisoned.into_inner()
        })
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, FeedSlot> {
        self.feed.write().unwrap_or_else(|poisoned| {
            warn!("feed lock poisoned, continuing");
            poisoned.into_inner()
        })
    }
}

async fn tagged<T>(
    endpoint: &'static str,
    request: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, SyncError> {
    request
        .await
        .map_err(|source| SyncError::Fetch { endpoint, source })
}
