//! Drives a [`DataSync`] from a poll timer and UI commands, reporting every
//! outcome as a [`SyncAction`] for the reducer.

use std::sync::Arc;
use std::time::Duration;

use scanfeed_core::ChannelId;
use scanfeed_core::ChannelUpdate;
use scanfeed_core::MessageId;
use scanfeed_core::SyncAction;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::backend::FeedBackend;
use crate::sync::DataSync;
use crate::sync::RefreshOutcome;

#[derive(Debug, Clone)]
pub enum SyncCommand {
    RefreshNow,
    Delete(MessageId),
    UpdateChannel {
        id: ChannelId,
        update: ChannelUpdate,
    },
    Shutdown,
}

/// Restores the cache, refreshes once if it is stale, then refreshes every
/// `poll_interval` until told to stop. A tick that lands while a refresh is
/// still running is dropped.
pub async fn run<B>(
    sync: Arc<DataSync<B>>,
    poll_interval: Duration,
    mut commands: UnboundedReceiver<SyncCommand>,
    events: UnboundedSender<SyncAction>,
) where
    B: FeedBackend + 'static,
{
    if let Some(snapshot) = sync.restore_from_cache() {
        emit(&events, SyncAction::CacheRestored(snapshot));
    }
    if !sync.cache_is_fresh() {
        emit(&events, SyncAction::LoadingStarted);
        report_refresh(&events, sync.refresh().await);
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;
    info!(interval_secs = poll_interval.as_secs(), "sync worker polling");

    loop {
        tokio::select! {
            _ = ticker.tick() => spawn_refresh(&sync, &events),
            command = commands.recv() => match command {
                None | Some(SyncCommand::Shutdown) => break,
                Some(SyncCommand::RefreshNow) => spawn_refresh(&sync, &events),
                Some(SyncCommand::Delete(id)) => spawn_delete(&sync, &events, id),
                Some(SyncCommand::UpdateChannel { id, update }) => {
                    spawn_channel_update(&sync, &events, id, update)
                }
            },
        }
    }
    info!("sync worker stopped");
}

fn spawn_refresh<B: FeedBackend + 'static>(
    sync: &Arc<DataSync<B>>,
    events: &UnboundedSender<SyncAction>,
) {
    if sync.is_refreshing() {
        debug!("tick while refresh in flight, dropped");
        return;
    }
    let sync = sync.clone();
    let events = events.clone();
    tokio::spawn(async move {
        report_refresh(&events, sync.refresh().await);
    });
}

fn spawn_delete<B: FeedBackend + 'static>(
    sync: &Arc<DataSync<B>>,
    events: &UnboundedSender<SyncAction>,
    id: MessageId,
) {
    let sync = sync.clone();
    let events = events.clone();
    tokio::spawn(async move {
        let action = match sync.delete_message(id).await {
            Ok(snapshot) => SyncAction::DeleteConfirmed { id, snapshot },
            Err(err) => {
                error!(id, error = %err, "delete failed");
                SyncAction::DeleteFailed {
                    id,
                    message: err.to_string(),
                }
            }
        };
        emit(&events, action);
    });
}

fn spawn_channel_update<B: FeedBackend + 'static>(
    sync: &Arc<DataSync<B>>,
    events: &UnboundedSender<SyncAction>,
    id: ChannelId,
    update: ChannelUpdate,
) {
    let sync = sync.clone();
    let events = events.clone();
    tokio::spawn(async move {
        let action = match sync.update_channel(&id, &update).await {
            Ok(snapshot) => SyncAction::SnapshotReplaced(snapshot),
            Err(err) => {
                error!(channel = %id, error = %err, "channel update failed");
                SyncAction::ChannelUpdateFailed {
                    id,
                    message: err.to_string(),
                }
            }
        };
        emit(&events, action);
    });
}

fn report_refresh(
    events: &UnboundedSender<SyncAction>,
    result: Result<RefreshOutcome, crate::sync::SyncError>,
) {
    match result {
        Ok(RefreshOutcome::Applied(snapshot)) => emit(events, SyncAction::SnapshotApplied(snapshot)),
        Ok(RefreshOutcome::Skipped) => {}
        Err(err) => {
            warn!(error = %err, "refresh failed");
            emit(events, SyncAction::RefreshFailed(err.to_string()));
        }
    }
}

fn emit(events: &UnboundedSender<SyncAction>, action: SyncAction) {
    if events.send(action).is_err() {
        debug!("sync event dropped, receiver gone");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use scanfeed_core::CacheStore;
    use scanfeed_core::SyncAction;
    use tokio::sync::mpsc;

    use super::*;
    use crate::testing::FakeBackend;

    fn spawn_worker(
        backend: FakeBackend,
    ) -> (
        mpsc::UnboundedSender<SyncCommand>,
        mpsc::UnboundedReceiver<SyncAction>,
        tokio::task::JoinHandle<()>,
    ) {
        let sync = Arc::new(DataSync::new(backend, CacheStore::in_memory()));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(sync, Duration::from_secs(5), command_rx, event_tx));
        (command_tx, event_rx, handle)
    }

    fn label(action: &SyncAction) -> &'static str {
        match action {
            SyncAction::ClockTick(_) => "tick",
            SyncAction::LoadingStarted => "loading",
            SyncAction::CacheRestored(_) => "restored",
            SyncAction::SnapshotApplied(_) => "applied",
            SyncAction::SnapshotReplaced(_) => "replaced",
            SyncAction::RefreshFailed(_) => "refresh_failed",
            SyncAction::DeleteConfirmed { .. } => "deleted",
            SyncAction::DeleteFailed { .. } => "delete_failed",
            SyncAction::ChannelUpdateFailed { .. } => "update_failed",
        }
    }

    async fn next_label(events: &mut mpsc::UnboundedReceiver<SyncAction>) -> &'static str {
        let action = events.recv().await.expect("event");
        label(&action)
    }

    #[tokio::test(start_paused = true)]
    async fn cold_start_loads_then_polls() {
        let (commands, mut events, handle) = spawn_worker(FakeBackend::seeded());

        assert_eq!(next_label(&mut events).await, "loading");
        assert_eq!(next_label(&mut events).await, "applied");

        // next tick five seconds later
        assert_eq!(next_label(&mut events).await, "applied");

        commands.send(SyncCommand::Shutdown).expect("send");
        handle.await.expect("worker");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_load_is_reported() {
        let backend = FakeBackend::seeded();
        backend.fail_recordings(true);
        let (commands, mut events, handle) = spawn_worker(backend);

        assert_eq!(next_label(&mut events).await, "loading");
        let failure = events.recv().await.expect("event");
        assert!(matches!(
            failure,
            SyncAction::RefreshFailed(ref message) if message.contains("/recordings")
        ));

        drop(commands);
        handle.await.expect("worker");
    }

    #[tokio::test(start_paused = true)]
    async fn delete_commands_report_their_outcome() {
        let backend = FakeBackend::seeded();
        let (commands, mut events, handle) = spawn_worker(backend.clone());
        assert_eq!(next_label(&mut events).await, "loading");
        assert_eq!(next_label(&mut events).await, "applied");

        commands.send(SyncCommand::Delete(11)).expect("send");
        let confirmed = loop {
            match events.recv().await.expect("event") {
                SyncAction::DeleteConfirmed { id, snapshot } => break (id, snapshot),
                SyncAction::SnapshotApplied(_) => continue,
                other => panic!("unexpected {other:?}"),
            }
        };
        assert_eq!(confirmed.0, 11);
        assert!(confirmed.1.message(11).is_none());

        backend.fail_deletes(true);
        commands.send(SyncCommand::Delete(10)).expect("send");
        let failed = loop {
            match events.recv().await.expect("event") {
                SyncAction::DeleteFailed { id, .. } => break id,
                SyncAction::SnapshotApplied(_) => continue,
                other => panic!("unexpected {other:?}"),
            }
        };
        assert_eq!(failed, 10);

        commands.send(SyncCommand::Shutdown).expect("send");
        handle.await.expect("worker");
    }

    #[tokio::test(start_paused = true)]
    async fn channel_update_for_unknown_channel_fails() {
        let (commands, mut events, handle) = spawn_worker(FakeBackend::seeded());
        assert_eq!(next_label(&mut events).await, "loading");
        assert_eq!(next_label(&mut events).await, "applied");

        commands
            .send(SyncCommand::UpdateChannel {
                id: "77".to_string(),
                update: ChannelUpdate::default(),
            })
            .expect("send");
        let failed = loop {
            match events.recv().await.expect("event") {
                SyncAction::ChannelUpdateFailed { id, .. } => break id,
                SyncAction::SnapshotApplied(_) => continue,
                other => panic!("unexpected {other:?}"),
            }
        };
        assert_eq!(failed, "77");

        commands.send(SyncCommand::Shutdown).expect("send");
        handle.await.expect("worker");
    }
}
