//! In-process backend for DataSync and worker tests.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use scanfeed_core::ChannelUpdate;
use scanfeed_core::MessageId;
use serde_json::json;
use tokio::sync::Notify;

use crate::backend::BackendError;
use crate::backend::FeedBackend;
use crate::contracts::ChannelRecord;
use crate::contracts::RecordingRecord;
use crate::contracts::SettingsRecord;

#[derive(Debug, Default)]
struct FakeState {
    channels: Vec<ChannelRecord>,
    recordings: Vec<RecordingRecord>,
    settings: SettingsRecord,
    fail_recordings: bool,
    fail_deletes: bool,
    fail_ping: bool,
    recordings_gate: Option<Arc<Notify>>,
    channel_updates: Vec<(String, ChannelUpdate)>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
    recording_fetches: Arc<AtomicUsize>,
}

fn recording(id: i64, channel: &str, timestamp: &str, text: &str) -> RecordingRecord {
    serde_json::from_value(json!({
        "id": id,
        "channel_id": channel,
        "timestamp": timestamp,
        "filename": format!("recordings\\ch{channel}\\{id}.wav"),
        "transcription": text,
    }))
    .expect("recording record")
}

impl FakeBackend {
    /// Two live channels, one disabled, three recordings.
    pub(crate) fn seeded() -> Self {
        let channels: Vec<ChannelRecord> = serde_json::from_value(json!([
            {"id": 1, "name": "Pit", "status": "online", "tag": "44", "sensitivity": "75"},
            {"id": 2, "name": "Race", "status": "busy"},
            {"id": 3, "name": "Spare", "status": "disabled"},
        ]))
        .expect("channel records");
        let backend = Self::default();
        {
            let mut state = backend.lock();
            state.channels = channels;
            state.recordings = vec![
                recording(10, "1", "20250312_110000", "box box"),
                recording(11, "2", "20250312_111000", "yellow flag sector 2"),
                recording(12, "1", "20250312_112000", "box this lap"),
            ];
            state.settings = SettingsRecord {
                keywords: vec!["box".to_string(), "flag".to_string()],
                global_timezone: Some("America/Chicago".to_string()),
            };
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) fn push_recording(&self, id: i64, channel: &str, timestamp: &str, text: &str) {
        self.lock()
            .recordings
            .push(recording(id, channel, timestamp, text));
    }

    pub(crate) fn fail_recordings(&self, fail: bool) {
        self.lock().fail_recordings = fail;
    }

    pub(crate) fn fail_deletes(&self, fail: bool) {
        self.lock().fail_deletes = fail;
    }

    pub(crate) fn fail_ping(&self, fail: bool) {
        self.lock().fail_ping = fail;
    }

    pub(crate) fn set_timezone(&self, timezone: Option<&str>) {
        self.lock().settings.global_timezone = timezone.map(str::to_string);
    }

    /// The next recordings fetch reads its data, then waits for the returned
    /// gate before answering.
    pub(crate) fn gate_recordings(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().recordings_gate = Some(gate.clone());
        gate
    }

    pub(crate) fn recording_fetches(&self) -> usize {
        self.recording_fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn channel_updates(&self) -> Vec<(String, ChannelUpdate)> {
        self.lock().channel_updates.clone()
    }
}

#[async_trait]
impl FeedBackend for FakeBackend {
    fn base_url(&self) -> &str {
        "http://edge.test"
    }

    async fn fetch_channels(&self) -> Result<Vec<ChannelRecord>, BackendError> {
        Ok(self.lock().channels.clone())
    }

    async fn fetch_recordings(&self) -> Result<Vec<RecordingRecord>, BackendError> {
        self.recording_fetches.fetch_add(1, Ordering::SeqCst);
        let (result, gate) = {
            let mut state = self.lock();
            let result = if state.fail_recordings {
                Err(BackendError::Unavailable("recordings offline".to_string()))
            } else {
                Ok(state.recordings.clone())
            };
            (result, state.recordings_gate.take())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }

    async fn fetch_settings(&self) -> Result<SettingsRecord, BackendError> {
        Ok(self.lock().settings.clone())
    }

    async fn delete_recording(&self, id: MessageId) -> Result<(), BackendError> {
        let mut state = self.lock();
        if state.fail_deletes {
            return Err(BackendError::Unavailable("delete rejected".to_string()));
        }
        state.recordings.retain(|record| record.id != id);
        Ok(())
    }

    async fn update_channel(&self, id: &str, update: &ChannelUpdate) -> Result<(), BackendError> {
        self.lock()
            .channel_updates
            .push((id.to_string(), update.clone()));
        Ok(())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        if self.lock().fail_ping {
            return Err(BackendError::Unavailable("no route to host".to_string()));
        }
        Ok(())
    }
}
