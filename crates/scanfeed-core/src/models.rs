use std::collections::BTreeMap;
use std::fmt;

use chrono_tz::Tz;
use serde::Deserialize;
use serde::Serialize;

pub type ChannelId = String;
pub type MessageId = i64;

/// Text shown for recordings the transcriber produced nothing for.
pub const NO_TRANSCRIPTION: &str = "No transcription available";
const DEFAULT_PERSON: &str = "Driver";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChannelStatus {
    Online,
    Offline,
    Busy,
    RecordBegin,
    RecordEnd,
    Enabled,
    Disabled,
    Unknown(String),
}

impl ChannelStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Busy => "busy",
            Self::RecordBegin => "record_begin",
            Self::RecordEnd => "record_end",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Unknown(raw) => raw.as_str(),
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::RecordBegin)
    }
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self::Unknown(String::new())
    }
}

impl From<String> for ChannelStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            "busy" => Self::Busy,
            "record_begin" => Self::RecordBegin,
            "record_end" => Self::RecordEnd,
            "enabled" => Self::Enabled,
            "disabled" => Self::Disabled,
            _ => Self::Unknown(raw),
        }
    }
}

impl From<&str> for ChannelStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<ChannelStatus> for String {
    fn from(status: ChannelStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioTuning {
    pub sensitivity: Option<f64>,
    pub silence: Option<f64>,
    pub min_rec: Option<f64>,
    pub max_rec: Option<f64>,
    pub audio_gain: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub person: Option<String>,
    #[serde(default)]
    pub car: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub team_color: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub status: ChannelStatus,
    #[serde(flatten)]
    pub audio: AudioTuning,
    #[serde(rename = "isActive", default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Which parts of a message line are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayFields {
    pub time: bool,
    pub car: bool,
    pub channel: bool,
    pub person: bool,
}

impl Default for DisplayFields {
    fn default() -> Self {
        Self {
            time: true,
            car: true,
            channel: true,
            person: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayField {
    Time,
    Car,
    Channel,
    Person,
}

impl DisplayField {
    pub const ALL: [DisplayField; 4] = [Self::Time, Self::Car, Self::Channel, Self::Person];

    pub fn label(self) -> &'static str {
        match self {
            Self::Time => "TIME",
            Self::Car => "TAG",
            Self::Channel => "CHANNEL",
            Self::Person => "PERSON",
        }
    }
}

impl DisplayFields {
    pub fn get(&self, field: DisplayField) -> bool {
        match field {
            DisplayField::Time => self.time,
            DisplayField::Car => self.car,
            DisplayField::Channel => self.channel,
            DisplayField::Person => self.person,
        }
    }

    pub fn toggle(&mut self, field: DisplayField) {
        let slot = match field {
            DisplayField::Time => &mut self.time,
            DisplayField::Car => &mut self.car,
            DisplayField::Channel => &mut self.channel,
            DisplayField::Person => &mut self.person,
        };
        *slot = !*slot;
    }
}

impl Channel {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            driver: None,
            person: None,
            car: None,
            tag: None,
            color: None,
            background_color: None,
            team_color: None,
            mac: None,
            status: ChannelStatus::default(),
            audio: AudioTuning::default(),
            is_active: true,
        }
    }

    /// `tag-name-(person)`, each part gated by `fields`; empty parts skipped.
    pub fn label(&self, fields: &DisplayFields) -> String {
        let person = format!(
            "({})",
            self.person
                .as_deref()
                .filter(|person| !person.is_empty())
                .unwrap_or(DEFAULT_PERSON)
        );
        let parts = [
            fields.car.then(|| self.tag.clone().unwrap_or_default()),
            fields.channel.then(|| self.name.clone()),
            fields.person.then_some(person),
        ];
        parts
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn apply_update(&mut self, update: &ChannelUpdate) {
        fn merge<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
        fn merge_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        merge(&mut self.name, &update.name);
        merge_opt(&mut self.driver, &update.driver);
        merge_opt(&mut self.person, &update.person);
        merge_opt(&mut self.car, &update.car);
        merge_opt(&mut self.tag, &update.tag);
        merge_opt(&mut self.color, &update.color);
        merge_opt(&mut self.background_color, &update.background_color);
        merge_opt(&mut self.team_color, &update.team_color);
        merge_opt(&mut self.audio.sensitivity, &update.sensitivity);
        merge_opt(&mut self.audio.silence, &update.silence);
        merge_opt(&mut self.audio.min_rec, &update.min_rec);
        merge_opt(&mut self.audio.max_rec, &update.max_rec);
        merge_opt(&mut self.audio.audio_gain, &update.audio_gain);
    }
}

/// Partial channel settings; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_gain: Option<f64>,
}

impl ChannelUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageStatus {
    New,
    Queued,
    QueueFailed,
    Other(String),
}

impl MessageStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Queued => "queued",
            Self::QueueFailed => "queue_failed",
            Self::Other(raw) => raw.as_str(),
        }
    }
}

impl Default for MessageStatus {
    fn default() -> Self {
        Self::New
    }
}

impl From<String> for MessageStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "new" => Self::New,
            "queued" => Self::Queued,
            "queue_failed" => Self::QueueFailed,
            _ => Self::Other(raw),
        }
    }
}

impl From<MessageStatus> for String {
    fn from(status: MessageStatus) -> Self {
        status.as_str().to_string()
    }
}

/// One transcribed recording. `time` keeps the backend's compact
/// `YYYYMMDD_HHMMSS` form and is parsed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel: ChannelId,
    pub time: String,
    pub text: String,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub url: Option<String>,
}

/// Everything one full refresh produces, replaced wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub channels: BTreeMap<ChannelId, Channel>,
    /// Oldest first, as delivered by the backend.
    pub messages: Vec<Message>,
    pub keywords: Vec<String>,
    pub timezone: Tz,
    pub fetched_at_ms: Option<i64>,
}

impl Default for FeedSnapshot {
    fn default() -> Self {
        Self {
            channels: BTreeMap::new(),
            messages: Vec::new(),
            keywords: Vec::new(),
            timezone: Tz::UTC,
            fetched_at_ms: None,
        }
    }
}

impl FeedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.messages.is_empty() && self.keywords.is_empty()
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    /// Copy of `self` without message `id`; `None` when it is not present.
    pub fn without_message(&self, id: MessageId) -> Option<Self> {
        let position = self.messages.iter().position(|message| message.id == id)?;
        let mut next = self.clone();
        next.messages.remove(position);
        Some(next)
    }
}
