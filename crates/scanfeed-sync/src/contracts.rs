//! Backend wire records and their conversion into the core model.

use std::collections::BTreeMap;

use scanfeed_core::Channel;
use scanfeed_core::ChannelId;
use scanfeed_core::ChannelStatus;
use scanfeed_core::Message;
use scanfeed_core::MessageStatus;
use scanfeed_core::models::AudioTuning;
use scanfeed_core::models::NO_TRANSCRIPTION;
use serde::Deserialize;
use serde::Deserializer;

/// Integer or string on the wire; always a string here.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(id) => id.to_string(),
            RawId::Text(id) => id,
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

/// Number, numeric string, blank or null.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<RawNumber>::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawNumber::Number(value)) => Some(value),
        Some(RawNumber::Text(text)) => text.trim().parse::<f64>().ok(),
        None => None,
    })
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
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
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sensitivity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub silence: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min_rec: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_rec: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub audio_gain: Option<f64>,
}

impl ChannelRecord {
    fn into_channel(self) -> Channel {
        Channel {
            id: self.id,
            name: self.name.unwrap_or_default(),
            driver: self.driver,
            person: self.person,
            car: self.car,
            tag: self.tag,
            color: self.color,
            background_color: self.background_color,
            team_color: self.team_color,
            mac: self.mac,
            status: ChannelStatus::from(self.status.unwrap_or_default()),
            audio: AudioTuning {
                sensitivity: self.sensitivity,
                silence: self.silence,
                min_rec: self.min_rec,
                max_rec: self.max_rec,
                audio_gain: self.audio_gain,
            },
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecordingRecord {
    pub id: i64,
    #[serde(deserialize_with = "id_string")]
    pub channel_id: String,
    pub timestamp: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SettingsRecord {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub global_timezone: Option<String>,
}

/// Keyed by id; disabled channels are dropped and every channel starts active.
pub fn channels_from_records(records: Vec<ChannelRecord>) -> BTreeMap<ChannelId, Channel> {
    records
        .into_iter()
        .map(ChannelRecord::into_channel)
        .filter(|channel| channel.status != ChannelStatus::Disabled)
        .map(|channel| (channel.id.clone(), channel))
        .collect()
}

pub fn messages_from_records(records: Vec<RecordingRecord>, base_url: &str) -> Vec<Message> {
    records
        .into_iter()
        .map(|record| Message {
            id: record.id,
            channel: record.channel_id,
            time: record.timestamp,
            text: record
                .transcription
                .filter(|text| !text.is_empty())
                .unwrap_or_else(|| NO_TRANSCRIPTION.to_string()),
            status: record
                .status
                .map(MessageStatus::from)
                .unwrap_or_default(),
            url: record
                .filename
                .as_deref()
                .map(|filename| audio_url(base_url, filename)),
        })
        .collect()
}

/// `<base>/<filename>` with Windows separators normalized.
pub fn audio_url(base_url: &str, filename: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        filename.replace('\\', "/")
    )
}
