//! Text pieces shared by the dashboard and `tail`.

use chrono::DateTime;
use chrono::Utc;
use scanfeed_core::timestamp::format_timestamp;
use scanfeed_core::DisplayFields;
use scanfeed_core::FeedSnapshot;
use scanfeed_core::Message;
use scanfeed_core::NO_TRANSCRIPTION;

/// `[<relative time>]`, or the raw stamp when it cannot be parsed.
pub fn time_column(message: &Message, snapshot: &FeedSnapshot, now: DateTime<Utc>) -> String {
    let shown = format_timestamp(&message.time, snapshot.timezone, now)
        .unwrap_or_else(|_| message.time.clone());
    format!("[{shown}]")
}

/// Channel label for `message`; `None` for unknown channels or when every
/// label part is switched off.
pub fn channel_label(
    message: &Message,
    snapshot: &FeedSnapshot,
    fields: &DisplayFields,
) -> Option<String> {
    let label = snapshot.channels.get(&message.channel)?.label(fields);
    (!label.is_empty()).then_some(label)
}

/// Time column then label, each only when enabled and available.
pub fn message_prefix(
    message: &Message,
    snapshot: &FeedSnapshot,
    fields: &DisplayFields,
    now: DateTime<Utc>,
) -> String {
    let mut parts = Vec::with_capacity(2);
    if fields.time {
        parts.push(time_column(message, snapshot, now));
    }
    if let Some(label) = channel_label(message, snapshot, fields) {
        parts.push(label);
    }
    parts.join(" ")
}

pub fn message_text(message: &Message) -> &str {
    if message.text.trim().is_empty() {
        NO_TRANSCRIPTION
    } else {
        &message.text
    }
}
