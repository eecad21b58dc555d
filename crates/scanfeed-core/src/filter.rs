//! Time-window and predicate filtering over the message log. Both stages keep
//! input order.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::models::ChannelId;
use crate::models::Message;
use crate::timestamp::parse_timestamp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeWindow {
    #[default]
    #[serde(rename = "All")]
    All,
    #[serde(rename = "Last 30 mins")]
    Last30Minutes,
    #[serde(rename = "Last 1 hour")]
    LastHour,
    #[serde(rename = "Last 2 hours")]
    Last2Hours,
    #[serde(rename = "Last 4 hours")]
    Last4Hours,
    #[serde(rename = "Last 8 hours")]
    Last8Hours,
    #[serde(rename = "Last 1 Day")]
    LastDay,
    #[serde(rename = "Last 2 Days")]
    Last2Days,
    #[serde(rename = "Last Week")]
    LastWeek,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 9] = [
        Self::All,
        Self::Last30Minutes,
        Self::LastHour,
        Self::Last2Hours,
        Self::Last4Hours,
        Self::Last8Hours,
        Self::LastDay,
        Self::Last2Days,
        Self::LastWeek,
    ];

    /// Window length; `None` for the unbounded window.
    pub fn minutes(self) -> Option<i64> {
        match self {
            Self::All => None,
            Self::Last30Minutes => Some(30),
            Self::LastHour => Some(60),
            Self::Last2Hours => Some(120),
            Self::Last4Hours => Some(240),
            Self::Last8Hours => Some(480),
            Self::LastDay => Some(1440),
            Self::Last2Days => Some(2880),
            Self::LastWeek => Some(10080),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Last30Minutes => "Last 30 mins",
            Self::LastHour => "Last 1 hour",
            Self::Last2Hours => "Last 2 hours",
            Self::Last4Hours => "Last 4 hours",
            Self::Last8Hours => "Last 8 hours",
            Self::LastDay => "Last 1 Day",
            Self::Last2Days => "Last 2 Days",
            Self::LastWeek => "Last Week",
        }
    }

    pub fn next(self) -> Self {
        let index = Self::ALL
            .iter()
            .position(|window| *window == self)
            .unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.minutes().map(|minutes| now - Duration::minutes(minutes))
    }

    pub fn contains(self, message: &Message, now: DateTime<Utc>) -> bool {
        let Some(cutoff) = self.cutoff(now) else {
            return true;
        };
        parse_timestamp(&message.time).is_ok_and(|instant| instant >= cutoff)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTimeWindow(pub String);

impl fmt::Display for UnknownTimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown time window {:?} (expected `all` or one of 30, 60, 120, 240, 480, 1440, 2880, 10080 minutes)",
            self.0
        )
    }
}

impl std::error::Error for UnknownTimeWindow {}

/// Accepts `all`, a label such as `Last 2 hours`, or a minute count.
impl FromStr for TimeWindow {
    type Err = UnknownTimeWindow;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        if let Some(window) = Self::ALL
            .iter()
            .find(|window| window.label().eq_ignore_ascii_case(trimmed))
        {
            return Ok(*window);
        }
        let minutes = trimmed
            .trim_end_matches('m')
            .parse::<i64>()
            .map_err(|_| UnknownTimeWindow(raw.to_string()))?;
        Self::ALL
            .iter()
            .find(|window| window.minutes() == Some(minutes))
            .copied()
            .ok_or_else(|| UnknownTimeWindow(raw.to_string()))
    }
}

/// Messages stamped at or after `now - window`. Unparseable timestamps only
/// survive the unbounded window.
pub fn within_window<'a, I>(messages: I, window: TimeWindow, now: DateTime<Utc>) -> Vec<&'a Message>
where
    I: IntoIterator<Item = &'a Message>,
{
    messages
        .into_iter()
        .filter(|message| window.contains(message, now))
        .collect()
}

/// Channel activity AND search text AND any-of active keywords.
#[derive(Debug, Clone, Copy)]
pub struct MessageFilter<'a> {
    pub active_channels: &'a BTreeMap<ChannelId, bool>,
    pub query: &'a str,
    pub active_keywords: &'a BTreeSet<String>,
}

impl<'a> MessageFilter<'a> {
    pub fn matches(&self, message: &Message) -> bool {
        if !self
            .active_channels
            .get(&message.channel)
            .copied()
            .unwrap_or(false)
        {
            return false;
        }

        let needs_text = !self.query.is_empty() || !self.active_keywords.is_empty();
        if !needs_text {
            return true;
        }
        let text = message.text.to_lowercase();

        if !self.query.is_empty() && !text.contains(&self.query.to_lowercase()) {
            return false;
        }

        self.active_keywords.is_empty()
            || self
                .active_keywords
                .iter()
                .any(|keyword| text.contains(&keyword.to_lowercase()))
    }

    pub fn apply<'m, I>(&self, messages: I) -> Vec<&'m Message>
    where
        I: IntoIterator<Item = &'m Message>,
    {
        messages
            .into_iter()
            .filter(|message| self.matches(message))
            .collect()
    }
}
