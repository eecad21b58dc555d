//! Compact recording timestamps (`YYYYMMDD_HHMMSS...`, UTC wall clock) and
//! their display form relative to "today" in a named timezone.

use std::fmt;

use chrono::DateTime;
use chrono::Datelike;
use chrono::NaiveDate;
use chrono::TimeZone;
use chrono::Utc;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::warn;

/// Minimum number of characters a recording timestamp carries.
pub const TIMESTAMP_LEN: usize = 15;

const TIME_ONLY: &str = "%I:%M:%S %p";
const SAME_YEAR: &str = "%b %-d, %I:%M:%S %p";
const OTHER_YEAR: &str = "%b %-d, %Y, %I:%M:%S %p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimestampField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
        }
    }
}

impl fmt::Display for TimestampField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("timestamp {raw:?} is shorter than {TIMESTAMP_LEN} characters")]
    TooShort { raw: String },
    #[error("timestamp {raw:?} has a malformed {field} field")]
    Malformed { raw: String, field: TimestampField },
    #[error("timestamp {raw:?} does not name a real calendar date and time")]
    OutOfRange { raw: String },
}

/// Parses `YYYYMMDD_HHMMSS`; anything after the seconds field is ignored and
/// the separator at index 8 is not inspected.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    if raw.len() < TIMESTAMP_LEN {
        return Err(TimestampError::TooShort {
            raw: raw.to_string(),
        });
    }

    let year = numeric_field(raw, 0, 4, TimestampField::Year)?;
    let month = numeric_field(raw, 4, 6, TimestampField::Month)?;
    let day = numeric_field(raw, 6, 8, TimestampField::Day)?;
    let hour = numeric_field(raw, 9, 11, TimestampField::Hour)?;
    let minute = numeric_field(raw, 11, 13, TimestampField::Minute)?;
    let second = numeric_field(raw, 13, 15, TimestampField::Second)?;

    let out_of_range = || TimestampError::OutOfRange {
        raw: raw.to_string(),
    };
    let naive = NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(out_of_range)?;
    Ok(Utc.from_utc_datetime(&naive))
}

fn numeric_field(
    raw: &str,
    start: usize,
    end: usize,
    field: TimestampField,
) -> Result<u32, TimestampError> {
    let malformed = || TimestampError::Malformed {
        raw: raw.to_string(),
        field,
    };
    let digits = raw.get(start..end).ok_or_else(malformed)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    digits.parse::<u32>().map_err(|_| malformed())
}

/// Renders `instant` in `tz`:
/// - same calendar day as `now` → `hh:mm:ss AM`
/// - the day before → `Yesterday hh:mm:ss AM`
/// - otherwise → `Mon D, hh:mm:ss AM`, with the year inserted when it
///   differs from the current year.
pub fn format_relative(instant: DateTime<Utc>, tz: Tz, now: DateTime<Utc>) -> String {
    let local = instant.with_timezone(&tz);
    let today = now.with_timezone(&tz).date_naive();
    let date = local.date_naive();

    if date == today {
        local.format(TIME_ONLY).to_string()
    } else if today.pred_opt() == Some(date) {
        format!("Yesterday {}", local.format(TIME_ONLY))
    } else if date.year() != today.year() {
        local.format(OTHER_YEAR).to_string()
    } else {
        local.format(SAME_YEAR).to_string()
    }
}

pub fn format_timestamp(raw: &str, tz: Tz, now: DateTime<Utc>) -> Result<String, TimestampError> {
    parse_timestamp(raw).map(|instant| format_relative(instant, tz, now))
}

pub fn resolve_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}

/// Falls back to UTC (with a warning) for names the tz database does not know.
pub fn resolve_timezone_or_utc(name: Option<&str>) -> Tz {
    let Some(name) = name else {
        return Tz::UTC;
    };
    match resolve_timezone(name) {
        Some(tz) => tz,
        None => {
            warn!(timezone = name, "invalid timezone, falling back to UTC");
            Tz::UTC
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono::Utc;
    use chrono_tz::Tz;
    use pretty_assertions::assert_eq;

    use super::*;

    fn chicago() -> Tz {
        resolve_timezone("America/Chicago").expect("known zone")
    }

    // 13:00 CDT on 2025-03-12
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 12, 18, 0, 0).unwrap()
    }

    #[test]
    fn parses_fixed_width_fields_as_utc() {
        let parsed = parse_timestamp("20250311_111546").expect("parse");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 11, 11, 15, 46).unwrap());
    }

    #[test]
    fn ignores_trailing_characters() {
        let parsed = parse_timestamp("20250311_111546_ch3.wav").expect("parse");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 3, 11, 11, 15, 46).unwrap());
    }

    #[test]
    fn parse_errors_name_the_offending_field() {
        assert!(matches!(
            parse_timestamp("2025031"),
            Err(TimestampError::TooShort { .. })
        ));
        assert!(matches!(
            parse_timestamp("2025x311_111546"),
            Err(TimestampError::Malformed {
                field: TimestampField::Month,
                ..
            })
        ));
        assert!(matches!(
            parse_timestamp("20250311_11a546"),
            Err(TimestampError::Malformed {
                field: TimestampField::Minute,
                ..
            })
        ));
        assert!(matches!(
            parse_timestamp("20251311_111546"),
            Err(TimestampError::OutOfRange { .. })
        ));
    }

    #[test]
    fn same_day_renders_time_only() {
        let rendered = format_timestamp("20250312_150000", chicago(), now()).expect("format");
        assert_eq!(rendered, "10:00:00 AM");
    }

    #[test]
    fn prior_day_is_spelled_yesterday() {
        let rendered = format_timestamp("20250311_111546", chicago(), now()).expect("format");
        assert_eq!(rendered, "Yesterday 06:15:46 AM");
    }

    #[test]
    fn day_boundary_is_taken_in_the_target_zone() {
        // 03:00 UTC on the 12th is still the evening of the 11th in Chicago.
        let rendered = format_timestamp("20250312_030000", chicago(), now()).expect("format");
        assert_eq!(rendered, "Yesterday 10:00:00 PM");
    }

    #[test]
    fn older_dates_show_month_and_day() {
        let rendered = format_timestamp("20250310_170000", chicago(), now()).expect("format");
        assert_eq!(rendered, "Mar 10, 12:00:00 PM");
    }

    #[test]
    fn other_years_include_the_year() {
        let rendered = format_timestamp("20241231_120000", chicago(), now()).expect("format");
        assert_eq!(rendered, "Dec 31, 2024, 06:00:00 AM");
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        assert_eq!(resolve_timezone_or_utc(Some("Mars/Olympus_Mons")), Tz::UTC);
        assert_eq!(resolve_timezone_or_utc(None), Tz::UTC);
        assert_eq!(resolve_timezone_or_utc(Some(" America/Chicago ")), chicago());
    }
}
