use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::app::OptionError;

/// Resolve a `--since` value to an instant.
///
/// Accepts `last` (the previous run, if any), a duration such as `1d` or
/// `12h` counted back from `now`, or an absolute UTC date/time. An empty
/// value means no lower bound.
pub fn parse_since(
    value: &str,
    now: DateTime<Utc>,
    last_run: Option<DateTime<Utc>>,
) -> Result<Option<DateTime<Utc>>, OptionError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value == "last" {
        return Ok(last_run);
    }
    if let Some(duration) = parse_duration(value) {
        return now
            .checked_sub_signed(duration)
            .map(Some)
            .ok_or_else(|| OptionError::InvalidSince(value.to_string()));
    }
    parse_datetime(value)
        .map(Some)
        .ok_or_else(|| OptionError::InvalidSince(value.to_string()))
}

/// Parse a duration string like "30s", "15m", "12h", "1d", "2w".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let unit = s.chars().last()?;
    let amount: i64 = s[..s.len() - unit.len_utf8()].parse().ok()?;
    if amount < 0 {
        return None;
    }

    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        'w' => Duration::try_weeks(amount),
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
