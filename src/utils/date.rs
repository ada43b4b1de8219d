use chrono::{DateTime, Duration, Utc};

use crate::consts::TIMESTAMP_FORMAT;

/// Current UTC time in the stored timestamp format
pub(crate) fn now_rfc3339() -> String {
    format_timestamp(Utc::now())
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn is_rfc3339(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
}

/// Cutoff timestamp `days` before `now`, clamped to the earliest
/// representable time.
pub(crate) fn days_before(now: DateTime<Utc>, days: u32) -> String {
    let cutoff = Duration::try_days(i64::from(days))
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    format_timestamp(cutoff)
}

/// Parse a window such as `30s`, `5m`, `2h`, `1d`, or bare seconds.
pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let invalid = || format!("Invalid duration \"{s}\" (expected e.g. 30s, 5m, 2h, 1d)");

    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], Some(c)),
        Some(_) => (s, None),
        None => return Err(invalid()),
    };
    let value: i64 = digits.parse().map_err(|_| invalid())?;
    if value < 0 {
        return Err(invalid());
    }
    let delta = match unit {
        None | Some('s') => Duration::try_seconds(value),
        Some('m') => Duration::try_minutes(value),
        Some('h') => Duration::try_hours(value),
        Some('d') => Duration::try_days(value),
        Some(_) => return Err(invalid()),
    };
    delta.ok_or_else(invalid)
}
