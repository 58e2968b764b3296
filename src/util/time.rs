use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};

/// Date format used for task days (`2025-05-14`)
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Time format used for task times (`09:30`)
pub const TIME_FORMAT: &str = "%H:%M";

/// RFC 3339 stamp (UTC, millisecond precision) for an epoch-millisecond instant
pub fn rfc3339_from_millis(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).ok()
}

/// Epoch milliseconds for a wall-clock date and time in the local timezone.
/// Ambiguous times (DST fold) resolve to the earlier instant; skipped times yield `None`.
pub fn local_millis(date: NaiveDate, time: NaiveTime) -> Option<i64> {
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

/// Parse `YYYY-MM-DD HH:MM` as local time into epoch milliseconds
pub fn parse_local_datetime(s: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M").ok()?;
    local_millis(naive.date(), naive.time())
}

/// Local `YYYY-MM-DD HH:MM` rendering of an epoch-millisecond instant
pub fn format_local(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => rfc3339_from_millis(ms),
    }
}

/// Local `HH:MM` rendering of an epoch-millisecond instant
pub fn format_local_hm(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format(TIME_FORMAT).to_string(),
        None => rfc3339_from_millis(ms),
    }
}

/// Local calendar date/time for an epoch-millisecond instant
pub fn local_naive(ms: i64) -> Option<NaiveDateTime> {
    Local
        .timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.naive_local())
}
