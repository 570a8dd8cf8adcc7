use chrono::{TimeZone, Utc};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Start of the calendar day containing `now_ms`, as seen in `tz`.
///
/// When local midnight does not exist (a DST jump at 00:00) the earliest
/// valid instant of that day is used instead.
pub fn day_start_ms<Tz: TimeZone>(now_ms: i64, tz: &Tz) -> i64 {
    let Some(now) = tz.timestamp_millis_opt(now_ms).single() else {
        return now_ms;
    };
    let date = now.date_naive();

    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map_or(now_ms, |start| start.timestamp_millis())
}
