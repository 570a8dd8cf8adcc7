//! Duration text accepted when editing a session, and the canonical
//! `HH:MM:SS` rendering used everywhere a duration is shown.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, StopwatchError};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

static HH_MM_SS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):([0-5]\d):([0-5]\d)$").expect("valid regex"));
static MM_SS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-5]?\d):([0-5]\d)$").expect("valid regex"));
static MINUTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));

/// Parse `HH:MM:SS`, `MM:SS`, or a bare number of whole minutes into
/// milliseconds.
///
/// # Errors
///
/// Returns [`StopwatchError::InvalidDuration`] when the text matches none of
/// the accepted forms, or when the value exceeds `i64::MAX` milliseconds.
pub fn parse_duration(input: &str) -> Result<u64> {
    let normalized = input.trim();
    let invalid = || StopwatchError::InvalidDuration {
        input: input.to_string(),
    };

    let parsed = if let Some(caps) = HH_MM_SS.captures(normalized) {
        let hours: u64 = caps[1].parse().map_err(|_| invalid())?;
        let minutes: u64 = caps[2].parse().map_err(|_| invalid())?;
        let seconds: u64 = caps[3].parse().map_err(|_| invalid())?;
        hours
            .checked_mul(MS_PER_HOUR)
            .and_then(|ms| ms.checked_add(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND))
    } else if let Some(caps) = MM_SS.captures(normalized) {
        let minutes: u64 = caps[1].parse().map_err(|_| invalid())?;
        let seconds: u64 = caps[2].parse().map_err(|_| invalid())?;
        Some(minutes * MS_PER_MINUTE + seconds * MS_PER_SECOND)
    } else if MINUTES.is_match(normalized) {
        normalized
            .parse::<u64>()
            .ok()
            .and_then(|minutes| minutes.checked_mul(MS_PER_MINUTE))
    } else {
        None
    };

    // Session ends are i64 milliseconds, so longer durations cannot be stored.
    parsed
        .filter(|ms| i64::try_from(*ms).is_ok())
        .ok_or_else(invalid)
}

/// Render milliseconds as zero-padded `HH:MM:SS`. Hours are unbounded and the
/// sub-second remainder is dropped.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / MS_PER_SECOND;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}
