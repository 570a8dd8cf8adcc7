//! Load-time repair of the persisted record.
//!
//! The record is read as an untyped [`serde_json::Value`] first so that older
//! or hand-edited files can be coerced field by field instead of failing
//! outright. Only a broken outer structure (no `categories` array, null
//! entries) rejects the whole record.

use serde_json::Value;
use tracing::debug;

use crate::{
    constants::UNTITLED_CATEGORY,
    domain::{ActiveMarker, Category, CategoryId, Session, SessionId, Store},
    error::{Result, StopwatchError},
    id::generate_id,
};

pub fn repair_record(raw: &Value, now: i64) -> Result<Store> {
    if !raw.is_object() {
        return Err(malformed("record is not an object"));
    }

    let Some(entries) = raw.get("categories").and_then(Value::as_array) else {
        return Err(malformed("`categories` is not an array"));
    };

    let categories = entries
        .iter()
        .map(|entry| repair_category(entry, now))
        .collect::<Result<Vec<_>>>()?;

    Ok(Store {
        categories,
        active: raw.get("active").and_then(|active| repair_active(active, now)),
    })
}

pub fn repair_category(raw: &Value, now: i64) -> Result<Category> {
    if raw.is_null() {
        return Err(malformed("category entry is null"));
    }

    let sessions = match raw.get("sessions").and_then(Value::as_array) {
        Some(entries) => entries
            .iter()
            .map(|entry| repair_session(entry, now))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    let mut category = Category {
        id: CategoryId::new(coerce_id(raw.get("id"))),
        name: coerce_name(raw.get("name")),
        total_ms: 0,
        sessions,
    };
    category.recalc_total();
    Ok(category)
}

pub fn repair_session(raw: &Value, now: i64) -> Result<Session> {
    if raw.is_null() {
        return Err(malformed("session entry is null"));
    }

    let start = coerce_timestamp(raw.get("start")).unwrap_or(now);
    let end = coerce_timestamp(raw.get("end"))
        .or_else(|| coerce_timestamp(raw.get("start")))
        .unwrap_or(now);

    Ok(Session {
        id: SessionId::new(coerce_id(raw.get("id"))),
        start,
        end,
        duration_ms: coerce_duration(raw.get("durationMs")),
    })
}

/// Keeps the marker only when it names a category. A start in the future is
/// pulled back to `now`.
pub fn repair_active(raw: &Value, now: i64) -> Option<ActiveMarker> {
    let category_id = match raw.get("categoryId")? {
        Value::String(id) if !id.is_empty() => id.clone(),
        Value::Number(id) if id.as_f64().is_some_and(|n| n != 0.0) => id.to_string(),
        _ => return None,
    };

    let start = coerce_timestamp(raw.get("start")).unwrap_or(now);
    if start > now {
        debug!(start, now, "active marker started in the future, clamping");
    }

    Some(ActiveMarker {
        category_id: CategoryId::new(category_id),
        start: start.min(now),
    })
}

/// String ids are kept as they are; anything else gets a fresh id.
pub fn coerce_id(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(id)) => id.clone(),
        _ => generate_id(),
    }
}

pub fn coerce_name(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(name)) => name.clone(),
        _ => UNTITLED_CATEGORY.to_string(),
    }
}

/// A usable timestamp: numeric (or numeric text), finite, and non-zero.
pub fn coerce_timestamp(raw: Option<&Value>) -> Option<i64> {
    let value = numeric_value(raw);
    (value.is_finite() && value != 0.0).then(|| value.trunc() as i64)
}

/// Non-numeric or negative durations become zero.
pub fn coerce_duration(raw: Option<&Value>) -> u64 {
    let value = numeric_value(raw);
    if value.is_finite() && value > 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}

/// Loose numeric reading of a JSON value; `NaN` when there is no number.
fn numeric_value(raw: Option<&Value>) -> f64 {
    match raw {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Null) => 0.0,
        _ => f64::NAN,
    }
}

fn malformed(reason: &str) -> StopwatchError {
    StopwatchError::MalformedRecord(reason.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const NOW: i64 = 1_772_026_200_000;

    #[test]
    fn test_rejects_non_object_record() {
        assert!(repair_record(&json!(5), NOW).is_err());
        assert!(repair_record(&json!(null), NOW).is_err());
        assert!(repair_record(&json!([]), NOW).is_err());
    }

    #[test]
    fn test_rejects_missing_or_invalid_categories() {
        assert!(repair_record(&json!({}), NOW).is_err());
        assert!(repair_record(&json!({"categories": "nope"}), NOW).is_err());
        assert!(repair_record(&json!({"categories": {"a": 1}}), NOW).is_err());
    }

    #[test]
    fn test_rejects_null_entries() {
        assert!(repair_record(&json!({"categories": [null]}), NOW).is_err());
        assert!(
            repair_record(&json!({"categories": [{"id": "a", "sessions": [null]}]}), NOW).is_err()
        );
    }

    #[test]
    fn test_missing_sessions_default_to_empty() {
        let store = repair_record(
            &json!({"categories": [{"id": "a", "name": "Work", "totalMs": 9000}]}),
            NOW,
        )
        .unwrap();

        assert_eq!(store.categories.len(), 1);
        assert!(store.categories[0].sessions.is_empty());
        assert_eq!(store.categories[0].total_ms, 0);
    }

    #[test]
    fn test_total_is_recomputed_not_trusted() {
        let category = repair_category(
            &json!({
                "id": "a",
                "name": "Work",
                "totalMs": 1,
                "sessions": [
                    {"id": "s1", "start": 1000, "end": 2000, "durationMs": 1000},
                    {"id": "s2", "start": 3000, "end": 5000, "durationMs": 2000}
                ]
            }),
            NOW,
        )
        .unwrap();

        assert_eq!(category.total_ms, 3000);
    }

    #[test]
    fn test_coerce_id() {
        assert_eq!(coerce_id(Some(&json!("abc"))), "abc");
        assert_eq!(coerce_id(Some(&json!(""))), "");
        let regenerated = coerce_id(Some(&json!(42)));
        assert_eq!(regenerated.len(), 36);
        assert_ne!(coerce_id(None), coerce_id(None));
    }

    #[test]
    fn test_coerce_name() {
        assert_eq!(coerce_name(Some(&json!("Reading"))), "Reading");
        assert_eq!(coerce_name(Some(&json!(3))), UNTITLED_CATEGORY);
        assert_eq!(coerce_name(None), UNTITLED_CATEGORY);
    }

    #[test]
    fn test_coerce_timestamp() {
        assert_eq!(coerce_timestamp(Some(&json!(1234))), Some(1234));
        assert_eq!(coerce_timestamp(Some(&json!("1234"))), Some(1234));
        assert_eq!(coerce_timestamp(Some(&json!(1234.9))), Some(1234));
        assert_eq!(coerce_timestamp(Some(&json!(0))), None);
        assert_eq!(coerce_timestamp(Some(&json!("yesterday"))), None);
        assert_eq!(coerce_timestamp(Some(&json!(null))), None);
        assert_eq!(coerce_timestamp(Some(&json!({}))), None);
        assert_eq!(coerce_timestamp(None), None);
    }

    #[test]
    fn test_coerce_duration() {
        assert_eq!(coerce_duration(Some(&json!(5000))), 5000);
        assert_eq!(coerce_duration(Some(&json!("5000"))), 5000);
        assert_eq!(coerce_duration(Some(&json!(-20))), 0);
        assert_eq!(coerce_duration(Some(&json!("abc"))), 0);
        assert_eq!(coerce_duration(None), 0);
    }

    #[test]
    fn test_session_timestamps_fall_back() {
        let session = repair_session(&json!({"id": "s", "start": "bad", "end": "bad"}), NOW).unwrap();
        assert_eq!(session.start, NOW);
        assert_eq!(session.end, NOW);

        let session = repair_session(&json!({"id": "s", "start": 500}), NOW).unwrap();
        assert_eq!(session.start, 500);
        assert_eq!(session.end, 500);

        let session = repair_session(&json!({"id": "s", "start": 500, "end": 900}), NOW).unwrap();
        assert_eq!(session.end, 900);
    }

    #[test]
    fn test_session_negative_duration_clamps() {
        let session = repair_session(
            &json!({"id": "s", "start": 500, "end": 900, "durationMs": -400}),
            NOW,
        )
        .unwrap();
        assert_eq!(session.duration_ms, 0);
    }

    #[test]
    fn test_non_object_category_gets_defaults() {
        let category = repair_category(&json!(7), NOW).unwrap();
        assert_eq!(category.name, UNTITLED_CATEGORY);
        assert!(category.sessions.is_empty());
        assert!(!category.id.as_str().is_empty());
    }

    #[test]
    fn test_active_marker_requires_category_id() {
        assert!(repair_active(&json!({"start": 10}), NOW).is_none());
        assert!(repair_active(&json!({"categoryId": "", "start": 10}), NOW).is_none());
        assert!(repair_active(&json!({"categoryId": null}), NOW).is_none());
        assert!(repair_active(&json!("work"), NOW).is_none());

        let marker = repair_active(&json!({"categoryId": "work", "start": 10}), NOW).unwrap();
        assert_eq!(marker.category_id, CategoryId::new("work"));
        assert_eq!(marker.start, 10);
    }

    #[test]
    fn test_active_marker_start_repairs() {
        let marker = repair_active(&json!({"categoryId": "work"}), NOW).unwrap();
        assert_eq!(marker.start, NOW);

        let marker = repair_active(&json!({"categoryId": "work", "start": NOW + 60_000}), NOW).unwrap();
        assert_eq!(marker.start, NOW);
    }

    #[test]
    fn test_null_active_is_dropped() {
        let store = repair_record(&json!({"categories": [], "active": null}), NOW).unwrap();
        assert!(store.active.is_none());
    }

    #[test]
    fn test_well_formed_record_survives_serialization() {
        let mut store = Store::empty();
        let work = store.add_category("Work").unwrap();
        store.start_session(&work, NOW - 60_000);
        store.stop_active_session(NOW - 30_000);
        store.start_session(&work, NOW - 10_000);

        let value = serde_json::to_value(&store).unwrap();
        assert_eq!(repair_record(&value, NOW).unwrap(), store);
    }
}
