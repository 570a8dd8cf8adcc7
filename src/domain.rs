use std::{collections::HashMap, fmt};

use chrono::{Local, TimeZone};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{clock, id::generate_id};

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        CategoryId(id.into())
    }

    pub fn generate() -> Self {
        CategoryId(generate_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    pub fn generate() -> Self {
        SessionId(generate_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One completed interval. Timestamps are milliseconds since the Unix epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub start: i64,
    pub end: i64,
    pub duration_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// Cached sum of session durations; rebuilt by [`Category::recalc_total`].
    pub total_ms: u64,
    pub sessions: Vec<Session>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CategoryId::generate(),
            name: name.into(),
            total_ms: 0,
            sessions: Vec::new(),
        }
    }

    pub fn recalc_total(&mut self) {
        self.total_ms = self
            .sessions
            .iter()
            .map(|session| session.duration_ms)
            .fold(0u64, u64::saturating_add);
    }

    pub fn session(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.iter().find(|s| &s.id == session_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMarker {
    pub category_id: CategoryId,
    pub start: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    NotActive,
    /// The active category was gone; the marker was dropped without a session.
    DanglingCleared,
    Recorded {
        category_id: CategoryId,
        session: Session,
    },
}

/// A session flattened out of its category for the recent-sessions feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub category_id: CategoryId,
    pub category_name: String,
    pub session: Session,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub categories: Vec<Category>,
    pub active: Option<ActiveMarker>,
}

impl Store {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn category(&self, category_id: &CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == category_id)
    }

    /// Resolve user input to a category: exact id, then exact name, then
    /// case-insensitive name.
    pub fn find_category(&self, query: &str) -> Option<&Category> {
        let query = query.trim();
        self.categories
            .iter()
            .find(|c| c.id.as_str() == query)
            .or_else(|| self.categories.iter().find(|c| c.name == query))
            .or_else(|| {
                self.categories
                    .iter()
                    .find(|c| c.name.to_lowercase() == query.to_lowercase())
            })
    }

    pub fn is_active(&self, category_id: &CategoryId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| &active.category_id == category_id)
    }

    pub fn active_category(&self) -> Option<&Category> {
        self.active
            .as_ref()
            .and_then(|active| self.category(&active.category_id))
    }

    pub fn add_category(&mut self, name: &str) -> Option<CategoryId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let category = Category::new(name);
        let id = category.id.clone();
        debug!(category_id = %id, name, "category added");
        self.categories.push(category);
        Some(id)
    }

    /// Returns `false` when nothing changed: the category is already active
    /// or does not exist.
    pub fn start_session(&mut self, category_id: &CategoryId, now: i64) -> bool {
        if self.is_active(category_id) || self.category(category_id).is_none() {
            return false;
        }

        self.stop_active_session(now);
        self.active = Some(ActiveMarker {
            category_id: category_id.clone(),
            start: now,
        });
        debug!(category_id = %category_id, start = now, "session started");
        true
    }

    pub fn stop_active_session(&mut self, now: i64) -> StopOutcome {
        let Some(active) = self.active.take() else {
            return StopOutcome::NotActive;
        };

        let Some(category) = self
            .categories
            .iter_mut()
            .find(|c| c.id == active.category_id)
        else {
            debug!(category_id = %active.category_id, "dropped marker for missing category");
            return StopOutcome::DanglingCleared;
        };

        let end = now.max(active.start);
        let session = Session {
            id: SessionId::generate(),
            start: active.start,
            end,
            duration_ms: elapsed_between(active.start, end),
        };
        category.sessions.push(session.clone());
        category.recalc_total();
        debug!(
            category_id = %category.id,
            duration_ms = session.duration_ms,
            "session recorded"
        );

        StopOutcome::Recorded {
            category_id: active.category_id,
            session,
        }
    }

    pub fn edit_session_duration(
        &mut self,
        category_id: &CategoryId,
        session_id: &SessionId,
        duration_ms: u64,
    ) -> bool {
        let Some(category) = self.categories.iter_mut().find(|c| &c.id == category_id) else {
            return false;
        };
        let Some(session) = category.sessions.iter_mut().find(|s| &s.id == session_id) else {
            return false;
        };

        let Some(end) = i64::try_from(duration_ms)
            .ok()
            .and_then(|ms| session.start.checked_add(ms))
        else {
            return false;
        };

        session.duration_ms = duration_ms;
        session.end = end;
        category.recalc_total();
        true
    }

    pub fn delete_category(&mut self, category_id: &CategoryId) -> bool {
        let before = self.categories.len();
        self.categories.retain(|c| &c.id != category_id);
        let removed = self.categories.len() != before;

        if self.is_active(category_id) {
            self.active = None;
        }
        removed
    }

    /// Elapsed time of the running session as of `now`, if one is running.
    pub fn active_elapsed(&self, now: i64) -> Option<u64> {
        self.active
            .as_ref()
            .map(|active| elapsed_between(active.start, now))
    }

    pub fn all_time_total(&self, category: &Category, now: i64) -> u64 {
        if self.is_active(&category.id) {
            category
                .total_ms
                .saturating_add(self.active_elapsed(now).unwrap_or(0))
        } else {
            category.total_ms
        }
    }

    pub fn today_totals_by_category(&self, now: i64) -> HashMap<CategoryId, u64> {
        self.today_totals_by_category_in(now, &Local)
    }

    /// Per-category time whose start falls on `now`'s calendar day in `tz`,
    /// including the running session when it started that day.
    pub fn today_totals_by_category_in<Tz: TimeZone>(
        &self,
        now: i64,
        tz: &Tz,
    ) -> HashMap<CategoryId, u64> {
        let day_start = clock::day_start_ms(now, tz);

        self.categories
            .iter()
            .map(|category| {
                let mut sum = category
                    .sessions
                    .iter()
                    .filter(|session| session.start >= day_start)
                    .map(|session| session.duration_ms)
                    .fold(0u64, u64::saturating_add);

                if let Some(active) = &self.active
                    && active.category_id == category.id
                    && active.start >= day_start
                {
                    sum = sum.saturating_add(elapsed_between(active.start, now));
                }

                (category.id.clone(), sum)
            })
            .collect()
    }

    /// All sessions across categories, most recently ended first.
    pub fn recent_sessions(&self, limit: usize) -> Vec<SessionRecord> {
        self.categories
            .iter()
            .flat_map(|category| {
                category.sessions.iter().map(|session| SessionRecord {
                    category_id: category.id.clone(),
                    category_name: category.name.clone(),
                    session: session.clone(),
                })
            })
            .sorted_by(|a, b| b.session.end.cmp(&a.session.end))
            .take(limit)
            .collect()
    }
}

fn elapsed_between(start: i64, end: i64) -> u64 {
    u64::try_from(end.saturating_sub(start)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    // 2026-02-25T00:00:00Z
    const DAY_START: i64 = 1_771_977_600_000;
    const HOUR: i64 = 3_600_000;

    fn session(id: &str, start: i64, end: i64) -> Session {
        Session {
            id: SessionId::new(id),
            start,
            end,
            duration_ms: (end - start) as u64,
        }
    }

    fn category(id: &str, name: &str, sessions: Vec<Session>) -> Category {
        let mut category = Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            total_ms: 0,
            sessions,
        };
        category.recalc_total();
        category
    }

    fn assert_totals_consistent(store: &Store) {
        for category in &store.categories {
            let sum: u64 = category.sessions.iter().map(|s| s.duration_ms).sum();
            assert_eq!(category.total_ms, sum, "total for {}", category.name);
        }
    }

    #[test]
    fn test_category_id_new() {
        let id1 = CategoryId::new("a");
        let id2 = CategoryId::new("b");
        assert_ne!(id1, id2);
        assert_eq!(id1, CategoryId::new("a"));
        assert_ne!(CategoryId::generate(), CategoryId::generate());
    }

    #[test]
    fn test_add_category_trims_and_rejects_blank() {
        let mut store = Store::empty();
        assert!(store.add_category("   ").is_none());

        let id = store.add_category("  Work ").unwrap();
        let category = store.category(&id).unwrap();
        assert_eq!(category.name, "Work");
        assert_eq!(category.total_ms, 0);
        assert!(category.sessions.is_empty());
    }

    #[test]
    fn test_start_then_stop_records_session() {
        let mut store = Store::empty();
        let work = store.add_category("Work").unwrap();

        assert!(store.start_session(&work, 1_000));
        let outcome = store.stop_active_session(61_000);

        let StopOutcome::Recorded {
            category_id,
            session,
        } = outcome
        else {
            panic!("expected a recorded session");
        };
        assert_eq!(category_id, work);
        assert_eq!(session.start, 1_000);
        assert_eq!(session.end, 61_000);
        assert_eq!(session.duration_ms, 60_000);
        assert!(store.active.is_none());
        assert_eq!(store.category(&work).unwrap().total_ms, 60_000);
    }

    #[test]
    fn test_start_same_category_is_noop() {
        let mut store = Store::empty();
        let work = store.add_category("Work").unwrap();

        assert!(store.start_session(&work, 1_000));
        assert!(!store.start_session(&work, 5_000));
        assert_eq!(store.active.as_ref().unwrap().start, 1_000);
        assert!(store.category(&work).unwrap().sessions.is_empty());
    }

    #[test]
    fn test_start_unknown_category_is_noop() {
        let mut store = Store::empty();
        assert!(!store.start_session(&CategoryId::new("missing"), 1_000));
        assert!(store.active.is_none());
    }

    #[test]
    fn test_switching_category_stops_previous_first() {
        let mut store = Store::empty();
        let work = store.add_category("Work").unwrap();
        let play = store.add_category("Play").unwrap();

        store.start_session(&work, 1_000);
        store.start_session(&play, 4_000);

        let work_sessions = &store.category(&work).unwrap().sessions;
        assert_eq!(work_sessions.len(), 1);
        assert_eq!(work_sessions[0].start, 1_000);
        assert_eq!(work_sessions[0].end, 4_000);
        assert!(work_sessions[0].end >= work_sessions[0].start);
        assert!(store.category(&play).unwrap().sessions.is_empty());
        assert_eq!(
            store.active,
            Some(ActiveMarker {
                category_id: play,
                start: 4_000
            })
        );
        assert_totals_consistent(&store);
    }

    #[test]
    fn test_stop_without_active_is_noop() {
        let mut store = Store::empty();
        store.add_category("Work");
        let before = store.clone();

        assert_eq!(store.stop_active_session(10_000), StopOutcome::NotActive);
        assert_eq!(store, before);
    }

    #[test]
    fn test_stop_clamps_backwards_clock() {
        let mut store = Store::empty();
        let work = store.add_category("Work").unwrap();
        store.start_session(&work, 10_000);

        store.stop_active_session(5_000);
        let recorded = &store.category(&work).unwrap().sessions[0];
        assert_eq!(recorded.duration_ms, 0);
        assert_eq!(recorded.end, recorded.start);
    }

    #[test]
    fn test_stop_with_dangling_marker_clears_it() {
        let mut store = Store {
            categories: vec![category("work", "Work", Vec::new())],
            active: Some(ActiveMarker {
                category_id: CategoryId::new("gone"),
                start: 1_000,
            }),
        };

        assert_eq!(
            store.stop_active_session(5_000),
            StopOutcome::DanglingCleared
        );
        assert!(store.active.is_none());
        assert!(store.categories[0].sessions.is_empty());
    }

    #[test]
    fn test_edit_session_duration_moves_end() {
        let mut store = Store {
            categories: vec![category(
                "work",
                "Work",
                vec![session("s1", 1_000, 2_000), session("s2", 5_000, 9_000)],
            )],
            active: None,
        };

        assert!(store.edit_session_duration(
            &CategoryId::new("work"),
            &SessionId::new("s1"),
            60_000
        ));

        let work = &store.categories[0];
        assert_eq!(work.sessions[0].duration_ms, 60_000);
        assert_eq!(work.sessions[0].end, 61_000);
        assert_eq!(work.total_ms, 64_000);
        assert_totals_consistent(&store);
    }

    #[test]
    fn test_edit_unknown_references_is_noop() {
        let mut store = Store {
            categories: vec![category("work", "Work", vec![session("s1", 0, 10)])],
            active: None,
        };
        let before = store.clone();

        assert!(!store.edit_session_duration(
            &CategoryId::new("nope"),
            &SessionId::new("s1"),
            5
        ));
        assert!(!store.edit_session_duration(
            &CategoryId::new("work"),
            &SessionId::new("nope"),
            5
        ));
        assert_eq!(store, before);
    }

    #[test]
    fn test_edit_past_end_of_time_is_rejected() {
        let mut store = Store {
            categories: vec![category("work", "Work", vec![session("s1", 1_000, 2_000)])],
            active: None,
        };
        let before = store.clone();

        assert!(!store.edit_session_duration(
            &CategoryId::new("work"),
            &SessionId::new("s1"),
            i64::MAX as u64
        ));
        assert!(!store.edit_session_duration(
            &CategoryId::new("work"),
            &SessionId::new("s1"),
            u64::MAX
        ));
        assert_eq!(store, before);

        let largest = (i64::MAX - 1_000) as u64;
        assert!(store.edit_session_duration(
            &CategoryId::new("work"),
            &SessionId::new("s1"),
            largest
        ));
        let edited = &store.categories[0].sessions[0];
        assert_eq!(edited.end, i64::MAX);
        assert_eq!((edited.end - edited.start) as u64, edited.duration_ms);
    }

    #[test]
    fn test_delete_active_category_leaves_no_phantom_session() {
        let mut store = Store::empty();
        let work = store.add_category("Work").unwrap();
        let play = store.add_category("Play").unwrap();
        store.start_session(&work, 1_000);

        assert!(store.delete_category(&work));
        assert!(store.active.is_none());
        assert_eq!(store.categories.len(), 1);
        assert!(store.category(&play).unwrap().sessions.is_empty());

        assert_eq!(store.stop_active_session(9_000), StopOutcome::NotActive);
    }

    #[test]
    fn test_delete_unknown_category_is_idempotent() {
        let mut store = Store::empty();
        let work = store.add_category("Work").unwrap();
        store.start_session(&work, 1_000);
        let before = store.clone();

        assert!(!store.delete_category(&CategoryId::new("nope")));
        assert_eq!(store, before);
    }

    #[test]
    fn test_recalc_total_sums_durations() {
        let mut work = category(
            "work",
            "Work",
            vec![session("a", 0, 100), session("b", 200, 500)],
        );
        work.total_ms = 12_345;
        work.recalc_total();
        assert_eq!(work.total_ms, 400);
    }

    #[test]
    fn test_all_time_total_includes_active_elapsed() {
        let mut store = Store {
            categories: vec![
                category("work", "Work", vec![session("a", 0, 1_000)]),
                category("play", "Play", vec![session("b", 0, 2_000)]),
            ],
            active: Some(ActiveMarker {
                category_id: CategoryId::new("work"),
                start: 10_000,
            }),
        };

        let work = store.categories[0].clone();
        let play = store.categories[1].clone();
        assert_eq!(store.all_time_total(&work, 15_000), 6_000);
        assert_eq!(store.all_time_total(&play, 15_000), 2_000);

        store.active = None;
        assert_eq!(store.all_time_total(&work, 15_000), 1_000);
    }

    #[test]
    fn test_active_elapsed() {
        let mut store = Store::empty();
        assert_eq!(store.active_elapsed(5_000), None);

        let work = store.add_category("Work").unwrap();
        store.start_session(&work, 1_000);
        assert_eq!(store.active_elapsed(5_000), Some(4_000));
        assert_eq!(store.active_elapsed(500), Some(0));
    }

    #[test]
    fn test_today_totals_exclude_sessions_before_midnight() {
        let store = Store {
            categories: vec![
                category(
                    "work",
                    "Work",
                    vec![
                        session("yesterday", DAY_START - 2 * HOUR, DAY_START - HOUR),
                        session("straddle", DAY_START - HOUR / 2, DAY_START + HOUR / 2),
                        session("morning", DAY_START + HOUR, DAY_START + 2 * HOUR),
                    ],
                ),
                category("play", "Play", Vec::new()),
            ],
            active: None,
        };

        let totals = store.today_totals_by_category_in(DAY_START + 10 * HOUR, &Utc);
        assert_eq!(totals[&CategoryId::new("work")], HOUR as u64);
        assert_eq!(totals[&CategoryId::new("play")], 0);
    }

    #[test]
    fn test_today_totals_include_live_session_started_today() {
        let now = DAY_START + 10 * HOUR;
        let mut store = Store {
            categories: vec![category(
                "work",
                "Work",
                vec![session("morning", DAY_START + HOUR, DAY_START + 2 * HOUR)],
            )],
            active: Some(ActiveMarker {
                category_id: CategoryId::new("work"),
                start: now - HOUR,
            }),
        };

        let totals = store.today_totals_by_category_in(now, &Utc);
        assert_eq!(totals[&CategoryId::new("work")], 2 * HOUR as u64);

        store.active = Some(ActiveMarker {
            category_id: CategoryId::new("work"),
            start: DAY_START - HOUR,
        });
        let totals = store.today_totals_by_category_in(now, &Utc);
        assert_eq!(totals[&CategoryId::new("work")], HOUR as u64);
    }

    #[test]
    fn test_recent_sessions_sorted_by_end_and_truncated() {
        let store = Store {
            categories: vec![
                category("work", "Work", vec![session("t10", 0, 10), session("t30", 25, 30)]),
                category("play", "Play", vec![session("t20", 15, 20)]),
            ],
            active: None,
        };

        let recent = store.recent_sessions(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].session.end, 30);
        assert_eq!(recent[0].category_name, "Work");
        assert_eq!(recent[1].session.end, 20);
        assert_eq!(recent[1].category_id, CategoryId::new("play"));

        assert_eq!(store.recent_sessions(20).len(), 3);
    }

    #[test]
    fn test_recent_sessions_keep_iteration_order_on_ties() {
        let store = Store {
            categories: vec![
                category("work", "Work", vec![session("first", 0, 10)]),
                category("play", "Play", vec![session("second", 5, 10)]),
            ],
            active: None,
        };

        let ids: Vec<_> = store
            .recent_sessions(20)
            .into_iter()
            .map(|record| record.session.id)
            .collect();
        assert_eq!(ids, vec![SessionId::new("first"), SessionId::new("second")]);
    }

    #[test]
    fn test_find_category_by_id_then_name() {
        let store = Store {
            categories: vec![
                category("abc", "Work", Vec::new()),
                category("def", "Reading", Vec::new()),
            ],
            active: None,
        };

        assert_eq!(store.find_category("def").unwrap().name, "Reading");
        assert_eq!(store.find_category("Work").unwrap().id, CategoryId::new("abc"));
        assert_eq!(store.find_category(" reading ").unwrap().id, CategoryId::new("def"));
        assert!(store.find_category("Gardening").is_none());
    }

    #[test]
    fn test_total_invariant_across_operations() {
        let mut store = Store::empty();
        let work = store.add_category("Work").unwrap();
        let play = store.add_category("Play").unwrap();

        store.start_session(&work, 0);
        store.start_session(&play, 1_000);
        store.start_session(&work, 3_000);
        store.stop_active_session(6_000);
        assert_totals_consistent(&store);

        let session_id = store.category(&work).unwrap().sessions[1].id.clone();
        store.edit_session_duration(&work, &session_id, 500);
        assert_totals_consistent(&store);
        assert_eq!(store.category(&work).unwrap().total_ms, 1_500);
        assert_eq!(store.category(&play).unwrap().total_ms, 2_000);
    }
}
