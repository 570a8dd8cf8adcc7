use tracing::{error, info};

use crate::{
    domain::{CategoryId, SessionId, StopOutcome, Store},
    duration::parse_duration,
    error::Result,
    storage::{self, RecordStore},
};

/// The store together with the record it is persisted to. Every mutation that
/// changes state is written through before returning.
pub struct TimeTracker<B: RecordStore> {
    store: Store,
    backend: B,
}

impl<B: RecordStore> TimeTracker<B> {
    pub fn open(backend: B, now: i64) -> Self {
        let store = storage::load_store(&backend, now);
        info!(
            categories = store.categories.len(),
            active = store.active.is_some(),
            "stopwatch record loaded"
        );
        Self { store, backend }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// A refresh tick is only needed while a session is running.
    pub fn needs_tick(&self) -> bool {
        self.store.active.is_some()
    }

    pub fn add_category(&mut self, name: &str) -> Result<Option<CategoryId>> {
        let added = self.store.add_category(name);
        if let Some(id) = &added {
            info!(category_id = %id, name = name.trim(), "category created");
            self.persist()?;
        }
        Ok(added)
    }

    pub fn start_session(&mut self, category_id: &CategoryId, now: i64) -> Result<bool> {
        let started = self.store.start_session(category_id, now);
        if started {
            info!(category_id = %category_id, "timer started");
            self.persist()?;
        }
        Ok(started)
    }

    pub fn stop_active_session(&mut self, now: i64) -> Result<StopOutcome> {
        let outcome = self.store.stop_active_session(now);
        match &outcome {
            StopOutcome::NotActive => return Ok(outcome),
            StopOutcome::DanglingCleared => {
                info!("cleared timer of a deleted category");
            }
            StopOutcome::Recorded {
                category_id,
                session,
            } => {
                info!(
                    category_id = %category_id,
                    duration_ms = session.duration_ms,
                    "timer stopped"
                );
            }
        }
        self.persist()?;
        Ok(outcome)
    }

    pub fn edit_session_duration(
        &mut self,
        category_id: &CategoryId,
        session_id: &SessionId,
        duration_ms: u64,
    ) -> Result<bool> {
        let edited = self
            .store
            .edit_session_duration(category_id, session_id, duration_ms);
        if edited {
            info!(
                category_id = %category_id,
                session_id = %session_id,
                duration_ms,
                "session duration edited"
            );
            self.persist()?;
        }
        Ok(edited)
    }

    /// Parse user-entered duration text and apply it. Invalid text leaves
    /// the store untouched.
    pub fn edit_session_duration_text(
        &mut self,
        category_id: &CategoryId,
        session_id: &SessionId,
        text: &str,
    ) -> Result<bool> {
        let duration_ms = parse_duration(text)?;
        self.edit_session_duration(category_id, session_id, duration_ms)
    }

    pub fn delete_category(&mut self, category_id: &CategoryId) -> Result<bool> {
        let was_active = self.store.is_active(category_id);
        let deleted = self.store.delete_category(category_id);
        if deleted || was_active {
            info!(category_id = %category_id, "category deleted");
            self.persist()?;
        }
        Ok(deleted)
    }

    fn persist(&self) -> Result<()> {
        storage::save_store(&self.backend, &self.store).inspect_err(|e| {
            error!(error = %e, "failed to save stopwatch record");
        })
    }
}
