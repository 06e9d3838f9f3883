//! Debounced saving.
//!
//! [`AutoSave`] is a plain state machine driven by the caller's clock: edits
//! push the deadline back, [`AutoSave::poll`] reports when a save is due, and
//! the caller reports the outcome with [`AutoSave::finish_save`].

use std::time::{Duration, Instant};

use super::{Document, DocumentStore, DocumentUpdate, StoreError};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);
/// How long [`SaveStatus::Saved`] shows before going back to idle.
pub const SAVED_DISPLAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
}

#[derive(Debug, Clone)]
pub struct AutoSave {
    delay: Duration,
    deadline: Option<Instant>,
    pending: Option<DocumentUpdate>,
    in_flight: Option<DocumentUpdate>,
    status: SaveStatus,
    saved_at: Option<Instant>,
    unsaved: bool,
}

impl Default for AutoSave {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

/// Newer fields win; fields the newer update leaves alone keep the older value.
fn merge(older: DocumentUpdate, newer: DocumentUpdate) -> DocumentUpdate {
    DocumentUpdate {
        title: newer.title.or(older.title),
        content: newer.content.or(older.content),
        font: newer.font.or(older.font),
        variables: newer.variables.or(older.variables),
        comments: newer.comments.or(older.comments),
    }
}

impl AutoSave {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            pending: None,
            in_flight: None,
            status: SaveStatus::Idle,
            saved_at: None,
            unsaved: false,
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Record an edit and restart the countdown.
    pub fn on_edit(&mut self, update: DocumentUpdate, now: Instant) {
        self.pending = Some(match self.pending.take() {
            Some(older) => merge(older, update),
            None => update,
        });
        self.deadline = Some(now + self.delay);
        self.unsaved = true;
    }

    /// Advance timers. Returns the update to persist once the deadline has
    /// passed and no save is in flight.
    pub fn poll(&mut self, now: Instant) -> Option<DocumentUpdate> {
        if self.status == SaveStatus::Saved
            && self.saved_at.is_some_and(|at| now >= at + SAVED_DISPLAY)
        {
            self.status = SaveStatus::Idle;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => self.begin_save(),
            _ => None,
        }
    }

    /// Start a save of everything pending. `None` while another save is in
    /// flight or when there is nothing to save.
    pub fn begin_save(&mut self) -> Option<DocumentUpdate> {
        if self.in_flight.is_some() {
            return None;
        }
        let update = self.pending.take()?;
        self.deadline = None;
        self.in_flight = Some(update.clone());
        self.status = SaveStatus::Saving;
        Some(update)
    }

    /// Report the outcome of the save started by [`AutoSave::begin_save`].
    /// A failure is logged and the update is kept for the next attempt.
    pub fn finish_save(&mut self, result: Result<(), StoreError>, now: Instant) {
        match result {
            Ok(()) => self.record_success(now),
            Err(err) => self.record_failure(&err),
        }
    }

    fn record_success(&mut self, now: Instant) {
        self.in_flight = None;
        self.unsaved = self.pending.is_some();
        self.status = SaveStatus::Saved;
        self.saved_at = Some(now);
    }

    fn record_failure(&mut self, err: &StoreError) {
        log::warn!("autosave failed: {err}");
        if let Some(attempted) = self.in_flight.take() {
            self.pending = Some(match self.pending.take() {
                Some(newer) => merge(attempted, newer),
                None => attempted,
            });
        }
        self.status = SaveStatus::Idle;
    }

    /// Poll and, when a save is due, run it against `store`. Errors are
    /// swallowed.
    pub fn tick(&mut self, store: &mut dyn DocumentStore, id: &str, now: Instant) {
        if let Some(update) = self.poll(now) {
            let result = store.update(id, update).map(|_| ());
            self.finish_save(result, now);
        }
    }

    /// Save immediately, surfacing errors. `Ok(None)` when nothing was pending.
    pub fn save_now(
        &mut self,
        store: &mut dyn DocumentStore,
        id: &str,
        now: Instant,
    ) -> Result<Option<Document>, StoreError> {
        let Some(update) = self.begin_save() else {
            return Ok(None);
        };
        match store.update(id, update) {
            Ok(doc) => {
                self.record_success(now);
                Ok(Some(doc))
            }
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }
}
