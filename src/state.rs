use crate::aggregate::{DisplayData, SessionSummary, display_data};
use crate::detector::Detection;
use crate::error::AppError;
use crate::tracking::{DistractionEvent, PersonId, PersonTracker, TrackedPerson};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Active,
}

/// Everything a monitoring session knows. Published as a snapshot after
/// every change; only `SessionEngine` mutates it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub elapsed_secs: u64,
    pub persons: BTreeMap<PersonId, TrackedPerson>,
    pub events: Vec<DistractionEvent>,
    pub selected: Option<PersonId>,
    /// Bumped whenever tracked data is wiped, so stale batches can be told apart.
    pub generation: u64,
    pub label_prefix: String,
    summary_ready: bool,
}

impl SessionState {
    pub fn new(label_prefix: impl Into<String>) -> Self {
        Self {
            phase: SessionPhase::Idle,
            elapsed_secs: 0,
            persons: BTreeMap::new(),
            events: Vec::new(),
            selected: None,
            generation: 0,
            label_prefix: label_prefix.into(),
            summary_ready: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn display_data(&self) -> DisplayData {
        display_data(&self.persons, self.selected, &self.label_prefix)
    }

    pub fn event_log(&self) -> &[DistractionEvent] {
        &self.events
    }

    /// Available once a session with a non-zero duration has been stopped,
    /// until the next start or reset.
    pub fn summary(&self) -> Option<SessionSummary> {
        if !self.summary_ready || self.is_active() {
            return None;
        }
        Some(SessionSummary::build(
            self.elapsed_secs,
            &self.persons,
            &self.events,
        ))
    }

    fn clear(&mut self) {
        self.elapsed_secs = 0;
        self.persons.clear();
        self.events.clear();
        self.selected = None;
        self.summary_ready = false;
        self.generation += 1;
    }
}

/// Single writer over `SessionState`.
#[derive(Debug)]
pub struct SessionEngine {
    state: SessionState,
    tracker: PersonTracker,
    state_tx: watch::Sender<SessionState>,
    /// Set by `stop`; lets exactly one batch pulled before the stop land.
    late_batch_pending: bool,
}

impl SessionEngine {
    pub fn new(tracker: PersonTracker) -> Self {
        let state = SessionState::new(tracker.config().label_prefix.clone());
        let (state_tx, _state_rx) = watch::channel(state.clone());
        Self {
            state,
            tracker,
            state_tx,
            late_batch_pending: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn start(&mut self) {
        if self.state.is_active() {
            info!(
                elapsed_secs = self.state.elapsed_secs,
                "Restarting active session"
            );
        }
        self.state.clear();
        self.late_batch_pending = false;
        self.state.phase = SessionPhase::Active;
        info!(generation = self.state.generation, "Session started");
        self.publish();
    }

    /// Returns the summary when the stopped session lasted at least a second.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        if !self.state.is_active() {
            warn!("Stop requested while no session is active");
            return None;
        }
        self.state.phase = SessionPhase::Idle;
        self.state.summary_ready = self.state.elapsed_secs > 0;
        self.late_batch_pending = true;
        info!(
            elapsed_secs = self.state.elapsed_secs,
            tracked = self.state.persons.len(),
            events = self.state.events.len(),
            "Session stopped"
        );
        self.publish();
        self.state.summary()
    }

    pub fn select(&mut self, selection: Option<PersonId>) -> Result<(), AppError> {
        if let Some(id) = selection
            && !self.state.persons.contains_key(&id)
        {
            return Err(AppError::UnknownPerson(id));
        }
        self.state.selected = selection;
        debug!(selected = ?selection, "Selection changed");
        self.publish();
        Ok(())
    }

    /// Dismiss the summary and wipe the finished session.
    pub fn reset_after_summary(&mut self) -> Result<(), AppError> {
        if self.state.is_active() {
            return Err(AppError::SessionActive);
        }
        self.state.clear();
        self.late_batch_pending = false;
        info!(generation = self.state.generation, "Session reset");
        self.publish();
        Ok(())
    }

    /// Apply a batch pulled during `generation`. Older generations are
    /// discarded. Once stopped, only the single batch that was already in
    /// flight is applied.
    pub fn apply_detections(&mut self, generation: u64, batch: &[Detection]) -> bool {
        if generation != self.state.generation {
            debug!(
                batch_generation = generation,
                generation = self.state.generation,
                "Discarding stale detection batch"
            );
            return false;
        }
        if !self.state.is_active() {
            if !self.late_batch_pending {
                debug!(generation, "Discarding detection batch after stop");
                return false;
            }
            self.late_batch_pending = false;
        }
        let now_secs = self.state.elapsed_secs;
        let events = self
            .tracker
            .apply_batch(&mut self.state.persons, batch, now_secs);
        self.state.events.extend(events);
        self.publish();
        true
    }

    /// One-second session clock tick.
    pub fn advance_clock(&mut self, generation: u64) -> bool {
        if !self.state.is_active() || generation != self.state.generation {
            return false;
        }
        self.state.elapsed_secs += 1;
        self.publish();
        true
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}
