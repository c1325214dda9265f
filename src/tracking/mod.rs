//! Per-person score tracking across ticks.
//!
//! Each tick the whole detection batch is scored, merged into the tracked
//! map by identity, and identities absent from the batch are dropped.
//! Distraction events fire once per downward crossing of the threshold.

use crate::detector::{BoundingBox, Detection};
use crate::scoring::{ScoringModel, bounded_score};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info};

pub mod identity;

use identity::{IdentityAssigner, PositionalAssigner};

pub type PersonId = u32;

pub const DEFAULT_HISTORY_CAPACITY: usize = 200;
pub const DEFAULT_DISTRACTION_THRESHOLD: u8 = 40;
pub const DEFAULT_LABEL_PREFIX: &str = "Student";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FocusSample {
    /// Session time in whole seconds.
    pub time: u64,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedPerson {
    pub id: PersonId,
    pub focus_score: u8,
    pub eyes_closed_ms: u64,
    /// Most recent samples only, capped at the configured capacity.
    pub focus_history: VecDeque<FocusSample>,
    /// Mean over every sample ever recorded, not just the retained history.
    pub average_focus: u8,
    pub last_box: BoundingBox,
    #[serde(skip)]
    score_sum: u64,
    #[serde(skip)]
    sample_count: u64,
}

impl TrackedPerson {
    pub fn new(id: PersonId, last_box: BoundingBox) -> Self {
        Self {
            id,
            focus_score: 0,
            eyes_closed_ms: 0,
            focus_history: VecDeque::new(),
            average_focus: 0,
            last_box,
            score_sum: 0,
            sample_count: 0,
        }
    }

    pub fn record(&mut self, time: u64, score: u8, history_capacity: usize) {
        self.focus_score = score;
        self.focus_history.push_back(FocusSample { time, score });
        while self.focus_history.len() > history_capacity {
            self.focus_history.pop_front();
        }
        self.score_sum += u64::from(score);
        self.sample_count += 1;
        self.average_focus = bounded_score(self.score_sum as f64 / self.sample_count as f64);
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistractionEvent {
    pub time: u64,
    pub person_id: PersonId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub history_capacity: usize,
    /// Scores below this count as distracted.
    pub distraction_threshold: u8,
    pub label_prefix: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            distraction_threshold: DEFAULT_DISTRACTION_THRESHOLD,
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
        }
    }
}

impl TrackerConfig {
    pub fn label_for(&self, id: PersonId) -> String {
        format!("{} {id}", self.label_prefix)
    }
}

#[derive(Debug)]
pub struct PersonTracker {
    model: Box<dyn ScoringModel>,
    assigner: Box<dyn IdentityAssigner>,
    config: TrackerConfig,
    tick_interval_ms: u64,
}

impl PersonTracker {
    pub fn new(model: Box<dyn ScoringModel>, config: TrackerConfig, tick_interval_ms: u64) -> Self {
        Self {
            model,
            assigner: Box::new(PositionalAssigner),
            config,
            tick_interval_ms,
        }
    }

    pub fn with_assigner(mut self, assigner: Box<dyn IdentityAssigner>) -> Self {
        self.assigner = assigner;
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Merge one detection batch into `persons` and return new distraction events.
    pub fn apply_batch(
        &mut self,
        persons: &mut BTreeMap<PersonId, TrackedPerson>,
        batch: &[Detection],
        now_secs: u64,
    ) -> Vec<DistractionEvent> {
        let ids = self.assigner.assign(batch, persons);
        let mut events = Vec::new();

        for (detection, &id) in batch.iter().zip(&ids) {
            let previous_score = persons.get(&id).map(|person| person.focus_score);
            let prior_closed_ms = persons.get(&id).map_or(0, |person| person.eyes_closed_ms);
            let result = self.model.score(
                detection.landmarks.as_ref(),
                prior_closed_ms,
                self.tick_interval_ms,
            );

            let person = persons.entry(id).or_insert_with(|| {
                debug!(person_id = id, "Tracking new person");
                TrackedPerson::new(id, detection.bounding_box)
            });
            person.eyes_closed_ms = result.eyes_closed_ms;
            person.last_box = detection.bounding_box;
            person.record(now_secs, result.score, self.config.history_capacity);

            if let Some(previous) = previous_score
                && self.crossed_below(previous, result.score)
            {
                let label = self.config.label_for(id);
                info!(
                    person_id = id,
                    time = now_secs,
                    previous,
                    score = result.score,
                    "{label}'s focus dropped"
                );
                events.push(DistractionEvent {
                    time: now_secs,
                    person_id: id,
                    label,
                });
            }
        }

        let present: BTreeSet<PersonId> = ids.into_iter().collect();
        persons.retain(|id, _| {
            let keep = present.contains(id);
            if !keep {
                debug!(person_id = *id, "Person left the frame");
            }
            keep
        });

        debug!(
            detections = batch.len(),
            tracked = persons.len(),
            events = events.len(),
            "Applied detection batch"
        );
        events
    }

    fn crossed_below(&self, previous: u8, current: u8) -> bool {
        let threshold = self.config.distraction_threshold;
        current < threshold && previous >= threshold
    }
}
