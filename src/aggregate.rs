//! Class-wide views derived from the tracked people.
//!
//! Nothing here is stored; every view is recomputed from the current map.

use crate::scoring::bounded_score;
use crate::tracking::{DistractionEvent, FocusSample, PersonId, TrackedPerson};
use serde::Serialize;
use std::collections::BTreeMap;

pub const CLASS_LABEL: &str = "Class";
pub const SINGLE_LABEL: &str = "Your";

/// What the dashboard shows: either one selected person or the class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayData {
    pub label: String,
    pub score: u8,
    pub average: u8,
    pub history: Vec<FocusSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub duration_secs: u64,
    pub overall_average: u8,
    pub persons: Vec<TrackedPerson>,
    pub events: Vec<DistractionEvent>,
}

impl SessionSummary {
    pub fn build(
        duration_secs: u64,
        persons: &BTreeMap<PersonId, TrackedPerson>,
        events: &[DistractionEvent],
    ) -> Self {
        Self {
            duration_secs,
            overall_average: session_average(persons.values()),
            persons: persons.values().cloned().collect(),
            events: events.to_vec(),
        }
    }

    /// People ordered by session average, best first; ties by id.
    pub fn leaderboard(&self) -> Vec<&TrackedPerson> {
        let mut ranked: Vec<&TrackedPerson> = self.persons.iter().collect();
        ranked.sort_by(|a, b| {
            b.average_focus
                .cmp(&a.average_focus)
                .then_with(|| a.id.cmp(&b.id))
        });
        ranked
    }
}

fn rounded_mean(values: impl Iterator<Item = u8>) -> u8 {
    let (sum, count) = values.fold((0u64, 0u64), |(sum, count), value| {
        (sum + u64::from(value), count + 1)
    });
    if count == 0 {
        return 0;
    }
    bounded_score(sum as f64 / count as f64)
}

/// Mean of everyone's current score, 0 when nobody is tracked.
pub fn class_average<'a>(persons: impl IntoIterator<Item = &'a TrackedPerson>) -> u8 {
    rounded_mean(persons.into_iter().map(|person| person.focus_score))
}

/// Mean of everyone's whole-session average, 0 when nobody is tracked.
pub fn session_average<'a>(persons: impl IntoIterator<Item = &'a TrackedPerson>) -> u8 {
    rounded_mean(persons.into_iter().map(|person| person.average_focus))
}

/// One sample per distinct session time, averaging whoever was scored then.
pub fn combined_history<'a>(
    persons: impl IntoIterator<Item = &'a TrackedPerson>,
) -> Vec<FocusSample> {
    let mut by_time: BTreeMap<u64, (u64, u64)> = BTreeMap::new();
    for person in persons {
        for sample in &person.focus_history {
            let entry = by_time.entry(sample.time).or_insert((0, 0));
            entry.0 += u64::from(sample.score);
            entry.1 += 1;
        }
    }
    by_time
        .into_iter()
        .map(|(time, (sum, count))| FocusSample {
            time,
            score: bounded_score(sum as f64 / count as f64),
        })
        .collect()
}

/// Projection for the selected person, or the class when nothing tracked is
/// selected.
pub fn display_data(
    persons: &BTreeMap<PersonId, TrackedPerson>,
    selected: Option<PersonId>,
    label_prefix: &str,
) -> DisplayData {
    if let Some(person) = selected.and_then(|id| persons.get(&id)) {
        return DisplayData {
            label: format!("{label_prefix} {}", person.id),
            score: person.focus_score,
            average: person.average_focus,
            history: person.focus_history.iter().copied().collect(),
        };
    }

    let label = if persons.len() > 1 {
        CLASS_LABEL
    } else {
        SINGLE_LABEL
    };
    DisplayData {
        label: label.to_string(),
        score: class_average(persons.values()),
        average: session_average(persons.values()),
        history: combined_history(persons.values()),
    }
}

/// `MM:SS`, minutes not wrapped at the hour.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
