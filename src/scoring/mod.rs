//! Focus scoring from landmark geometry.
//!
//! A `ScoringModel` turns one face's landmarks plus the carried eye-closure
//! duration into a bounded score. The heuristic model is the default and its
//! parameters can be overridden from the `[scoring]` config section.

use crate::detector::LandmarkSet;
use serde::{Deserialize, Serialize};

pub mod geometry;
pub mod heuristic;

use heuristic::{HeuristicModel, HeuristicParams};

pub const MAX_SCORE: u8 = 100;

/// Per-heuristic penalties, each already clamped to its own ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PenaltyBreakdown {
    pub drowsiness: f64,
    pub tilt: f64,
    pub yaw: f64,
}

impl PenaltyBreakdown {
    pub fn total(&self) -> f64 {
        self.drowsiness + self.tilt + self.yaw
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FocusScore {
    pub score: u8,
    pub eyes_closed_ms: u64,
    pub penalties: PenaltyBreakdown,
}

pub trait ScoringModel: Send + Sync + std::fmt::Debug {
    /// Score one face. `landmarks` is `None` when the detector found a face
    /// but no landmark geometry; that scores 0 and leaves the closure
    /// duration untouched.
    fn score(
        &self,
        landmarks: Option<&LandmarkSet>,
        prior_closed_ms: u64,
        tick_interval_ms: u64,
    ) -> FocusScore;
}

pub fn create_model(params: Option<HeuristicParams>) -> Box<dyn ScoringModel> {
    Box::new(HeuristicModel::new(params.unwrap_or_default()))
}

/// Coarse bucket used for colouring scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusBand {
    High,
    Medium,
    Low,
}

impl FocusBand {
    pub fn of(score: u8) -> Self {
        if score > 70 {
            Self::High
        } else if score > 40 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Clamp to `[0, 100]` and round half away from zero.
pub fn bounded_score(raw: f64) -> u8 {
    raw.clamp(0.0, f64::from(MAX_SCORE)).round() as u8
}
