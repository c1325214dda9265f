//! Penalty heuristic scoring model.
//!
//! Formula: score = 100 - drowsiness - tilt - yaw, clamped to [0, 100]

use crate::detector::LandmarkSet;
use crate::scoring::geometry::{eye_aspect_ratio, head_roll_degrees, head_yaw_ratio};
use crate::scoring::{FocusScore, PenaltyBreakdown, ScoringModel, bounded_score};
use serde::Deserialize;

/// Heuristic model parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeuristicParams {
    pub baseline: f64,
    /// Average eye aspect ratio below which the eyes count as closed.
    pub closed_eye_ratio: f64,
    /// Closure tolerated before the drowsiness penalty starts.
    pub closed_grace_ms: u64,
    /// Milliseconds of closure per penalty point past the grace window.
    pub closed_ms_per_point: f64,
    pub drowsiness_cap: f64,
    /// Flat penalty when either eye cannot be resolved.
    pub unresolved_eyes_penalty: f64,
    pub tilt_threshold_degrees: f64,
    pub tilt_points_per_degree: f64,
    pub tilt_cap: f64,
    pub yaw_threshold_ratio: f64,
    pub yaw_points_per_ratio: f64,
    pub yaw_cap: f64,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self {
            baseline: 100.0,
            closed_eye_ratio: 0.21,
            closed_grace_ms: 600,
            closed_ms_per_point: 40.0,
            drowsiness_cap: 100.0,
            unresolved_eyes_penalty: 25.0,
            tilt_threshold_degrees: 15.0,
            tilt_points_per_degree: 2.0,
            tilt_cap: 50.0,
            yaw_threshold_ratio: 1.7,
            yaw_points_per_ratio: 50.0,
            yaw_cap: 80.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct HeuristicModel {
    pub params: HeuristicParams,
}

impl HeuristicModel {
    pub fn new(params: HeuristicParams) -> Self {
        Self { params }
    }

    pub fn with_defaults() -> Self {
        Self::new(HeuristicParams::default())
    }

    /// Returns the drowsiness penalty and the updated closure duration.
    fn drowsiness(
        &self,
        landmarks: &LandmarkSet,
        prior_closed_ms: u64,
        tick_interval_ms: u64,
    ) -> (f64, u64) {
        let p = &self.params;
        let (Some(left), Some(right)) = (
            eye_aspect_ratio(landmarks.left_eye()),
            eye_aspect_ratio(landmarks.right_eye()),
        ) else {
            return (p.unresolved_eyes_penalty, prior_closed_ms);
        };

        let average = (left + right) / 2.0;
        if average >= p.closed_eye_ratio {
            return (0.0, 0);
        }

        let closed_ms = prior_closed_ms.saturating_add(tick_interval_ms);
        if closed_ms <= p.closed_grace_ms {
            return (0.0, closed_ms);
        }
        let overdue = (closed_ms - p.closed_grace_ms) as f64;
        ((overdue / p.closed_ms_per_point).min(p.drowsiness_cap), closed_ms)
    }

    fn tilt(&self, landmarks: &LandmarkSet) -> f64 {
        let p = &self.params;
        match head_roll_degrees(landmarks.left_eye(), landmarks.right_eye()) {
            Some(angle) if angle.abs() > p.tilt_threshold_degrees => {
                let over = angle.abs() - p.tilt_threshold_degrees;
                (over * p.tilt_points_per_degree).min(p.tilt_cap)
            }
            _ => 0.0,
        }
    }

    fn yaw(&self, landmarks: &LandmarkSet) -> f64 {
        let p = &self.params;
        match head_yaw_ratio(landmarks.jaw_outline(), landmarks.nose()) {
            Some(ratio) if ratio > p.yaw_threshold_ratio => {
                ((ratio - p.yaw_threshold_ratio) * p.yaw_points_per_ratio).min(p.yaw_cap)
            }
            _ => 0.0,
        }
    }
}

impl ScoringModel for HeuristicModel {
    fn score(
        &self,
        landmarks: Option<&LandmarkSet>,
        prior_closed_ms: u64,
        tick_interval_ms: u64,
    ) -> FocusScore {
        let Some(landmarks) = landmarks else {
            return FocusScore {
                score: 0,
                eyes_closed_ms: prior_closed_ms,
                penalties: PenaltyBreakdown::default(),
            };
        };

        let (drowsiness, eyes_closed_ms) =
            self.drowsiness(landmarks, prior_closed_ms, tick_interval_ms);
        let penalties = PenaltyBreakdown {
            drowsiness,
            tilt: self.tilt(landmarks),
            yaw: self.yaw(landmarks),
        };

        FocusScore {
            score: bounded_score(self.params.baseline - penalties.total()),
            eyes_closed_ms,
            penalties,
        }
    }
}
