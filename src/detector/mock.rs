use crate::detector::{BoundingBox, Detection, DetectionSource, LandmarkSet, Point};
use std::collections::VecDeque;

const EYE_WIDTH: f64 = 30.0;
const LEFT_EYE_X: f64 = 100.0;
const RIGHT_EYE_X: f64 = 170.0;
const EYE_Y: f64 = 100.0;
const CENTERED_NOSE_TIP_X: f64 = 150.0;

/// Synthetic face geometry with controllable eye openness, roll and yaw.
#[derive(Debug, Clone, Copy)]
pub struct MockFace {
    pub eye_ratio: f64,
    pub right_eye_drop: f64,
    pub nose_tip_x: f64,
    pub left_eye_points: usize,
    pub has_landmarks: bool,
}

impl MockFace {
    /// Open eyes, level head, facing the camera: scores 100.
    pub fn attentive() -> Self {
        Self {
            eye_ratio: 0.3,
            right_eye_drop: 0.0,
            nose_tip_x: CENTERED_NOSE_TIP_X,
            left_eye_points: 6,
            has_landmarks: true,
        }
    }

    /// Both eyes at an aspect ratio of 0.15.
    pub fn eyes_closed() -> Self {
        Self {
            eye_ratio: 0.15,
            ..Self::attentive()
        }
    }

    /// Head rolled by 45 degrees: tilt penalty saturates at 50.
    pub fn tilted() -> Self {
        Self {
            right_eye_drop: 100.0,
            ..Self::attentive()
        }
    }

    /// Nose tip pulled towards the left jaw edge for a yaw ratio of 3: scores 35.
    pub fn turned_away() -> Self {
        Self {
            nose_tip_x: 100.0,
            ..Self::attentive()
        }
    }

    /// Left eye reported with 4 points instead of 6.
    pub fn degenerate_eye() -> Self {
        Self {
            left_eye_points: 4,
            ..Self::attentive()
        }
    }

    pub fn no_landmarks() -> Self {
        Self {
            has_landmarks: false,
            ..Self::attentive()
        }
    }

    pub fn landmarks(&self) -> Option<LandmarkSet> {
        if !self.has_landmarks {
            return None;
        }
        let mut left_eye = eye(LEFT_EYE_X, EYE_Y, self.eye_ratio);
        left_eye.truncate(self.left_eye_points);
        let right_eye = eye(RIGHT_EYE_X, EYE_Y + self.right_eye_drop, self.eye_ratio);
        let jaw = vec![
            Point::new(50.0, 150.0),
            Point::new(150.0, 250.0),
            Point::new(250.0, 150.0),
        ];
        let nose = vec![
            Point::new(150.0, 110.0),
            Point::new(150.0, 125.0),
            Point::new(150.0, 140.0),
            Point::new(self.nose_tip_x, 160.0),
        ];
        Some(LandmarkSet::new(left_eye, right_eye, jaw, nose))
    }

    pub fn detection_at(&self, slot: usize) -> Detection {
        Detection {
            bounding_box: BoundingBox {
                x: 40.0 + slot as f64 * 260.0,
                y: 60.0,
                width: 220.0,
                height: 220.0,
            },
            landmarks: self.landmarks(),
        }
    }
}

/// Six eye points whose aspect ratio equals `ratio`.
fn eye(x0: f64, y: f64, ratio: f64) -> Vec<Point> {
    let half_height = ratio * EYE_WIDTH / 2.0;
    vec![
        Point::new(x0, y),
        Point::new(x0 + EYE_WIDTH / 3.0, y - half_height),
        Point::new(x0 + 2.0 * EYE_WIDTH / 3.0, y - half_height),
        Point::new(x0 + EYE_WIDTH, y),
        Point::new(x0 + 2.0 * EYE_WIDTH / 3.0, y + half_height),
        Point::new(x0 + EYE_WIDTH / 3.0, y + half_height),
    ]
}

/// Build one detection batch, slot order following `faces`.
pub fn batch(faces: &[MockFace]) -> Vec<Detection> {
    faces
        .iter()
        .enumerate()
        .map(|(slot, face)| face.detection_at(slot))
        .collect()
}

/// Source that replays queued batches and then reports empty frames.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    batches: VecDeque<Vec<Detection>>,
    pulls: usize,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Vec<Detection>>) -> Self {
        Self {
            batches: batches.into(),
            pulls: 0,
        }
    }

    pub fn pulls(&self) -> usize {
        self.pulls
    }
}

impl DetectionSource for ScriptedSource {
    fn pull_detections(&mut self) -> Vec<Detection> {
        self.pulls += 1;
        self.batches.pop_front().unwrap_or_default()
    }
}
