use serde::{Deserialize, Serialize};

pub mod mock;
pub mod replay;

/// Number of points in the standard face landmark layout.
pub const POINTS_68: usize = 68;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two points.
    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Landmark geometry for one face, in frame pixel coordinates.
///
/// Shapes are not validated here. Eyes are expected to hold 6 points in the
/// canonical order (outer corner, two upper lid points, inner corner, two
/// lower lid points), the jaw outline at least 3 points ordered left to
/// right, and the nose at least 4 points with the tip at index 3. Anything
/// shorter makes the dependent metric undefined rather than an error.
///
/// Deserializes from either the region form or a flat 68-point array as
/// emitted by dlib-style detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LandmarkInput")]
pub struct LandmarkSet {
    left_eye: Vec<Point>,
    right_eye: Vec<Point>,
    jaw: Vec<Point>,
    nose: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(
        left_eye: Vec<Point>,
        right_eye: Vec<Point>,
        jaw: Vec<Point>,
        nose: Vec<Point>,
    ) -> Self {
        Self {
            left_eye,
            right_eye,
            jaw,
            nose,
        }
    }

    /// Split a 68-point landmark layout into its regions.
    pub fn from_points68(points: &[Point]) -> Option<Self> {
        if points.len() < POINTS_68 {
            return None;
        }
        Some(Self {
            jaw: points[0..17].to_vec(),
            nose: points[27..36].to_vec(),
            left_eye: points[36..42].to_vec(),
            right_eye: points[42..48].to_vec(),
        })
    }

    pub fn left_eye(&self) -> &[Point] {
        &self.left_eye
    }

    pub fn right_eye(&self) -> &[Point] {
        &self.right_eye
    }

    pub fn jaw_outline(&self) -> &[Point] {
        &self.jaw
    }

    pub fn nose(&self) -> &[Point] {
        &self.nose
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LandmarkInput {
    Regions {
        left_eye: Vec<Point>,
        right_eye: Vec<Point>,
        jaw: Vec<Point>,
        nose: Vec<Point>,
    },
    Points68(Vec<Point>),
}

impl TryFrom<LandmarkInput> for LandmarkSet {
    type Error = String;

    fn try_from(input: LandmarkInput) -> Result<Self, Self::Error> {
        match input {
            LandmarkInput::Regions {
                left_eye,
                right_eye,
                jaw,
                nose,
            } => Ok(Self::new(left_eye, right_eye, jaw, nose)),
            LandmarkInput::Points68(points) => Self::from_points68(&points).ok_or_else(|| {
                format!(
                    "expected {POINTS_68} landmark points, got {}",
                    points.len()
                )
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub landmarks: Option<LandmarkSet>,
}

/// Supplier of per-frame face detections.
///
/// Position in the returned batch is the only correlation key between
/// detections. A failed detection pass is reported as an empty batch.
pub trait DetectionSource {
    fn pull_detections(&mut self) -> Vec<Detection>;
}

impl<S: DetectionSource + ?Sized> DetectionSource for Box<S> {
    fn pull_detections(&mut self) -> Vec<Detection> {
        (**self).pull_detections()
    }
}
