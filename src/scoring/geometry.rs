//! Landmark geometry metrics.
//!
//! Every metric returns `None` for degenerate input instead of failing.

use crate::detector::Point;

pub const EYE_POINTS: usize = 6;
pub const MIN_JAW_POINTS: usize = 3;
pub const MIN_NOSE_POINTS: usize = 4;
const NOSE_TIP_INDEX: usize = 3;

/// Eye aspect ratio: `(|p2-p6| + |p3-p5|) / (2 * |p1-p4|)`.
pub fn eye_aspect_ratio(eye: &[Point]) -> Option<f64> {
    if eye.len() != EYE_POINTS {
        return None;
    }
    let vertical = eye[1].distance(eye[5]) + eye[2].distance(eye[4]);
    let horizontal = eye[0].distance(eye[3]);
    if horizontal == 0.0 {
        return None;
    }
    Some(vertical / (2.0 * horizontal))
}

/// Signed angle in degrees of the line from the left eye's outer corner to
/// the right eye's fourth point.
pub fn head_roll_degrees(left_eye: &[Point], right_eye: &[Point]) -> Option<f64> {
    if left_eye.len() != EYE_POINTS || right_eye.len() != EYE_POINTS {
        return None;
    }
    let from = left_eye[0];
    let to = right_eye[3];
    Some((to.y - from.y).atan2(to.x - from.x) * (180.0 / std::f64::consts::PI))
}

/// Ratio of the larger to the smaller horizontal jaw-edge to nose-tip
/// distance. Always at least 1 when defined.
pub fn head_yaw_ratio(jaw: &[Point], nose: &[Point]) -> Option<f64> {
    if jaw.len() < MIN_JAW_POINTS || nose.len() < MIN_NOSE_POINTS {
        return None;
    }
    let tip = nose[NOSE_TIP_INDEX];
    let left = (jaw[0].x - tip.x).abs();
    let right = (jaw[jaw.len() - 1].x - tip.x).abs();
    if left == 0.0 || right == 0.0 {
        return None;
    }
    Some(left.max(right) / left.min(right))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn ear_of_open_eye() {
        let eye = points(&[
            (0.0, 0.0),
            (10.0, -3.0),
            (20.0, -3.0),
            (30.0, 0.0),
            (20.0, 3.0),
            (10.0, 3.0),
        ]);

        let ear = eye_aspect_ratio(&eye).expect("defined");

        assert!((ear - 0.2).abs() < 1e-12);
    }

    #[test]
    fn ear_requires_six_points() {
        let eye = points(&[(0.0, 0.0), (10.0, -3.0), (20.0, -3.0), (30.0, 0.0)]);

        assert_eq!(eye_aspect_ratio(&eye), None);
        assert_eq!(eye_aspect_ratio(&[]), None);
    }

    #[test]
    fn ear_undefined_when_corners_coincide() {
        let eye = points(&[
            (5.0, 0.0),
            (10.0, -3.0),
            (20.0, -3.0),
            (5.0, 0.0),
            (20.0, 3.0),
            (10.0, 3.0),
        ]);

        assert_eq!(eye_aspect_ratio(&eye), None);
    }

    #[test]
    fn roll_is_signed_angle() {
        let left = points(&[(0.0, 0.0); 6]);
        let mut right = points(&[(0.0, 0.0); 6]);
        right[3] = Point::new(100.0, 0.0);
        assert_eq!(head_roll_degrees(&left, &right), Some(0.0));

        right[3] = Point::new(100.0, -100.0);
        let roll = head_roll_degrees(&left, &right).expect("defined");
        assert!((roll + 45.0).abs() < 1e-9);

        right[3] = Point::new(-100.0, 0.0);
        let roll = head_roll_degrees(&left, &right).expect("defined");
        assert!((roll - 180.0).abs() < 1e-9);
    }

    #[test]
    fn roll_requires_both_eyes() {
        let six = points(&[(0.0, 0.0); 6]);
        let five = points(&[(0.0, 0.0); 5]);

        assert_eq!(head_roll_degrees(&five, &six), None);
        assert_eq!(head_roll_degrees(&six, &five), None);
    }

    #[test]
    fn yaw_ratio_is_symmetric_and_at_least_one() {
        let jaw = points(&[(0.0, 0.0), (50.0, 80.0), (200.0, 0.0)]);
        let toward_left = points(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (50.0, 10.0)]);
        let toward_right = points(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (150.0, 10.0)]);

        assert_eq!(head_yaw_ratio(&jaw, &toward_left), Some(3.0));
        assert_eq!(head_yaw_ratio(&jaw, &toward_right), Some(3.0));
    }

    #[test]
    fn yaw_undefined_for_short_regions_or_zero_distance() {
        let jaw = points(&[(0.0, 0.0), (50.0, 80.0), (200.0, 0.0)]);
        let short_jaw = points(&[(0.0, 0.0), (200.0, 0.0)]);
        let nose = points(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (100.0, 10.0)]);
        let short_nose = points(&[(0.0, 0.0), (0.0, 0.0), (100.0, 10.0)]);
        let nose_on_edge = points(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, 10.0)]);

        assert_eq!(head_yaw_ratio(&jaw, &nose), Some(1.0));
        assert_eq!(head_yaw_ratio(&short_jaw, &nose), None);
        assert_eq!(head_yaw_ratio(&jaw, &short_nose), None);
        assert_eq!(head_yaw_ratio(&jaw, &nose_on_edge), None);
    }
}
