//! Planar helpers over normalized image coordinates.

pub type Point = (f32, f32);

const MIN_LIMB_LENGTH: f32 = 1e-4;

pub fn distance(a: Point, b: Point) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

pub fn midpoint(a: Point, b: Point) -> Point {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// Interior angle at `vertex` in degrees (0..=180), from the signed angle
/// between `vertex -> a` and `vertex -> b`.
///
/// `None` when either limb has zero length.
pub fn interior_angle_deg(a: Point, vertex: Point, b: Point) -> Option<f32> {
    let v1 = (a.0 - vertex.0, a.1 - vertex.1);
    let v2 = (b.0 - vertex.0, b.1 - vertex.1);

    if v1.0.hypot(v1.1) < MIN_LIMB_LENGTH || v2.0.hypot(v2.1) < MIN_LIMB_LENGTH {
        return None;
    }

    let cross = v1.0 * v2.1 - v1.1 * v2.0;
    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    Some(cross.atan2(dot).abs().to_degrees())
}

/// Heading of the line from `a` to `b`, in radians.
pub fn heading(a: Point, b: Point) -> f32 {
    (b.1 - a.1).atan2(b.0 - a.0)
}

/// Absolute difference between two headings folded into `[0, PI]`.
pub fn heading_difference(h1: f32, h2: f32) -> f32 {
    use std::f32::consts::{PI, TAU};

    let diff = (h1 - h2).rem_euclid(TAU);
    if diff > PI {
        TAU - diff
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_straight_limb() {
        let angle = interior_angle_deg((0.5, 0.3), (0.5, 0.5), (0.5, 0.7)).unwrap();
        assert!((angle - 180.0).abs() < 0.01);
    }

    #[test]
    fn test_right_angle() {
        let angle = interior_angle_deg((0.5, 0.3), (0.5, 0.5), (0.7, 0.5)).unwrap();
        assert!((angle - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_degenerate_limb_has_no_angle() {
        assert_eq!(interior_angle_deg((0.5, 0.5), (0.5, 0.5), (0.5, 0.7)), None);
        assert_eq!(interior_angle_deg((0.5, 0.3), (0.5, 0.5), (0.5, 0.5)), None);
    }

    #[test]
    fn test_heading_difference_folds() {
        assert!((heading_difference(0.0, PI) - PI).abs() < 1e-5);
        assert!((heading_difference(0.1, -0.1) - 0.2).abs() < 1e-5);
        // 350 deg vs 10 deg is 20 deg apart
        let a = 350f32.to_radians();
        let b = 10f32.to_radians();
        assert!((heading_difference(a, b) - 20f32.to_radians()).abs() < 1e-4);
    }

    #[test]
    fn test_distance_and_midpoint() {
        assert!((distance((0.0, 0.0), (0.3, 0.4)) - 0.5).abs() < 1e-6);
        let mid = midpoint((0.2, 0.4), (0.4, 0.6));
        assert!((mid.0 - 0.3).abs() < 1e-6);
        assert!((mid.1 - 0.5).abs() < 1e-6);
    }
}
