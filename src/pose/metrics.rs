use std::f32::consts::FRAC_PI_4;
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};

use super::detector::rank_detections;
use super::geometry::{distance, heading, heading_difference, interior_angle_deg, midpoint, Point};
use super::keypoint::{Joint, Skeleton, JOINT_CONFIDENCE_THRESHOLD};

/// A field is individually reliable at or above this confidence.
pub const RELIABLE_CONFIDENCE: f32 = 0.5;
/// Minimum number of reliable fields for a whole frame to count as reliable.
const RELIABLE_FIELD_COUNT: usize = 3;

const FALLBACK_SHOULDER_WIDTH: f32 = 0.15;
const MIN_STANCE_WIDTH: f32 = 0.05;
/// Root speed (unit frames per second) that maps to full intensity.
const FULL_INTENSITY_VELOCITY: f32 = 0.5;
const MAX_MOTION_GAP: Duration = Duration::from_secs(2);
/// Returned when there is no usable previous root sample.
const MOTION_PLACEHOLDER: ConfidenceValue = ConfidenceValue {
    value: 0.0,
    confidence: 0.3,
};

const OPPONENT_MIN_CONFIDENCE: f32 = 0.4;

/// Normalized score paired with how much it can be trusted.
///
/// A zero confidence means "unknown" and the value must not be read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceValue {
    pub value: f32,
    pub confidence: f32,
}

impl ConfidenceValue {
    pub const UNKNOWN: ConfidenceValue = ConfidenceValue {
        value: 0.0,
        confidence: 0.0,
    };

    pub fn new(value: f32, confidence: f32) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn is_known(&self) -> bool {
        self.confidence > 0.0
    }

    pub fn is_reliable(&self) -> bool {
        self.confidence >= RELIABLE_CONFIDENCE
    }

    /// The value, only if the field is individually reliable.
    pub fn reliable_value(&self) -> Option<f32> {
        self.is_reliable().then_some(self.value)
    }
}

impl Default for ConfidenceValue {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// The five normalized scores derived from one analyzed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseMetrics {
    pub movement_intensity: ConfidenceValue,
    pub knee_bend: ConfidenceValue,
    pub torso_rotation: ConfidenceValue,
    pub spacing: ConfidenceValue,
    pub balance: ConfidenceValue,
    pub captured_at: Instant,
}

impl PoseMetrics {
    pub fn unknown(captured_at: Instant) -> Self {
        Self {
            movement_intensity: ConfidenceValue::UNKNOWN,
            knee_bend: ConfidenceValue::UNKNOWN,
            torso_rotation: ConfidenceValue::UNKNOWN,
            spacing: ConfidenceValue::UNKNOWN,
            balance: ConfidenceValue::UNKNOWN,
            captured_at,
        }
    }

    pub fn fields(&self) -> [ConfidenceValue; 5] {
        [
            self.movement_intensity,
            self.knee_bend,
            self.torso_rotation,
            self.spacing,
            self.balance,
        ]
    }

    pub fn reliable_field_count(&self) -> usize {
        self.fields().iter().filter(|f| f.is_reliable()).count()
    }

    pub fn is_reliable(&self) -> bool {
        self.reliable_field_count() >= RELIABLE_FIELD_COUNT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepthPosition {
    Deep,
    Mid,
    Shallow,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LateralBias {
    Forehand,
    Center,
    Backhand,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentInfo {
    pub is_visible: bool,
    pub depth_position: DepthPosition,
    pub lateral_bias: LateralBias,
    pub confidence: f32,
}

impl OpponentInfo {
    pub fn not_visible() -> Self {
        Self {
            is_visible: false,
            depth_position: DepthPosition::Unknown,
            lateral_bias: LateralBias::Unknown,
            confidence: 0.0,
        }
    }

    /// Positional read of a secondary skeleton against a fixed,
    /// uncalibrated frame: small `y` is far from the camera.
    pub fn from_skeleton(skeleton: &Skeleton) -> Self {
        if skeleton.confidence < OPPONENT_MIN_CONFIDENCE {
            return Self::not_visible();
        }
        let Some(root) = skeleton
            .get(Joint::Root)
            .filter(|kp| kp.is_valid(JOINT_CONFIDENCE_THRESHOLD))
        else {
            return Self::not_visible();
        };

        let depth_position = if root.y < 0.3 {
            DepthPosition::Deep
        } else if root.y < 0.5 {
            DepthPosition::Mid
        } else {
            DepthPosition::Shallow
        };
        let lateral_bias = if root.x < 0.35 {
            LateralBias::Backhand
        } else if root.x > 0.65 {
            LateralBias::Forehand
        } else {
            LateralBias::Center
        };

        Self {
            is_visible: true,
            depth_position,
            lateral_bias,
            confidence: skeleton.confidence,
        }
    }
}

impl Default for OpponentInfo {
    fn default() -> Self {
        Self::not_visible()
    }
}

/// Everything the session needs from one processed frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameAnalysis {
    pub metrics: PoseMetrics,
    pub opponent: OpponentInfo,
    pub player_detected: bool,
}

impl FrameAnalysis {
    /// Outcome of a frame whose detection failed or found nobody.
    pub fn failed(captured_at: Instant) -> Self {
        Self {
            metrics: PoseMetrics::unknown(captured_at),
            opponent: OpponentInfo::not_visible(),
            player_detected: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RootSample {
    position: Point,
    confidence: f32,
    at: Instant,
}

/// Turns raw detections into [`PoseMetrics`]. The only state kept is the
/// previous frame's root joint, used for the motion delta.
#[derive(Debug, Default)]
pub struct MetricsEngine {
    prev_root: Option<RootSample>,
}

impl MetricsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.prev_root = None;
    }

    pub fn analyze(&mut self, detections: Vec<Skeleton>, captured_at: Instant) -> FrameAnalysis {
        let (player, opponent) = rank_detections(detections);
        let Some(player) = player else {
            debug!("no skeleton detected");
            return FrameAnalysis::failed(captured_at);
        };

        let metrics = self.compute(&player.filtered(JOINT_CONFIDENCE_THRESHOLD), captured_at);
        let opponent = opponent
            .as_ref()
            .map(OpponentInfo::from_skeleton)
            .unwrap_or_default();

        FrameAnalysis {
            metrics,
            opponent,
            player_detected: true,
        }
    }

    /// Metrics for a skeleton already filtered to usable joints.
    pub fn compute(&mut self, skeleton: &Skeleton, captured_at: Instant) -> PoseMetrics {
        let movement_intensity = self.movement_intensity(skeleton, captured_at);

        if let Some(root) = skeleton.get(Joint::Root) {
            self.prev_root = Some(RootSample {
                position: root.position(),
                confidence: root.confidence,
                at: captured_at,
            });
        }

        PoseMetrics {
            movement_intensity,
            knee_bend: knee_bend(skeleton),
            torso_rotation: torso_rotation(skeleton),
            spacing: spacing(skeleton),
            balance: balance(skeleton),
            captured_at,
        }
    }

    fn movement_intensity(&self, skeleton: &Skeleton, captured_at: Instant) -> ConfidenceValue {
        let Some(root) = skeleton.get(Joint::Root) else {
            return ConfidenceValue::UNKNOWN;
        };
        let Some(prev) = self.prev_root else {
            return MOTION_PLACEHOLDER;
        };
        if prev.confidence < JOINT_CONFIDENCE_THRESHOLD {
            return MOTION_PLACEHOLDER;
        }

        let Some(elapsed) = captured_at.checked_duration_since(prev.at) else {
            return MOTION_PLACEHOLDER;
        };
        if elapsed.is_zero() || elapsed >= MAX_MOTION_GAP {
            return MOTION_PLACEHOLDER;
        }

        let velocity = distance(prev.position, root.position()) / elapsed.as_secs_f32();
        ConfidenceValue::new(
            (velocity / FULL_INTENSITY_VELOCITY).min(1.0),
            root.confidence.min(prev.confidence),
        )
    }
}

fn min_confidence(confidences: impl IntoIterator<Item = f32>) -> f32 {
    confidences.into_iter().fold(1.0, f32::min)
}

/// 180 deg (straight legs) maps to 0, 90 deg (deep bend) to 1.
pub fn knee_bend(skeleton: &Skeleton) -> ConfidenceValue {
    let Some(joints) = skeleton.require([
        Joint::LeftHip,
        Joint::LeftKnee,
        Joint::LeftAnkle,
        Joint::RightHip,
        Joint::RightKnee,
        Joint::RightAnkle,
    ]) else {
        return ConfidenceValue::UNKNOWN;
    };
    let [lh, lk, la, rh, rk, ra] = joints;

    // a collapsed hip-knee or knee-ankle segment carries no angle
    let (Some(left), Some(right)) = (
        interior_angle_deg(lh.position(), lk.position(), la.position()),
        interior_angle_deg(rh.position(), rk.position(), ra.position()),
    ) else {
        return ConfidenceValue::UNKNOWN;
    };
    let avg = (left + right) / 2.0;

    ConfidenceValue::new(
        ((180.0 - avg) / 90.0).clamp(0.0, 1.0),
        min_confidence(joints.iter().map(|kp| kp.confidence)),
    )
}

/// Shoulder line vs hip line; a quarter turn or more reads as full rotation.
pub fn torso_rotation(skeleton: &Skeleton) -> ConfidenceValue {
    let Some(joints) = skeleton.require([
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftHip,
        Joint::RightHip,
    ]) else {
        return ConfidenceValue::UNKNOWN;
    };
    let [ls, rs, lh, rh] = joints;

    let diff = heading_difference(
        heading(ls.position(), rs.position()),
        heading(lh.position(), rh.position()),
    );

    ConfidenceValue::new(
        (diff / FRAC_PI_4).min(1.0),
        min_confidence(joints.iter().map(|kp| kp.confidence)),
    )
}

/// Root-to-wrist reach relative to shoulder width.
pub fn spacing(skeleton: &Skeleton) -> ConfidenceValue {
    let Some(joints) = skeleton.require([Joint::Root, Joint::LeftWrist, Joint::RightWrist]) else {
        return ConfidenceValue::UNKNOWN;
    };
    let [root, lw, rw] = joints;

    let reach = (distance(root.position(), lw.position())
        + distance(root.position(), rw.position()))
        / 2.0;
    let shoulder_width = skeleton
        .require([Joint::LeftShoulder, Joint::RightShoulder])
        .map(|[ls, rs]| distance(ls.position(), rs.position()))
        .filter(|width| *width > 1e-4)
        .unwrap_or(FALLBACK_SHOULDER_WIDTH);

    ConfidenceValue::new(
        (reach / shoulder_width / 2.0).min(1.0),
        min_confidence(joints.iter().map(|kp| kp.confidence)),
    )
}

/// 1.0 when the root sits over the middle of the stance.
pub fn balance(skeleton: &Skeleton) -> ConfidenceValue {
    let Some(joints) = skeleton.require([Joint::Root, Joint::LeftAnkle, Joint::RightAnkle]) else {
        return ConfidenceValue::UNKNOWN;
    };
    let [root, la, ra] = joints;

    let center = midpoint(la.position(), ra.position());
    let offset = (root.x - center.0).abs();
    let width = (la.x - ra.x).abs().max(MIN_STANCE_WIDTH);

    ConfidenceValue::new(
        (1.0 - offset / width).clamp(0.0, 1.0),
        min_confidence(joints.iter().map(|kp| kp.confidence)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::keypoint::Keypoint;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    /// Upright player with hip-knee-ankle at `knee_angle` degrees on both legs.
    fn player(knee_angle: f32) -> Skeleton {
        let theta = (180.0 - knee_angle).to_radians();
        let shin = 0.15;
        let ankle_dx = shin * theta.sin();
        let ankle_dy = shin * theta.cos();
        Skeleton::new(0.9)
            .with_joint(Joint::LeftShoulder, Keypoint::new(0.45, 0.3, 0.9))
            .with_joint(Joint::RightShoulder, Keypoint::new(0.55, 0.3, 0.9))
            .with_joint(Joint::LeftWrist, Keypoint::new(0.40, 0.5, 0.8))
            .with_joint(Joint::RightWrist, Keypoint::new(0.60, 0.5, 0.8))
            .with_joint(Joint::Root, Keypoint::new(0.5, 0.5, 0.9))
            .with_joint(Joint::LeftHip, Keypoint::new(0.45, 0.5, 0.85))
            .with_joint(Joint::RightHip, Keypoint::new(0.55, 0.5, 0.85))
            .with_joint(Joint::LeftKnee, Keypoint::new(0.45, 0.65, 0.7))
            .with_joint(Joint::RightKnee, Keypoint::new(0.55, 0.65, 0.75))
            .with_joint(
                Joint::LeftAnkle,
                Keypoint::new(0.45 - ankle_dx, 0.65 + ankle_dy, 0.8),
            )
            .with_joint(
                Joint::RightAnkle,
                Keypoint::new(0.55 + ankle_dx, 0.65 + ankle_dy, 0.8),
            )
    }

    fn without(skeleton: &Skeleton, joint: Joint) -> Skeleton {
        let mut s = skeleton.clone();
        s.joints.remove(&joint);
        s
    }

    #[test]
    fn test_confidence_value_clamps() {
        let v = ConfidenceValue::new(1.7, -0.2);
        assert_eq!(v.value, 1.0);
        assert_eq!(v.confidence, 0.0);
        assert!(!v.is_known());
    }

    #[test]
    fn test_missing_joints_yield_unknown() {
        let full = player(150.0);
        for joint in Joint::ALL {
            let s = without(&full, joint);
            for (metric, required) in [
                (
                    knee_bend(&s),
                    &[
                        Joint::LeftHip,
                        Joint::LeftKnee,
                        Joint::LeftAnkle,
                        Joint::RightHip,
                        Joint::RightKnee,
                        Joint::RightAnkle,
                    ][..],
                ),
                (
                    torso_rotation(&s),
                    &[
                        Joint::LeftShoulder,
                        Joint::RightShoulder,
                        Joint::LeftHip,
                        Joint::RightHip,
                    ][..],
                ),
                (
                    spacing(&s),
                    &[Joint::Root, Joint::LeftWrist, Joint::RightWrist][..],
                ),
                (
                    balance(&s),
                    &[Joint::Root, Joint::LeftAnkle, Joint::RightAnkle][..],
                ),
            ] {
                if required.contains(&joint) {
                    assert_eq!(metric, ConfidenceValue::UNKNOWN, "missing {joint:?}");
                } else {
                    assert!(metric.is_known(), "missing {joint:?}");
                }
            }
        }
    }

    #[test]
    fn test_collapsed_thigh_yields_unknown_knee_bend() {
        let mut s = player(150.0);
        for (hip, knee) in [
            (Joint::LeftHip, Joint::LeftKnee),
            (Joint::RightHip, Joint::RightKnee),
        ] {
            let at = *s.get(hip).unwrap();
            s.joints.insert(knee, Keypoint::new(at.x, at.y, 0.9));
        }
        assert_eq!(knee_bend(&s), ConfidenceValue::UNKNOWN);

        // the rest of the frame is still reliable, yet no knee issue is counted
        let t0 = Instant::now();
        let mut engine = MetricsEngine::new();
        let mut issues = crate::analysis::IssueTracker::new();
        for i in 0..3 {
            let metrics = engine.compute(&s, t0 + Duration::from_secs(i));
            assert!(metrics.is_reliable());
            issues.record_frame(&metrics);
        }
        assert_eq!(issues.occurrences(crate::analysis::IssueKind::KneeBend), 0);
    }

    #[test]
    fn test_empty_skeleton_never_panics() {
        let mut engine = MetricsEngine::new();
        let metrics = engine.compute(&Skeleton::new(0.9), Instant::now());
        assert!(metrics.fields().iter().all(|f| !f.is_known()));
        assert!(!metrics.is_reliable());
    }

    #[test]
    fn test_knee_bend_normalization() {
        assert!(approx(knee_bend(&player(180.0)).value, 0.0));
        assert!(approx(knee_bend(&player(135.0)).value, 0.5));
        assert!(approx(knee_bend(&player(90.0)).value, 1.0));
        // past 90 deg stays clamped
        assert!(approx(knee_bend(&player(60.0)).value, 1.0));
        assert!(approx(knee_bend(&player(150.0)).confidence, 0.7));
    }

    #[test]
    fn test_knee_bend_monotonic() {
        let mut last = -1.0;
        for angle in (90..=180).rev().step_by(5) {
            let value = knee_bend(&player(angle as f32)).value;
            assert!(value >= last, "angle {angle}: {value} < {last}");
            last = value;
        }
    }

    #[test]
    fn test_torso_rotation() {
        let square = player(170.0);
        let r = torso_rotation(&square);
        assert!(approx(r.value, 0.0));
        assert!(approx(r.confidence, 0.85));

        // shoulders turned 45 deg against the hips
        let turned = square
            .clone()
            .with_joint(Joint::LeftShoulder, Keypoint::new(0.45, 0.35, 0.9))
            .with_joint(Joint::RightShoulder, Keypoint::new(0.55, 0.25, 0.9));
        assert!(approx(torso_rotation(&turned).value, 1.0));
    }

    #[test]
    fn test_spacing_uses_shoulder_width() {
        // reach = sqrt(0.1^2 + 0) = 0.1, shoulder width 0.1 -> 0.1 / 0.1 / 2
        let s = player(170.0);
        let v = spacing(&s);
        assert!(approx(v.value, 0.5));
        assert!(approx(v.confidence, 0.8));

        let no_shoulders = without(&without(&s, Joint::LeftShoulder), Joint::RightShoulder);
        assert!(approx(spacing(&no_shoulders).value, 0.1 / 0.15 / 2.0));
    }

    #[test]
    fn test_balance() {
        let centered = player(150.0);
        assert!(approx(balance(&centered).value, 1.0));

        let leaning = centered
            .clone()
            .with_joint(Joint::Root, Keypoint::new(0.6, 0.5, 0.9));
        let v = balance(&leaning).value;
        assert!(v < 1.0 && v >= 0.0);

        // feet together: width floors at 0.05 so a 0.05 offset is zero balance
        let together = Skeleton::new(0.9)
            .with_joint(Joint::Root, Keypoint::new(0.55, 0.5, 0.9))
            .with_joint(Joint::LeftAnkle, Keypoint::new(0.5, 0.9, 0.9))
            .with_joint(Joint::RightAnkle, Keypoint::new(0.5, 0.9, 0.9));
        assert!(approx(balance(&together).value, 0.0));
    }

    #[test]
    fn test_movement_placeholder_without_history() {
        let mut engine = MetricsEngine::new();
        let metrics = engine.compute(&player(150.0), Instant::now());
        assert_eq!(metrics.movement_intensity, MOTION_PLACEHOLDER);
    }

    #[test]
    fn test_movement_intensity_from_root_delta() {
        let mut engine = MetricsEngine::new();
        let t0 = Instant::now();
        engine.compute(&player(150.0), t0);

        let moved = player(150.0).with_joint(Joint::Root, Keypoint::new(0.6, 0.5, 0.6));
        let metrics = engine.compute(&moved, t0 + Duration::from_secs(1));
        // 0.1 per second against a 0.5 full-scale velocity
        assert!(approx(metrics.movement_intensity.value, 0.2));
        assert!(approx(metrics.movement_intensity.confidence, 0.6));
    }

    #[test]
    fn test_movement_stale_previous_frame() {
        let mut engine = MetricsEngine::new();
        let t0 = Instant::now();
        engine.compute(&player(150.0), t0);
        let metrics = engine.compute(&player(150.0), t0 + Duration::from_secs(2));
        assert_eq!(metrics.movement_intensity, MOTION_PLACEHOLDER);

        let metrics = engine.compute(&player(150.0), t0 + Duration::from_secs(2));
        assert_eq!(metrics.movement_intensity, MOTION_PLACEHOLDER, "zero elapsed");
    }

    #[test]
    fn test_reliability_all_patterns() {
        let reliable = ConfidenceValue::new(0.5, 0.5);
        let weak = ConfidenceValue::new(0.5, 0.49);
        for mask in 0u32..32 {
            let pick = |bit: u32| if mask & (1 << bit) != 0 { reliable } else { weak };
            let metrics = PoseMetrics {
                movement_intensity: pick(0),
                knee_bend: pick(1),
                torso_rotation: pick(2),
                spacing: pick(3),
                balance: pick(4),
                captured_at: Instant::now(),
            };
            assert_eq!(
                metrics.is_reliable(),
                mask.count_ones() >= 3,
                "pattern {mask:05b}"
            );
        }
    }

    #[test]
    fn test_opponent_zones() {
        let at = |x: f32, y: f32| {
            OpponentInfo::from_skeleton(
                &Skeleton::new(0.8).with_joint(Joint::Root, Keypoint::new(x, y, 0.6)),
            )
        };
        let deep = at(0.2, 0.1);
        assert!(deep.is_visible);
        assert_eq!(deep.depth_position, DepthPosition::Deep);
        assert_eq!(deep.lateral_bias, LateralBias::Backhand);

        let mid = at(0.5, 0.4);
        assert_eq!(mid.depth_position, DepthPosition::Mid);
        assert_eq!(mid.lateral_bias, LateralBias::Center);

        let shallow = at(0.8, 0.7);
        assert_eq!(shallow.depth_position, DepthPosition::Shallow);
        assert_eq!(shallow.lateral_bias, LateralBias::Forehand);
    }

    #[test]
    fn test_opponent_requires_confidence() {
        let weak = Skeleton::new(0.39).with_joint(Joint::Root, Keypoint::new(0.5, 0.1, 0.9));
        assert!(!OpponentInfo::from_skeleton(&weak).is_visible);

        let weak_root = Skeleton::new(0.9).with_joint(Joint::Root, Keypoint::new(0.5, 0.1, 0.2));
        assert!(!OpponentInfo::from_skeleton(&weak_root).is_visible);
    }

    #[test]
    fn test_analyze_splits_player_and_opponent() {
        let mut engine = MetricsEngine::new();
        let opponent =
            Skeleton::new(0.5).with_joint(Joint::Root, Keypoint::new(0.5, 0.2, 0.7));
        let analysis = engine.analyze(vec![opponent, player(120.0)], Instant::now());
        assert!(analysis.player_detected);
        assert!(analysis.metrics.knee_bend.value > 0.5);
        assert_eq!(analysis.opponent.depth_position, DepthPosition::Deep);

        let empty = engine.analyze(Vec::new(), Instant::now());
        assert!(!empty.player_detected);
        assert!(!empty.opponent.is_visible);
    }
}
