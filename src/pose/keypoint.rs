use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Joints below this confidence are dropped before any metric sees them.
pub const JOINT_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// The 15 body joints reported by the pose detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Joint {
    Head,
    Neck,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    Root,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub const COUNT: usize = 15;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::Head,
        Joint::Neck,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::Root,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];
}

/// Single joint observation in the unit image frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Normalized X (0.0..1.0)
    pub x: f32,
    /// Normalized Y (0.0..1.0), growing downward
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// One detected person for a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub joints: HashMap<Joint, Keypoint>,
    /// Overall detection confidence reported by the detector.
    pub confidence: f32,
}

impl Skeleton {
    pub fn new(confidence: f32) -> Self {
        Self {
            joints: HashMap::new(),
            confidence,
        }
    }

    pub fn with_joint(mut self, joint: Joint, keypoint: Keypoint) -> Self {
        self.joints.insert(joint, keypoint);
        self
    }

    pub fn get(&self, joint: Joint) -> Option<&Keypoint> {
        self.joints.get(&joint)
    }

    /// Copy of this skeleton keeping only joints at or above `threshold`.
    pub fn filtered(&self, threshold: f32) -> Self {
        Self {
            joints: self
                .joints
                .iter()
                .filter(|(_, kp)| kp.is_valid(threshold))
                .map(|(joint, kp)| (*joint, *kp))
                .collect(),
            confidence: self.confidence,
        }
    }

    /// Looks up every joint in `joints`, or `None` if any is missing.
    pub fn require<const N: usize>(&self, joints: [Joint; N]) -> Option<[Keypoint; N]> {
        let mut out = [Keypoint::new(0.0, 0.0, 0.0); N];
        for (slot, joint) in out.iter_mut().zip(joints) {
            *slot = *self.get(joint)?;
        }
        Some(out)
    }
}
