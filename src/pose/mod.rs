pub mod detector;
pub mod geometry;
pub mod keypoint;
pub mod metrics;

pub use detector::{rank_detections, PoseDetector};
pub use keypoint::{Joint, Keypoint, Skeleton};
pub use metrics::{
    ConfidenceValue, DepthPosition, FrameAnalysis, LateralBias, MetricsEngine, OpponentInfo,
    PoseMetrics,
};
