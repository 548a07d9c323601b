use anyhow::Result;
use image::DynamicImage;

use super::keypoint::Skeleton;

/// External pose-estimation service.
///
/// Implementations may block; the sensing loop calls them from a blocking
/// worker thread.
pub trait PoseDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Skeleton>>;
}

/// Splits a detector result into `(player, opponent)`: the most confident
/// skeleton is the player, the runner-up the opponent candidate.
pub fn rank_detections(mut skeletons: Vec<Skeleton>) -> (Option<Skeleton>, Option<Skeleton>) {
    skeletons.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut iter = skeletons.into_iter();
    let player = iter.next();
    let opponent = iter.next();
    (player, opponent)
}
