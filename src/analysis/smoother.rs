use std::collections::VecDeque;

use crate::pose::{ConfidenceValue, PoseMetrics};

const WINDOW_SIZE: usize = 5;
const MIN_WINDOW_ENTRIES: usize = 3;
const MIN_RELIABLE_ENTRIES: usize = 2;
/// Sub-values at or below this confidence are left out of a field average.
const FIELD_CONFIDENCE_FLOOR: f32 = 0.3;

/// Rolling average over the last few frames, filtered twice: unreliable
/// frames are skipped, then weak fields inside the remaining frames.
#[derive(Debug, Default)]
pub struct MetricsSmoother {
    window: VecDeque<PoseMetrics>,
}

impl MetricsSmoother {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn push(&mut self, metrics: PoseMetrics) {
        self.window.push_back(metrics);
        if self.window.len() > WINDOW_SIZE {
            self.window.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    pub fn smoothed(&self) -> Option<PoseMetrics> {
        if self.window.len() < MIN_WINDOW_ENTRIES {
            return None;
        }

        let reliable: Vec<&PoseMetrics> = self.window.iter().filter(|m| m.is_reliable()).collect();
        if reliable.len() < MIN_RELIABLE_ENTRIES {
            return None;
        }

        let latest = reliable.last()?;
        Some(PoseMetrics {
            movement_intensity: average(reliable.iter().map(|m| m.movement_intensity)),
            knee_bend: average(reliable.iter().map(|m| m.knee_bend)),
            torso_rotation: average(reliable.iter().map(|m| m.torso_rotation)),
            spacing: average(reliable.iter().map(|m| m.spacing)),
            balance: average(reliable.iter().map(|m| m.balance)),
            captured_at: latest.captured_at,
        })
    }
}

fn average(values: impl Iterator<Item = ConfidenceValue>) -> ConfidenceValue {
    let (mut value_sum, mut confidence_sum, mut count) = (0.0, 0.0, 0usize);
    for v in values.filter(|v| v.confidence > FIELD_CONFIDENCE_FLOOR) {
        value_sum += v.value;
        confidence_sum += v.confidence;
        count += 1;
    }

    if count == 0 {
        return ConfidenceValue::UNKNOWN;
    }
    ConfidenceValue::new(value_sum / count as f32, confidence_sum / count as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn cv(value: f32, confidence: f32) -> ConfidenceValue {
        ConfidenceValue::new(value, confidence)
    }

    fn metrics(knee: f32, spacing: f32, balance: f32, confidence: f32) -> PoseMetrics {
        PoseMetrics {
            movement_intensity: ConfidenceValue::UNKNOWN,
            knee_bend: cv(knee, confidence),
            torso_rotation: cv(0.5, 0.2),
            spacing: cv(spacing, confidence),
            balance: cv(balance, confidence),
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_requires_three_entries() {
        let mut smoother = MetricsSmoother::new();
        smoother.push(metrics(0.2, 0.3, 0.9, 0.8));
        smoother.push(metrics(0.2, 0.3, 0.9, 0.8));
        assert!(smoother.smoothed().is_none());
        smoother.push(metrics(0.2, 0.3, 0.9, 0.8));
        assert!(smoother.smoothed().is_some());
    }

    #[test]
    fn test_requires_two_reliable_entries() {
        let mut smoother = MetricsSmoother::new();
        smoother.push(metrics(0.2, 0.3, 0.9, 0.8));
        smoother.push(metrics(0.2, 0.3, 0.9, 0.4));
        smoother.push(metrics(0.2, 0.3, 0.9, 0.4));
        assert!(smoother.smoothed().is_none());
    }

    #[test]
    fn test_mean_of_reliable_entries() {
        let mut smoother = MetricsSmoother::new();
        smoother.push(metrics(0.1, 0.2, 0.6, 0.6));
        smoother.push(metrics(0.2, 0.3, 0.8, 0.8));
        smoother.push(metrics(0.3, 0.4, 1.0, 1.0));

        let s = smoother.smoothed().unwrap();
        assert!((s.knee_bend.value - 0.2).abs() < 1e-5);
        assert!((s.spacing.value - 0.3).abs() < 1e-5);
        assert!((s.balance.value - 0.8).abs() < 1e-5);
        assert!((s.knee_bend.confidence - 0.8).abs() < 1e-5);
        // every torso sub-value is at 0.2 confidence
        assert_eq!(s.torso_rotation, ConfidenceValue::UNKNOWN);
        assert_eq!(s.movement_intensity, ConfidenceValue::UNKNOWN);
    }

    #[test]
    fn test_unreliable_frames_do_not_pollute() {
        let mut smoother = MetricsSmoother::new();
        smoother.push(metrics(0.2, 0.2, 0.8, 0.9));
        smoother.push(metrics(0.9, 0.9, 0.1, 0.45));
        smoother.push(metrics(0.4, 0.4, 0.6, 0.9));

        let s = smoother.smoothed().unwrap();
        assert!((s.knee_bend.value - 0.3).abs() < 1e-5);
        assert!((s.balance.value - 0.7).abs() < 1e-5);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut smoother = MetricsSmoother::new();
        let t0 = Instant::now();
        for i in 0..8 {
            let mut m = metrics(i as f32 / 10.0, 0.3, 0.9, 0.8);
            m.captured_at = t0 + Duration::from_secs(i);
            smoother.push(m);
        }
        assert_eq!(smoother.len(), WINDOW_SIZE);
        let s = smoother.smoothed().unwrap();
        // frames 3..=7
        assert!((s.knee_bend.value - 0.5).abs() < 1e-5);
        assert_eq!(s.captured_at, t0 + Duration::from_secs(7));
    }
}
