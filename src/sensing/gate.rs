use std::time::{Duration, Instant};

/// Monotonic-clock throttle: admits at most one frame per interval and
/// drops the rest. Nothing is queued.
#[derive(Debug, Clone)]
pub struct FrameGate {
    interval: Duration,
    last_admitted: Option<Instant>,
}

impl FrameGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: None,
        }
    }

    pub fn admit(&mut self, at: Instant) -> bool {
        let open = self
            .last_admitted
            .map_or(true, |last| at.saturating_duration_since(last) >= self.interval);
        if open {
            self.last_admitted = Some(at);
        }
        open
    }

    pub fn reset(&mut self) {
        self.last_admitted = None;
    }
}
