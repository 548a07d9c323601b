use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::pose::PoseMetrics;

const METRICS_HISTORY_LEN: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Warmup,
    Rally,
    ServeBlock,
    Cooldown,
    ReviewReady,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Warmup => "warmup",
            SessionPhase::Rally => "rally",
            SessionPhase::ServeBlock => "serveBlock",
            SessionPhase::Cooldown => "cooldown",
            SessionPhase::ReviewReady => "reviewReady",
        }
    }

    /// Frames are analyzed and cues considered only in active phases.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionPhase::Idle | SessionPhase::ReviewReady)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Focus {
    #[default]
    Movement,
    Forehand,
    Backhand,
    Serve,
}

impl Focus {
    pub fn label(&self) -> &'static str {
        match self {
            Focus::Movement => "movement",
            Focus::Forehand => "forehand",
            Focus::Backhand => "backhand",
            Focus::Serve => "serve",
        }
    }
}

/// Phase boundaries measured from session start.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTiming {
    pub warmup: Duration,
    pub cooldown_after: Duration,
}

impl Default for PhaseTiming {
    fn default() -> Self {
        Self {
            warmup: Duration::from_secs(60),
            cooldown_after: Duration::from_secs(1_800),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: SessionPhase,
    pub focus: Focus,
    pub muted: bool,
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub cue_count: u32,
    pub last_cue_text: Option<String>,
    pub total_frames: u64,
    pub successful_frames: u64,
    #[serde(skip)]
    pub running_anchor: Option<Instant>,
    #[serde(skip)]
    pub last_cue_at: Option<Instant>,
    #[serde(skip)]
    pub metrics_history: VecDeque<PoseMetrics>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.phase.is_active()
    }

    /// Fresh session in warm-up; everything but the given focus and mute
    /// is reset.
    pub fn begin_session(
        &mut self,
        session_id: Uuid,
        start_at: DateTime<Utc>,
        now: Instant,
        focus: Focus,
        muted: bool,
    ) {
        *self = Self {
            phase: SessionPhase::Warmup,
            focus,
            muted,
            session_id: Some(session_id),
            started_at: Some(start_at),
            running_anchor: Some(now),
            ..Self::default()
        };
    }

    pub fn current_duration(&self, now: Instant) -> Duration {
        match (self.is_active(), self.running_anchor) {
            (true, Some(anchor)) => now.saturating_duration_since(anchor),
            _ => Duration::from_millis(self.duration_ms),
        }
    }

    pub fn sync_duration(&mut self, now: Instant) {
        if self.is_active() {
            self.duration_ms = self.current_duration(now).as_millis() as u64;
        }
    }

    /// Re-derives the phase from elapsed time and focus. Returns true when
    /// the phase changed.
    pub fn update_phase(&mut self, now: Instant, timing: &PhaseTiming) -> bool {
        if !self.is_active() {
            return false;
        }
        self.sync_duration(now);

        let elapsed = Duration::from_millis(self.duration_ms);
        let next = if elapsed < timing.warmup {
            SessionPhase::Warmup
        } else if elapsed > timing.cooldown_after {
            SessionPhase::Cooldown
        } else if self.focus == Focus::Serve {
            SessionPhase::ServeBlock
        } else {
            SessionPhase::Rally
        };

        let changed = next != self.phase;
        self.phase = next;
        changed
    }

    /// Freezes the session; no further frames or cues are accepted.
    pub fn finish(&mut self, now: Instant) {
        self.sync_duration(now);
        self.phase = SessionPhase::ReviewReady;
        self.running_anchor = None;
    }

    pub fn cue_gate_open(&self, now: Instant, cooldown: Duration) -> bool {
        self.is_active()
            && !self.muted
            && self
                .last_cue_at
                .map_or(true, |at| now.saturating_duration_since(at) >= cooldown)
    }

    pub fn record_cue(&mut self, now: Instant, text: &str) {
        self.cue_count += 1;
        self.last_cue_at = Some(now);
        self.last_cue_text = Some(text.to_string());
    }

    pub fn record_frame(&mut self, metrics: PoseMetrics, player_detected: bool) {
        self.total_frames += 1;
        if player_detected {
            self.successful_frames += 1;
        }
        self.metrics_history.push_back(metrics);
        if self.metrics_history.len() > METRICS_HISTORY_LEN {
            self.metrics_history.pop_front();
        }
    }

    pub fn detection_rate(&self) -> f32 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.successful_frames as f32 / self.total_frames as f32
    }
}
