use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::analysis::{IssueKind, IssueTracker, MetricsSmoother, OpponentAnalyzer};
use crate::coaching::{build_review, tactical_cue, CoachingPolicy, Cue, SessionReview};
use crate::pose::{FrameAnalysis, OpponentInfo};
use crate::settings::CoachSettings;

use super::state::{Focus, PhaseTiming, SessionPhase, SessionState};

/// Read-only projection for presentation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachSnapshot {
    pub phase: SessionPhase,
    pub phase_name: &'static str,
    pub focus: Focus,
    pub duration_ms: u64,
    pub muted: bool,
    pub total_frames: u64,
    pub successful_frames: u64,
    pub detection_rate: f32,
    pub cue_count: u32,
    pub last_cue_text: Option<String>,
    pub opponent_notes: Vec<String>,
}

/// Sole owner and writer of session aggregates. Every mutation goes
/// through `&mut self`, so callers serialize access by construction.
pub struct CoachEngine {
    timing: PhaseTiming,
    cue_cooldown: Duration,
    state: SessionState,
    smoother: MetricsSmoother,
    issues: IssueTracker,
    opponents: OpponentAnalyzer,
    policy: CoachingPolicy,
    latest_opponent: OpponentInfo,
    pending: Option<String>,
    review: Option<SessionReview>,
    /// Carried into the next session; the finished session stays frozen.
    focus: Focus,
    muted: bool,
}

impl CoachEngine {
    pub fn new(settings: &CoachSettings) -> Self {
        Self {
            timing: PhaseTiming {
                warmup: settings.warmup(),
                cooldown_after: settings.cooldown_after(),
            },
            cue_cooldown: settings.cue_cooldown(),
            state: SessionState::new(),
            smoother: MetricsSmoother::new(),
            issues: IssueTracker::new(),
            opponents: OpponentAnalyzer::new(),
            policy: CoachingPolicy::new(),
            latest_opponent: OpponentInfo::not_visible(),
            pending: None,
            review: None,
            focus: Focus::default(),
            muted: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Starts a session. Returns false (and changes nothing) if one is
    /// already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.state.is_active() {
            debug!("start ignored, session already active");
            return false;
        }

        let session_id = Uuid::new_v4();
        self.state.begin_session(session_id, Utc::now(), now, self.focus, self.muted);
        self.smoother.clear();
        self.issues.reset();
        self.opponents.reset();
        self.policy.reset();
        self.latest_opponent = OpponentInfo::not_visible();
        self.pending = None;
        self.review = None;

        info!(
            "coaching session {} started (focus: {})",
            session_id,
            self.focus.label()
        );
        true
    }

    /// Drops an active session without a review, back to idle.
    pub fn cancel(&mut self) {
        if self.state.is_active() {
            info!("session {:?} cancelled", self.state.session_id);
            self.state = SessionState::new();
            self.pending = None;
        }
    }

    /// Ends the active session and builds its review. The spoken summary
    /// replaces any unread cue. Returns `None` if nothing was running.
    pub fn end(&mut self, now: Instant) -> Option<SessionReview> {
        if !self.state.is_active() {
            debug!("end ignored, no active session");
            return None;
        }

        self.state.finish(now);
        let issues = self.issues.finalize(Utc::now());
        let review = build_review(&self.state, issues, self.opponents.notes());

        info!(
            "session {:?} ended after {}s: {} issues, {} cues, {}/{} frames detected",
            review.session_id,
            review.duration_ms / 1000,
            review.issues.len(),
            review.cue_count,
            review.successful_frames,
            review.total_frames
        );

        self.pending = Some(review.spoken_summary());
        self.review = Some(review.clone());
        Some(review)
    }

    /// Once-per-second housekeeping. Returns true when the phase changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let changed = self.state.update_phase(now, &self.timing);
        if changed {
            info!("session phase -> {}", self.state.phase.as_str());
        }
        changed
    }

    /// Folds one processed frame into the session and, if the cadence gate
    /// allows, asks the policy for a cue.
    pub fn apply_frame(&mut self, analysis: FrameAnalysis, now: Instant) -> Option<Cue> {
        if !self.state.is_active() {
            return None;
        }

        let FrameAnalysis {
            metrics,
            opponent,
            player_detected,
        } = analysis;

        self.state.record_frame(metrics, player_detected);
        self.smoother.push(metrics);
        let counted = self.issues.record_frame(&metrics);
        if !counted.is_empty() {
            debug!("frame issues: {counted:?}");
        }

        self.latest_opponent = opponent;
        self.opponents.observe(&opponent);

        self.try_cue(now)
    }

    /// Out-of-band cue attempt ("what should I fix"). Still bound by the
    /// cadence gate.
    pub fn request_cue(&mut self, now: Instant) -> Option<Cue> {
        let cue = self.try_cue(now);
        if cue.is_none() {
            debug!("cue request produced nothing");
        }
        cue
    }

    fn try_cue(&mut self, now: Instant) -> Option<Cue> {
        if !self.state.cue_gate_open(now, self.cue_cooldown) {
            return None;
        }
        let smoothed = self.smoother.smoothed()?;
        let cue = self.policy.select_cue(&smoothed, &self.issues)?;

        info!("cue ({:?}): {}", cue.kind, cue.text);
        self.state.record_cue(now, &cue.text);
        self.pending = Some(cue.text.clone());
        Some(cue)
    }

    /// Returns true when the phase changed. Outside a session this only
    /// sets what the next start uses.
    pub fn set_focus(&mut self, focus: Focus, now: Instant) -> bool {
        self.focus = focus;
        if !self.state.is_active() {
            return false;
        }
        self.state.focus = focus;
        self.state.update_phase(now, &self.timing)
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if self.state.is_active() {
            self.state.muted = muted;
        }
    }

    /// Drains the single pending utterance, if any.
    pub fn take_pending_cue(&mut self) -> Option<String> {
        self.pending.take()
    }

    pub fn pending_cue(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn tactical_cue(&self) -> Option<Cue> {
        tactical_cue(&self.latest_opponent)
    }

    pub fn issue_occurrences(&self, kind: IssueKind) -> u32 {
        self.issues.occurrences(kind)
    }

    pub fn opponent_notes(&self) -> &[String] {
        self.opponents.notes()
    }

    pub fn review(&self) -> Option<&SessionReview> {
        self.review.as_ref()
    }

    pub fn snapshot(&self, now: Instant) -> CoachSnapshot {
        CoachSnapshot {
            phase: self.state.phase,
            phase_name: self.state.phase.as_str(),
            focus: self.focus,
            duration_ms: self.state.current_duration(now).as_millis() as u64,
            muted: self.muted,
            total_frames: self.state.total_frames,
            successful_frames: self.state.successful_frames,
            detection_rate: self.state.detection_rate(),
            cue_count: self.state.cue_count,
            last_cue_text: self.state.last_cue_text.clone(),
            opponent_notes: self.opponents.notes().to_vec(),
        }
    }
}
