use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::SessionIssue;
use crate::session::{Focus, SessionState};

const GENERIC_DRILLS: [&str; 3] = [
    "Split-step ladder: split step on every feed, then two shuffle steps to the ball.",
    "Crosscourt rally to 20 with a full recovery to center after each shot.",
    "Shadow swings in front of a mirror, checking turn and finish.",
];

/// Read-only summary handed to presentation once a session has ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReview {
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub focus: Focus,
    pub issues: Vec<SessionIssue>,
    pub opponent_notes: Vec<String>,
    pub cue_count: u32,
    pub total_frames: u64,
    pub successful_frames: u64,
    pub detection_rate: f32,
}

/// Snapshot a finished session into its review.
pub fn build_review(
    state: &SessionState,
    issues: Vec<SessionIssue>,
    opponent_notes: &[String],
) -> SessionReview {
    SessionReview {
        session_id: state.session_id,
        started_at: state.started_at,
        duration_ms: state.duration_ms,
        focus: state.focus,
        issues,
        opponent_notes: opponent_notes.to_vec(),
        cue_count: state.cue_count,
        total_frames: state.total_frames,
        successful_frames: state.successful_frames,
        detection_rate: state.detection_rate(),
    }
}

impl SessionReview {
    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "## Session Review ({}, focus: {})",
            format_duration(self.duration_ms),
            self.focus.label()
        );
        out.push('\n');

        if self.has_issues() {
            out.push_str("### Issues Observed\n");
            for issue in &self.issues {
                let _ = writeln!(
                    out,
                    "- **{}** ({}): seen {} times, {:.0}% confidence",
                    issue.kind.label(),
                    issue.severity.as_str(),
                    issue.occurrences,
                    issue.average_confidence * 100.0
                );
            }
        } else {
            out.push_str("### Not Enough Data\n");
            out.push_str("Not enough reliable data to identify recurring issues this session.\n");
        }
        out.push('\n');

        out.push_str("### Suggested Drills\n");
        if self.has_issues() {
            for issue in &self.issues {
                let _ = writeln!(out, "- {}", issue.kind.drill());
            }
        } else {
            for drill in GENERIC_DRILLS {
                let _ = writeln!(out, "- {drill}");
            }
        }

        if !self.opponent_notes.is_empty() {
            out.push('\n');
            out.push_str("### Tactical Notes\n");
            for note in &self.opponent_notes {
                let _ = writeln!(out, "- {note}");
            }
        }

        out.push('\n');
        let _ = writeln!(
            out,
            "Cues given: {} | Frames analyzed: {} | Detection rate: {:.0}%",
            self.cue_count,
            self.total_frames,
            self.detection_rate * 100.0
        );
        out
    }

    /// Short text for the voice layer to read out at session end.
    pub fn spoken_summary(&self) -> String {
        let minutes = (self.duration_ms / 60_000).max(1);
        let mut summary = format!(
            "Session complete. {minutes} minute{} of {} work.",
            if minutes == 1 { "" } else { "s" },
            self.focus.label()
        );

        if self.has_issues() {
            let names: Vec<String> = self
                .issues
                .iter()
                .map(|i| i.kind.label().to_lowercase())
                .collect();
            let _ = write!(summary, " Next time, work on {}.", join_spoken(&names));
        } else {
            summary.push_str(" I didn't get enough reliable data to give you specific feedback.");
        }

        if let Some(note) = self.opponent_notes.first() {
            let _ = write!(summary, " Tactically: {}.", note.to_lowercase());
        }
        summary
    }
}

fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}m {:02}s", secs / 60, secs % 60)
}

fn join_spoken(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
