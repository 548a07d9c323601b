use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pose::{ConfidenceValue, PoseMetrics};

/// Metric values below this count as a deficiency.
pub const ISSUE_THRESHOLD: f32 = 0.4;
/// Movement above this with cramped spacing counts as late preparation.
const LATE_PREP_MOVEMENT: f32 = 0.3;
const MAX_CONFIDENCE_HISTORY: usize = 20;
const MIN_OCCURRENCES_FOR_REVIEW: u32 = 3;
const MAX_REVIEW_ISSUES: usize = 3;

/// Declaration order is the final tie-breaker when ranking issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    KneeBend,
    TorsoRotation,
    Spacing,
    Balance,
    LatePreparation,
}

impl IssueKind {
    pub const ALL: [IssueKind; 5] = [
        IssueKind::KneeBend,
        IssueKind::TorsoRotation,
        IssueKind::Spacing,
        IssueKind::Balance,
        IssueKind::LatePreparation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::KneeBend => "Limited knee bend",
            IssueKind::TorsoRotation => "Limited shoulder turn",
            IssueKind::Spacing => "Cramped spacing",
            IssueKind::Balance => "Off-balance stance",
            IssueKind::LatePreparation => "Late preparation",
        }
    }

    pub fn drill(&self) -> &'static str {
        match self {
            IssueKind::KneeBend => {
                "Shadow swings from a split step, touching the ground with your off hand to stay low."
            }
            IssueKind::TorsoRotation => {
                "Unit-turn drill: turn shoulders with the racket held in both hands before every feed."
            }
            IssueKind::Spacing => {
                "Cone spacing drill: set up an arm's length plus racket from a cone before each swing."
            }
            IssueKind::Balance => {
                "Recovery shuffle: hit, then hold your finish for a two-count before recovering to center."
            }
            IssueKind::LatePreparation => {
                "Early-turn feeding: start your turn as the feeder strikes, call 'turn' out loud."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn from_occurrences(occurrences: u32) -> Self {
        match occurrences {
            n if n >= 10 => Severity::High,
            n if n >= 5 => Severity::Medium,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Running tally for one issue kind within a session.
#[derive(Debug, Clone, Default)]
pub struct IssueRecord {
    pub occurrences: u32,
    confidences: VecDeque<f32>,
}

impl IssueRecord {
    fn record(&mut self, confidence: f32) {
        self.occurrences += 1;
        self.confidences.push_back(confidence);
        if self.confidences.len() > MAX_CONFIDENCE_HISTORY {
            self.confidences.pop_front();
        }
    }

    pub fn confidence_history(&self) -> impl Iterator<Item = f32> + '_ {
        self.confidences.iter().copied()
    }

    pub fn average_confidence(&self) -> f32 {
        if self.confidences.is_empty() {
            return 0.0;
        }
        self.confidences.iter().sum::<f32>() / self.confidences.len() as f32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub occurrences: u32,
    pub average_confidence: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct IssueTracker {
    records: HashMap<IssueKind, IssueRecord>,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Counts the deficiencies present in one frame. Frames that are not
    /// reliable as a whole are ignored. Returns the kinds that were counted.
    pub fn record_frame(&mut self, metrics: &PoseMetrics) -> Vec<IssueKind> {
        if !metrics.is_reliable() {
            return Vec::new();
        }

        let mut counted = Vec::new();
        for (kind, metric) in [
            (IssueKind::KneeBend, metrics.knee_bend),
            (IssueKind::TorsoRotation, metrics.torso_rotation),
            (IssueKind::Spacing, metrics.spacing),
            (IssueKind::Balance, metrics.balance),
        ] {
            if below(metric, ISSUE_THRESHOLD) {
                self.records.entry(kind).or_default().record(metric.confidence);
                counted.push(kind);
            }
        }

        let moving = metrics
            .movement_intensity
            .reliable_value()
            .is_some_and(|v| v > LATE_PREP_MOVEMENT);
        if moving && below(metrics.spacing, ISSUE_THRESHOLD) {
            let confidence = metrics
                .movement_intensity
                .confidence
                .min(metrics.spacing.confidence);
            self.records
                .entry(IssueKind::LatePreparation)
                .or_default()
                .record(confidence);
            counted.push(IssueKind::LatePreparation);
        }

        counted
    }

    pub fn occurrences(&self, kind: IssueKind) -> u32 {
        self.records.get(&kind).map_or(0, |r| r.occurrences)
    }

    pub fn record(&self, kind: IssueKind) -> Option<&IssueRecord> {
        self.records.get(&kind)
    }

    /// Ranked issues worth reviewing: at least three occurrences, ordered by
    /// severity, then occurrences, then kind; top three kept.
    pub fn finalize(&self, at: DateTime<Utc>) -> Vec<SessionIssue> {
        let mut issues: Vec<SessionIssue> = IssueKind::ALL
            .iter()
            .filter_map(|kind| {
                let record = self.records.get(kind)?;
                (record.occurrences >= MIN_OCCURRENCES_FOR_REVIEW).then(|| SessionIssue {
                    kind: *kind,
                    severity: Severity::from_occurrences(record.occurrences),
                    occurrences: record.occurrences,
                    average_confidence: record.average_confidence(),
                    timestamp: at,
                })
            })
            .collect();

        issues.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.occurrences.cmp(&a.occurrences))
                .then(a.kind.cmp(&b.kind))
        });
        issues.truncate(MAX_REVIEW_ISSUES);
        issues
    }
}

fn below(metric: ConfidenceValue, threshold: f32) -> bool {
    metric.reliable_value().is_some_and(|v| v < threshold)
}
