use std::collections::VecDeque;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::analysis::{IssueKind, IssueTracker, TacticalRead};
use crate::pose::{OpponentInfo, PoseMetrics};

const HISTORY_LEN: usize = 5;
/// A candidate below this confidence is dropped rather than voiced.
const MIN_CUE_CONFIDENCE: f32 = 0.5;
const MIN_OCCURRENCES: u32 = 3;
const SPACING_CUE_BELOW: f32 = 0.4;
const ROTATION_CUE_BELOW: f32 = 0.3;
const KNEE_CUE_BELOW: f32 = 0.3;
const BALANCE_CUE_BELOW: f32 = 0.4;

/// Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CueKind {
    Spacing,
    Preparation,
    Balance,
    Tactical,
}

impl CueKind {
    /// Paraphrases for the kinds `select_cue` can emit.
    fn phrasings(&self) -> &'static [&'static str] {
        match self {
            CueKind::Spacing => &[
                "Give yourself more room. Move your feet to the ball.",
                "Too jammed. Adjust your steps and create space.",
                "Take small steps to set your distance before you swing.",
            ],
            CueKind::Preparation => &[
                "Turn earlier. Shoulders first as soon as you read the ball.",
                "Get the racket back sooner. Early unit turn.",
                "Prepare earlier, you're rushing the swing.",
            ],
            CueKind::Balance => &[
                "Bend your knees and stay low through the shot.",
                "Stay balanced. Wider base, then recover to center.",
                "Sit into your legs and hold your finish.",
            ],
            // worded per opponent position by `tactical_cue`
            CueKind::Tactical => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    pub kind: CueKind,
    pub text: String,
}

impl Cue {
    fn random(kind: CueKind) -> Self {
        let text = kind
            .phrasings()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or_default();
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    kind: CueKind,
    confidence: f32,
}

/// Picks at most one cue from the smoothed metrics and session issue
/// counts. Its only state is the short history of kinds it has emitted;
/// rate limiting is the caller's job.
#[derive(Debug, Default)]
pub struct CoachingPolicy {
    history: VecDeque<CueKind>,
}

impl CoachingPolicy {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> impl Iterator<Item = CueKind> + '_ {
        self.history.iter().copied()
    }

    pub fn select_cue(&mut self, smoothed: &PoseMetrics, issues: &IssueTracker) -> Option<Cue> {
        let kind = self.choose(candidates(smoothed, issues))?;

        self.history.push_back(kind);
        if self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }
        Some(Cue::random(kind))
    }

    /// Walks candidates in priority order, skipping weak ones and an
    /// immediate repeat once two cues have been given.
    fn choose(&self, mut candidates: Vec<Candidate>) -> Option<CueKind> {
        candidates.sort_by_key(|c| c.kind);

        let previous = self.history.back().copied();
        let blocks_repeat = self.history.len() >= 2;

        candidates
            .into_iter()
            .find(|c| {
                c.confidence >= MIN_CUE_CONFIDENCE
                    && !(blocks_repeat && previous == Some(c.kind))
            })
            .map(|c| c.kind)
    }
}

fn candidates(smoothed: &PoseMetrics, issues: &IssueTracker) -> Vec<Candidate> {
    let recurring = |kind: IssueKind| issues.occurrences(kind) >= MIN_OCCURRENCES;
    let mut out = Vec::with_capacity(3);

    if smoothed.spacing.is_reliable()
        && smoothed.spacing.value < SPACING_CUE_BELOW
        && recurring(IssueKind::Spacing)
    {
        out.push(Candidate {
            kind: CueKind::Spacing,
            confidence: smoothed.spacing.confidence,
        });
    }

    if smoothed.torso_rotation.is_reliable()
        && smoothed.torso_rotation.value < ROTATION_CUE_BELOW
        && recurring(IssueKind::TorsoRotation)
    {
        out.push(Candidate {
            kind: CueKind::Preparation,
            confidence: smoothed.torso_rotation.confidence,
        });
    } else if recurring(IssueKind::LatePreparation) {
        let confidence = issues
            .record(IssueKind::LatePreparation)
            .map_or(0.0, |r| r.average_confidence());
        out.push(Candidate {
            kind: CueKind::Preparation,
            confidence,
        });
    }

    if smoothed.knee_bend.is_reliable()
        && smoothed.knee_bend.value < KNEE_CUE_BELOW
        && recurring(IssueKind::KneeBend)
    {
        out.push(Candidate {
            kind: CueKind::Balance,
            confidence: smoothed.knee_bend.confidence,
        });
    } else if smoothed.balance.is_reliable()
        && smoothed.balance.value < BALANCE_CUE_BELOW
        && recurring(IssueKind::Balance)
    {
        out.push(Candidate {
            kind: CueKind::Balance,
            confidence: smoothed.balance.confidence,
        });
    }

    out
}

/// Pure mapping from the opponent's position to a spoken tactical cue.
pub fn tactical_cue(info: &OpponentInfo) -> Option<Cue> {
    TacticalRead::classify(info).map(|read| Cue {
        kind: CueKind::Tactical,
        text: read.cue().to_string(),
    })
}
