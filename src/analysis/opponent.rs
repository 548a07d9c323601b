use log::debug;

use crate::pose::{DepthPosition, LateralBias, OpponentInfo};

const MAX_NOTES: usize = 3;
const NOTE_MIN_CONFIDENCE: f32 = 0.5;

/// Tactical reading of where the opponent is standing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TacticalRead {
    StayingDeep,
    CheatingForehand,
    FavoringBackhand,
    AtNet,
}

impl TacticalRead {
    /// First match wins: depth beats lateral bias.
    pub fn classify(info: &OpponentInfo) -> Option<Self> {
        if !info.is_visible {
            return None;
        }
        match (info.depth_position, info.lateral_bias) {
            (DepthPosition::Deep, _) => Some(TacticalRead::StayingDeep),
            (DepthPosition::Shallow, LateralBias::Forehand) => Some(TacticalRead::CheatingForehand),
            (DepthPosition::Shallow, LateralBias::Backhand) => Some(TacticalRead::FavoringBackhand),
            (DepthPosition::Shallow, LateralBias::Center) => Some(TacticalRead::AtNet),
            _ => None,
        }
    }

    /// Short note kept for the session review.
    pub fn note(&self) -> &'static str {
        match self {
            TacticalRead::StayingDeep => "Opponent staying deep, use depth",
            TacticalRead::CheatingForehand => "Opponent cheating forehand, open court on backhand",
            TacticalRead::FavoringBackhand => "Opponent favoring backhand, attack forehand",
            TacticalRead::AtNet => "Opponent at net, consider lobs/passes",
        }
    }

    /// Spoken version for a live tactical cue.
    pub fn cue(&self) -> &'static str {
        match self {
            TacticalRead::StayingDeep => "They're camped deep. Mix in a short ball.",
            TacticalRead::CheatingForehand => "They're cheating to the forehand. Go backhand side.",
            TacticalRead::FavoringBackhand => "They're covering the backhand. Attack the forehand.",
            TacticalRead::AtNet => "They're at the net. Lob or pass.",
        }
    }
}

/// Collects at most three distinct tactical notes per session.
#[derive(Debug, Default)]
pub struct OpponentAnalyzer {
    notes: Vec<String>,
}

impl OpponentAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.notes.clear();
    }

    /// Returns the note if a new one was appended.
    pub fn observe(&mut self, info: &OpponentInfo) -> Option<&str> {
        if !info.is_visible || info.confidence < NOTE_MIN_CONFIDENCE || self.notes.len() >= MAX_NOTES {
            return None;
        }

        let note = TacticalRead::classify(info)?.note();
        if self.notes.iter().any(|n| n == note) {
            return None;
        }

        debug!("new tactical note: {note}");
        self.notes.push(note.to_string());
        self.notes.last().map(String::as_str)
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}
