use std::{
    fs,
    path::Path,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::coaching::SessionReview;
use crate::pose::{FrameAnalysis, MetricsEngine, Skeleton};
use crate::sensing::FrameGate;
use crate::session::{CoachEngine, VoiceCommand};
use crate::settings::CoachSettings;

/// Timed detector output and spoken commands captured from a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    #[serde(default)]
    pub frames: Vec<RecordedFrame>,
    #[serde(default)]
    pub commands: Vec<RecordedCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedFrame {
    pub offset_ms: u64,
    #[serde(default)]
    pub skeletons: Vec<Skeleton>,
    /// Set when the detector failed on this frame.
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedCommand {
    pub offset_ms: u64,
    pub text: String,
}

impl Recording {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid recording in {}", path.display()))
    }

    fn end_offset_ms(&self) -> u64 {
        let frames = self.frames.iter().map(|f| f.offset_ms);
        let commands = self.commands.iter().map(|c| c.offset_ms);
        frames.chain(commands).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpokenLine {
    pub offset_ms: u64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ReplayOutcome {
    pub spoken: Vec<SpokenLine>,
    pub review: Option<SessionReview>,
}

enum Step<'a> {
    Command(&'a RecordedCommand),
    Frame(&'a RecordedFrame),
}

impl Step<'_> {
    fn offset_ms(&self) -> u64 {
        match self {
            Step::Command(c) => c.offset_ms,
            Step::Frame(f) => f.offset_ms,
        }
    }
}

/// Plays a recording through a fresh engine on a synthetic clock. The
/// session starts at offset zero and ends after the last event unless the
/// recording ends it earlier.
pub fn replay(recording: &Recording, settings: &CoachSettings) -> ReplayOutcome {
    let t0 = Instant::now();
    let at = |offset_ms: u64| t0 + Duration::from_millis(offset_ms);

    let mut engine = CoachEngine::new(settings);
    let mut metrics = MetricsEngine::new();
    let mut gate = FrameGate::new(settings.frame_interval());
    let mut spoken = Vec::new();
    let mut review = None;

    let mut steps: Vec<Step> = recording
        .commands
        .iter()
        .map(Step::Command)
        .chain(recording.frames.iter().map(Step::Frame))
        .collect();
    // stable sort keeps commands ahead of frames at the same offset
    steps.sort_by_key(|step| step.offset_ms());

    engine.start(t0);

    for step in steps {
        let offset_ms = step.offset_ms();
        let now = at(offset_ms);
        engine.tick(now);

        match step {
            Step::Command(command) => match VoiceCommand::parse(&command.text) {
                Some(VoiceCommand::StartSession) => {
                    if engine.start(now) {
                        metrics.reset();
                        gate.reset();
                    }
                }
                Some(VoiceCommand::EndSession) => {
                    if let Some(r) = engine.end(now) {
                        review = Some(r);
                    }
                }
                Some(VoiceCommand::Mute) => engine.set_muted(true),
                Some(VoiceCommand::Unmute) => engine.set_muted(false),
                Some(VoiceCommand::WhatToFix) => {
                    engine.request_cue(now);
                }
                Some(VoiceCommand::SetFocus(focus)) => {
                    engine.set_focus(focus, now);
                }
                None => warn!("unrecognized command at {offset_ms}ms: {:?}", command.text),
            },
            Step::Frame(frame) => {
                if !engine.is_active() || !gate.admit(now) {
                    continue;
                }
                let analysis = match &frame.error {
                    Some(err) => {
                        warn!("pose detection failed at {offset_ms}ms: {err}");
                        FrameAnalysis::failed(now)
                    }
                    None => metrics.analyze(frame.skeletons.clone(), now),
                };
                engine.apply_frame(analysis, now);
            }
        }

        if let Some(text) = engine.take_pending_cue() {
            spoken.push(SpokenLine { offset_ms, text });
        }
    }

    let end_ms = recording.end_offset_ms();
    if let Some(r) = engine.end(at(end_ms)) {
        review = Some(r);
        if let Some(text) = engine.take_pending_cue() {
            spoken.push(SpokenLine {
                offset_ms: end_ms,
                text,
            });
        }
    }

    info!(
        "replayed {} frames and {} commands, {} lines spoken",
        recording.frames.len(),
        recording.commands.len(),
        spoken.len()
    );
    ReplayOutcome { spoken, review }
}
