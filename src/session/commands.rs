use super::state::Focus;

/// Spoken commands, matched loosely by substring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    StartSession,
    EndSession,
    Mute,
    Unmute,
    WhatToFix,
    SetFocus(Focus),
}

impl VoiceCommand {
    pub fn parse(utterance: &str) -> Option<Self> {
        let text = utterance.to_lowercase();
        let has = |needle: &str| text.contains(needle);

        // "unmute" contains "mute", so it goes first
        if has("start session") || has("begin session") {
            Some(VoiceCommand::StartSession)
        } else if has("end session") || has("stop session") {
            Some(VoiceCommand::EndSession)
        } else if has("unmute") {
            Some(VoiceCommand::Unmute)
        } else if has("mute") || has("be quiet") {
            Some(VoiceCommand::Mute)
        } else if has("what should i fix") {
            Some(VoiceCommand::WhatToFix)
        } else if has("movement") || has("footwork") {
            Some(VoiceCommand::SetFocus(Focus::Movement))
        } else if has("forehand") {
            Some(VoiceCommand::SetFocus(Focus::Forehand))
        } else if has("backhand") {
            Some(VoiceCommand::SetFocus(Focus::Backhand))
        } else if has("serve") {
            Some(VoiceCommand::SetFocus(Focus::Serve))
        } else {
            None
        }
    }
}
