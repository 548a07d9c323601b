use serde::Serialize;

use crate::coaching::{Cue, SessionReview};

use super::engine::CoachSnapshot;

/// Push notifications for consumers that do not want to poll.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum CoachEvent {
    StateChanged(CoachSnapshot),
    CueReady(Cue),
    SessionCompleted(SessionReview),
}
