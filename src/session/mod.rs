pub mod commands;
pub mod controller;
pub mod engine;
pub mod events;
pub mod state;

pub use commands::VoiceCommand;
pub use controller::CoachController;
pub use engine::{CoachEngine, CoachSnapshot};
pub use events::CoachEvent;
pub use state::{Focus, PhaseTiming, SessionPhase, SessionState};
