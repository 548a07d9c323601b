pub mod policy;
pub mod review;

pub use policy::{tactical_cue, CoachingPolicy, Cue, CueKind};
pub use review::{build_review, SessionReview};
