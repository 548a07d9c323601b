pub mod issues;
pub mod opponent;
pub mod smoother;

pub use issues::{IssueKind, IssueRecord, IssueTracker, SessionIssue, Severity};
pub use opponent::{OpponentAnalyzer, TacticalRead};
pub use smoother::MetricsSmoother;
