//! Domain types for BreakGate

pub mod bar;
pub mod candidate;
pub mod ids;
pub mod instrument;
pub mod position;

pub use bar::Bar;
pub use candidate::{Candidate, CandidateStatus};
pub use ids::PositionId;
pub use instrument::{EarningsConfidence, EarningsInfo, Sleeve, UniverseEntry};
pub use position::{ExitReason, Position, PositionError, PositionExit, PositionStatus};

/// Ticker type alias
pub type Ticker = String;
