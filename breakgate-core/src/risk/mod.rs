//! Risk profile, risk-budget ledger and position sizing.

pub mod ledger;
pub mod profile;
pub mod sizing;

pub use ledger::{CapOverrides, RiskBudget, Utilization};
pub use profile::{RiskProfile, SleeveCaps, UnknownPreset};
pub use sizing::{size_position, PositionSize};
