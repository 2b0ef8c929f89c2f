//! Stop management.
//!
//! **Core rule:** a stop may tighten, never loosen. Positions climb a
//! forward-only ladder of protection levels as their R-multiple grows; each
//! level sets a floor under the stop. The only way to lower a stop is an
//! audited administrative reset.

pub mod ladder;
pub mod transition;

pub use ladder::{ProtectionLevel, StopLadder};
pub use transition::{apply_transition, StopEvent, StopRejection, StopTransition};

use crate::domain::Position;
use serde::{Deserialize, Serialize};

/// Market inputs for one stop evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopInputs {
    pub price: f64,
    pub atr14: Option<f64>,
    pub highest_close_since_entry: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopProposal {
    pub new_stop: f64,
    pub level: ProtectionLevel,
    pub justification: String,
    /// Highest close since entry minus the ATR multiple, when computable.
    pub trailing_candidate: Option<f64>,
}

impl StopProposal {
    /// The transition that applies this proposal.
    pub fn transition(&self) -> StopTransition {
        StopTransition::Trail {
            new_stop: self.new_stop,
            level: self.level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopRecommendation {
    NoChange {
        reason: String,
        trailing_candidate: Option<f64>,
    },
    Raise(StopProposal),
}

/// Propose a stop for `position` given today's market inputs. Pure: the
/// position is not touched.
pub fn recommend(
    position: &Position,
    inputs: &StopInputs,
    ladder: &StopLadder,
) -> StopRecommendation {
    let trailing_candidate = match (inputs.highest_close_since_entry, inputs.atr14) {
        (Some(high), Some(atr)) if high.is_finite() && atr.is_finite() && atr > 0.0 => {
            Some(high - ladder.trail_atr_mult * atr)
        }
        _ => None,
    };

    if !position.is_open() {
        return StopRecommendation::NoChange {
            reason: "position closed".into(),
            trailing_candidate,
        };
    }
    let Some(r) = position.r_multiple(inputs.price) else {
        return StopRecommendation::NoChange {
            reason: "no initial risk or invalid price".into(),
            trailing_candidate,
        };
    };

    let reached = ladder.level_for(r);
    let level = reached.max(position.protection_level());
    let floor = ladder.floor(level, position.entry_price, position.initial_risk, position.initial_stop);

    let (proposed, source) = match (level, trailing_candidate) {
        (ProtectionLevel::Lock1RTrail, Some(trail)) if trail > floor => (trail, "trailing stop"),
        _ => (floor, "level floor"),
    };

    let current = position.current_stop();
    if proposed <= current {
        return StopRecommendation::NoChange {
            reason: format!(
                "R={r:.2} at {level}: proposed {proposed:.2} does not exceed current stop {current:.2}"
            ),
            trailing_candidate,
        };
    }

    StopRecommendation::Raise(StopProposal {
        new_stop: proposed,
        level,
        justification: format!(
            "R={r:.2} reached {level}: raise stop {current:.2} -> {proposed:.2} ({source})"
        ),
        trailing_candidate,
    })
}
