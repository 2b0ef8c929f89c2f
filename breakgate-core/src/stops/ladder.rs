use serde::{Deserialize, Serialize};
use std::fmt;

/// Forward-only protection levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtectionLevel {
    #[default]
    Initial,
    Breakeven,
    #[serde(rename = "LOCK_08R")]
    Lock08R,
    #[serde(rename = "LOCK_1R_TRAIL")]
    Lock1RTrail,
}

impl fmt::Display for ProtectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProtectionLevel::Initial => "INITIAL",
            ProtectionLevel::Breakeven => "BREAKEVEN",
            ProtectionLevel::Lock08R => "LOCK_08R",
            ProtectionLevel::Lock1RTrail => "LOCK_1R_TRAIL",
        };
        f.write_str(s)
    }
}

/// R-multiple triggers and floors for each protection level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLadder {
    pub breakeven_r: f64,
    pub lock_r: f64,
    pub lock_offset_r: f64,
    pub trail_r: f64,
    pub trail_offset_r: f64,
    pub trail_atr_mult: f64,
}

impl Default for StopLadder {
    fn default() -> Self {
        Self {
            breakeven_r: 1.5,
            lock_r: 2.5,
            lock_offset_r: 0.8,
            trail_r: 3.0,
            trail_offset_r: 1.0,
            trail_atr_mult: 2.0,
        }
    }
}

impl StopLadder {
    /// Highest level whose trigger `r` has reached.
    pub fn level_for(&self, r: f64) -> ProtectionLevel {
        if r >= self.trail_r {
            ProtectionLevel::Lock1RTrail
        } else if r >= self.lock_r {
            ProtectionLevel::Lock08R
        } else if r >= self.breakeven_r {
            ProtectionLevel::Breakeven
        } else {
            ProtectionLevel::Initial
        }
    }

    /// Minimum stop for `level`.
    pub fn floor(
        &self,
        level: ProtectionLevel,
        entry: f64,
        one_r: f64,
        initial_stop: f64,
    ) -> f64 {
        match level {
            ProtectionLevel::Initial => initial_stop,
            ProtectionLevel::Breakeven => entry,
            ProtectionLevel::Lock08R => entry + self.lock_offset_r * one_r,
            ProtectionLevel::Lock1RTrail => entry + self.trail_offset_r * one_r,
        }
    }
}
