//! Breakout scoring: quality (BQS), fragility (FWS) and the net score (NCS).
//!
//! All scores are pure functions of the snapshot and context they are given.

pub mod bqs;
pub mod classify;
pub mod fws;
pub mod ncs;

pub use bqs::{breakout_quality, BqsBreakdown};
pub use classify::{classify_scores, ScoreClass, ScoreThresholds};
pub use fws::{fragility, FwsBreakdown};
pub use ncs::{net_score, NcsBreakdown, NcsInputs};

use crate::indicators::IndicatorSnapshot;
use crate::regime::Regime;
use serde::{Deserialize, Serialize};

/// Market-level inputs shared by every candidate in a scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    /// Today's (combined) benchmark label, before stability confirmation.
    pub regime: Regime,
    pub regime_stable: bool,
    pub regime_flipped_recently: bool,
    pub benchmark_return_63d: Option<f64>,
}

impl Default for MarketContext {
    fn default() -> Self {
        Self {
            regime: Regime::Sideways,
            regime_stable: false,
            regime_flipped_recently: false,
            benchmark_return_63d: None,
        }
    }
}

/// Everything the scorer produced for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub bqs: BqsBreakdown,
    pub fws: FwsBreakdown,
    pub ncs: NcsBreakdown,
    pub class: ScoreClass,
}

impl ScoreCard {
    pub fn compute(
        snapshot: &IndicatorSnapshot,
        market: &MarketContext,
        penalties: &NcsInputs,
        thresholds: &ScoreThresholds,
    ) -> Self {
        let bqs = breakout_quality(snapshot, market);
        let fws = fragility(snapshot, market);
        let ncs = net_score(bqs.total, fws.total, penalties);
        let class = classify_scores(ncs.total, fws.total, thresholds);
        Self {
            bqs,
            fws,
            ncs,
            class,
        }
    }
}

/// Linear ramp: 0 at `lo`, `max` at `hi`, clamped.
pub(crate) fn ramp(value: f64, lo: f64, hi: f64, max: f64) -> f64 {
    if hi <= lo {
        return 0.0;
    }
    ((value - lo) / (hi - lo) * max).clamp(0.0, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_is_clamped() {
        assert_eq!(ramp(15.0, 15.0, 35.0, 25.0), 0.0);
        assert_eq!(ramp(25.0, 15.0, 35.0, 25.0), 12.5);
        assert_eq!(ramp(50.0, 15.0, 35.0, 25.0), 25.0);
        assert_eq!(ramp(1.0, 2.0, 2.0, 10.0), 0.0);
    }
}
