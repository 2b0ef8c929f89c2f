use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    pub shares: u64,
    pub risk_per_share: f64,
    pub risk_dollars: f64,
}

/// Whole shares risking `risk_pct` of equity between trigger and stop,
/// after applying `scalar`. Zero when any input is missing or the stop
/// distance is not positive.
pub fn size_position(
    equity: f64,
    risk_pct: f64,
    entry_trigger: Option<f64>,
    stop: Option<f64>,
    scalar: f64,
) -> PositionSize {
    let (Some(trigger), Some(stop)) = (entry_trigger, stop) else {
        return PositionSize::default();
    };
    let per_share = trigger - stop;
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(per_share) || !usable(equity) || !usable(scalar) {
        return PositionSize::default();
    }
    let budget = equity * risk_pct / 100.0 * scalar;
    let shares = (budget / per_share).floor().max(0.0) as u64;
    PositionSize {
        shares,
        risk_per_share: per_share,
        risk_dollars: shares as f64 * per_share,
    }
}
