//! Breakout Quality Score.

use super::{ramp, MarketContext};
use crate::indicators::{IndicatorSnapshot, WeeklyTrend};
use crate::regime::Regime;
use serde::{Deserialize, Serialize};

const TREND_MAX: f64 = 25.0;
const ADX_FLOOR: f64 = 15.0;
const ADX_SATURATED: f64 = 35.0;
const SPREAD_MAX: f64 = 10.0;
const VOLATILITY_MAX: f64 = 15.0;
const PROXIMITY_MAX: f64 = 10.0;
const RS_MAX: f64 = 10.0;
const VOLUME_BONUS: f64 = 5.0;
const VOLUME_BONUS_RATIO: f64 = 1.5;
const WEEKLY_POINTS: f64 = 5.0;
const PERSISTENCE_MAX: f64 = 10.0;

/// Per-component BQS points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BqsBreakdown {
    pub trend_strength: f64,
    pub directional_spread: f64,
    pub volatility: f64,
    pub proximity: f64,
    pub tailwind: f64,
    pub relative_strength: f64,
    pub volume_bonus: f64,
    pub weekly_trend: f64,
    pub persistence: f64,
    pub total: f64,
}

/// Full credit for ATR% in [1.5, 4.0], linear to zero at 0.5 and 8.0.
fn volatility_points(atr_pct: f64) -> f64 {
    if (1.5..=4.0).contains(&atr_pct) {
        VOLATILITY_MAX
    } else if atr_pct > 0.5 && atr_pct < 1.5 {
        ramp(atr_pct, 0.5, 1.5, VOLATILITY_MAX)
    } else if atr_pct > 4.0 && atr_pct < 8.0 {
        VOLATILITY_MAX * (8.0 - atr_pct) / 4.0
    } else {
        0.0
    }
}

/// Full credit within 2% of the trigger, linear to zero at 5%.
fn proximity_points(distance_pct: f64) -> f64 {
    let d = distance_pct.abs();
    if d <= 2.0 {
        PROXIMITY_MAX
    } else if d < 5.0 {
        PROXIMITY_MAX * (5.0 - d) / 3.0
    } else {
        0.0
    }
}

fn tailwind_points(market: &MarketContext) -> f64 {
    match market.regime {
        Regime::Bullish if market.regime_stable => 15.0,
        Regime::Bullish => 10.0,
        Regime::Sideways | Regime::Chop => 5.0,
        Regime::Bearish | Regime::Unknown => 0.0,
    }
}

pub fn breakout_quality(snapshot: &IndicatorSnapshot, market: &MarketContext) -> BqsBreakdown {
    let mut b = BqsBreakdown {
        trend_strength: snapshot
            .adx
            .map_or(0.0, |adx| ramp(adx, ADX_FLOOR, ADX_SATURATED, TREND_MAX)),
        tailwind: tailwind_points(market),
        ..Default::default()
    };

    if let (Some(pdi), Some(mdi)) = (snapshot.plus_di, snapshot.minus_di) {
        b.directional_spread = ((pdi - mdi) / 20.0 * SPREAD_MAX).clamp(0.0, SPREAD_MAX);
    }
    if let Some(atr_pct) = snapshot.atr_pct() {
        b.volatility = volatility_points(atr_pct);
    }
    if let Some(distance) = snapshot.distance_to_trigger_pct() {
        b.proximity = proximity_points(distance);
    }
    if let (Some(ret), Some(bench)) = (snapshot.return_63d, market.benchmark_return_63d) {
        let spread_pts = (ret - bench) * 100.0;
        b.relative_strength = (spread_pts / 2.0).clamp(0.0, RS_MAX);
    }
    if snapshot.volume_ratio.is_some_and(|r| r >= VOLUME_BONUS_RATIO) {
        b.volume_bonus = VOLUME_BONUS;
    }
    b.weekly_trend = match snapshot.weekly_trend {
        Some(WeeklyTrend::Up) => WEEKLY_POINTS,
        Some(WeeklyTrend::Down) => -WEEKLY_POINTS,
        _ => 0.0,
    };
    if let Some(h) = snapshot.hurst {
        b.persistence = ramp(h, 0.5, 0.7, PERSISTENCE_MAX);
    }

    let sum = b.trend_strength
        + b.directional_spread
        + b.volatility
        + b.proximity
        + b.tailwind
        + b.relative_strength
        + b.volume_bonus
        + b.weekly_trend
        + b.persistence;
    b.total = sum.clamp(0.0, 100.0);
    b
}
