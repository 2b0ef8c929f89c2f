//! Fragility Warning Score: how likely a breakout is to fail.

use super::MarketContext;
use crate::indicators::IndicatorSnapshot;
use serde::{Deserialize, Serialize};

const LOW_VOLUME_RATIO: f64 = 0.8;
const LOW_VOLUME_POINTS: f64 = 20.0;
const NEAR_EXTENSION_ATR: f64 = 0.5;
const FAR_EXTENSION_ATR: f64 = 1.5;
const EXTENSION_POINTS: f64 = 15.0;
const VOL_EXPANSION: f64 = 1.30;
const VOL_COLLAPSE: f64 = 0.70;
const VOL_EXPANSION_POINTS: f64 = 20.0;
const VOL_COLLAPSE_POINTS: f64 = 10.0;
const REGIME_FLIP_POINTS: f64 = 15.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FwsBreakdown {
    pub volume_risk: f64,
    pub extension: f64,
    pub marginal_trend: f64,
    pub volatility_shock: f64,
    pub regime_instability: f64,
    pub total: f64,
}

fn marginal_trend_points(adx: f64) -> f64 {
    if adx < 15.0 {
        25.0
    } else if adx < 20.0 {
        15.0
    } else if adx < 25.0 {
        5.0
    } else {
        0.0
    }
}

pub fn fragility(snapshot: &IndicatorSnapshot, market: &MarketContext) -> FwsBreakdown {
    let mut f = FwsBreakdown::default();

    if snapshot.volume_ratio.is_some_and(|r| r < LOW_VOLUME_RATIO) {
        f.volume_risk = LOW_VOLUME_POINTS;
    }

    if let (Some(price), Some(trigger), Some(atr)) =
        (snapshot.price, snapshot.entry_trigger(), snapshot.atr14)
    {
        if price > trigger + NEAR_EXTENSION_ATR * atr {
            f.extension += EXTENSION_POINTS;
        }
        if price > trigger + FAR_EXTENSION_ATR * atr {
            f.extension += EXTENSION_POINTS;
        }
    }

    if let Some(adx) = snapshot.adx {
        f.marginal_trend = marginal_trend_points(adx);
    }

    if let (Some(atr), Some(reference)) = (snapshot.atr14, snapshot.atr_ref) {
        if reference > 0.0 {
            let ratio = atr / reference;
            if ratio > VOL_EXPANSION {
                f.volatility_shock = VOL_EXPANSION_POINTS;
            } else if ratio < VOL_COLLAPSE {
                f.volatility_shock = VOL_COLLAPSE_POINTS;
            }
        }
    }

    if market.regime_flipped_recently {
        f.regime_instability = REGIME_FLIP_POINTS;
    }

    let sum = f.volume_risk + f.extension + f.marginal_trend + f.volatility_shock + f.regime_instability;
    f.total = sum.clamp(0.0, 100.0);
    f
}
