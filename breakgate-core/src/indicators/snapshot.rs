//! Per-candidate indicator snapshot.
//!
//! Every field whose lookback is not satisfied by the available history is
//! `None`. Scoring and gates treat `None` as "not evaluated".

use super::{
    adx::directional_series, atr::Atr, hurst::hurst_exponent, last_valid, levels, returns,
    sma::Sma, valid_at_offset, volume::volume_ratio, weekly, Indicator, WeeklyTrend,
};
use crate::domain::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const ATR_PERIOD: usize = 14;
pub const ADX_PERIOD: usize = 14;
/// ATR reference is taken this many bars before the latest bar.
pub const ATR_REF_OFFSET: usize = 20;
pub const BREAKOUT_LOOKBACK: usize = 20;
pub const LONG_BREAKOUT_LOOKBACK: usize = 55;
pub const VOLUME_LOOKBACK: usize = 20;
/// Roughly three months of trading days.
pub const RETURN_LOOKBACK: usize = 63;

const BUFFER_BASE: f64 = 0.18;
const BUFFER_K: f64 = 0.60;
const BUFFER_MIN: f64 = 0.05;
const BUFFER_MAX: f64 = 0.20;
const BUFFER_FALLBACK: f64 = 0.08;
const STOP_ATR_MULT: f64 = 2.0;

/// Entry buffer multiple of ATR, given ATR as a fraction of price.
/// Calm names get a larger buffer, volatile names a smaller one.
pub fn adaptive_buffer(atr_fraction: f64) -> f64 {
    if !atr_fraction.is_finite() || atr_fraction <= 0.0 {
        return BUFFER_FALLBACK;
    }
    (BUFFER_BASE - BUFFER_K * atr_fraction).clamp(BUFFER_MIN, BUFFER_MAX)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub date: Option<NaiveDate>,
    /// Number of bars the snapshot was computed from.
    pub history: usize,
    pub price: Option<f64>,
    pub atr14: Option<f64>,
    pub atr_ref: Option<f64>,
    pub adx: Option<f64>,
    pub adx_prev: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    pub ma200: Option<f64>,
    pub high20: Option<f64>,
    pub high55: Option<f64>,
    pub low20: Option<f64>,
    pub low55: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub hurst: Option<f64>,
    pub weekly_trend: Option<WeeklyTrend>,
    pub return_63d: Option<f64>,
}

impl IndicatorSnapshot {
    /// Build the snapshot as of the last bar. Bars must be oldest-first.
    pub fn from_bars(bars: &[Bar]) -> Self {
        let Some(last) = bars.last() else {
            return Self::default();
        };
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let atr = Atr::new(ATR_PERIOD).compute(bars);
        let dirs = directional_series(bars, ADX_PERIOD);

        Self {
            date: Some(last.date),
            history: bars.len(),
            price: Some(last.close).filter(|p| p.is_finite() && *p > 0.0),
            atr14: last_valid(&atr),
            atr_ref: valid_at_offset(&atr, ATR_REF_OFFSET),
            adx: last_valid(&dirs.adx),
            adx_prev: valid_at_offset(&dirs.adx, 1),
            plus_di: last_valid(&dirs.plus_di),
            minus_di: last_valid(&dirs.minus_di),
            ma20: last_valid(&Sma::new(20).compute(bars)),
            ma50: last_valid(&Sma::new(50).compute(bars)),
            ma200: last_valid(&Sma::new(200).compute(bars)),
            high20: levels::prior_high(bars, BREAKOUT_LOOKBACK),
            high55: levels::prior_high(bars, LONG_BREAKOUT_LOOKBACK),
            low20: levels::prior_low(bars, BREAKOUT_LOOKBACK),
            low55: levels::prior_low(bars, LONG_BREAKOUT_LOOKBACK),
            volume_ratio: volume_ratio(bars, VOLUME_LOOKBACK),
            hurst: hurst_exponent(&closes),
            weekly_trend: weekly::weekly_trend(bars),
            return_63d: returns::trailing_return(bars, RETURN_LOOKBACK),
        }
    }

    /// True when the fields needed for a breakout decision are all present.
    pub fn is_scorable(&self) -> bool {
        self.price.is_some()
            && self.atr14.is_some()
            && self.adx.is_some()
            && self.plus_di.is_some()
            && self.minus_di.is_some()
            && self.high20.is_some()
            && self.low20.is_some()
    }

    /// ATR14 as a fraction of price.
    pub fn atr_fraction(&self) -> Option<f64> {
        match (self.atr14, self.price) {
            (Some(atr), Some(p)) if p > 0.0 => Some(atr / p),
            _ => None,
        }
    }

    /// ATR14 as a percentage of price.
    pub fn atr_pct(&self) -> Option<f64> {
        self.atr_fraction().map(|f| f * 100.0)
    }

    /// 20-day high plus the adaptive ATR buffer.
    pub fn entry_trigger(&self) -> Option<f64> {
        let high = self.high20?;
        let atr = self.atr14?;
        let buffer = adaptive_buffer(self.atr_fraction().unwrap_or(f64::NAN));
        Some(high + buffer * atr)
    }

    /// max(trigger − 2·ATR, 20-day low).
    pub fn initial_stop(&self) -> Option<f64> {
        let trigger = self.entry_trigger()?;
        let atr = self.atr14?;
        let low = self.low20?;
        Some((trigger - STOP_ATR_MULT * atr).max(low))
    }

    /// Distance from price up to the entry trigger, percent of the trigger.
    /// Negative when price is already above it.
    pub fn distance_to_trigger_pct(&self) -> Option<f64> {
        let trigger = self.entry_trigger()?;
        let price = self.price?;
        if trigger <= 0.0 {
            return None;
        }
        Some((trigger - price) / trigger * 100.0)
    }

    /// Price is above MA50.
    pub fn above_ma50(&self) -> Option<bool> {
        Some(self.price? > self.ma50?)
    }
}
