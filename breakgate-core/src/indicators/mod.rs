//! Indicator library.
//!
//! Indicators are pure functions over oldest-first bars. Series indicators
//! implement [`Indicator`] and return one value per bar with `f64::NAN`
//! during warmup; point-in-time helpers return `Option` instead, where `None`
//! means "not enough history", never zero.

pub mod adx;
pub mod atr;
pub mod hurst;
pub mod levels;
pub mod returns;
pub mod sma;
pub mod snapshot;
pub mod volume;
pub mod weekly;

pub use adx::{directional_series, Adx, AdxSeries};
pub use atr::{true_range, wilder_smooth, Atr};
pub use hurst::hurst_exponent;
pub use levels::{prior_high, prior_low, rolling_high, rolling_low};
pub use returns::{log_returns, pair_correlation, pearson, trailing_return, PairCorrelation};
pub use sma::Sma;
pub use snapshot::{adaptive_buffer, IndicatorSnapshot};
pub use volume::volume_ratio;
pub use weekly::{weekly_closes, weekly_trend, WeeklyTrend};

use crate::domain::Bar;

/// Trait for series indicators.
///
/// Output has the same length as `bars`; the first `lookback()` values are
/// `f64::NAN`. No value at bar t may depend on bars after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "atr_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Last value of a series, if it is a real number.
pub fn last_valid(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

/// Value `back` bars before the last, if it is a real number.
pub fn valid_at_offset(series: &[f64], back: usize) -> Option<f64> {
    let len = series.len();
    if back >= len {
        return None;
    }
    Some(series[len - 1 - back]).filter(|v| v.is_finite())
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Bars from explicit (open, high, low, close) tuples.
#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            date: base_date + chrono::Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_valid_skips_nan_tail() {
        assert_eq!(last_valid(&[1.0, 2.0]), Some(2.0));
        assert_eq!(last_valid(&[1.0, f64::NAN]), None);
        assert_eq!(last_valid(&[]), None);
    }

    #[test]
    fn offset_lookup() {
        let s = [1.0, 2.0, 3.0];
        assert_eq!(valid_at_offset(&s, 0), Some(3.0));
        assert_eq!(valid_at_offset(&s, 2), Some(1.0));
        assert_eq!(valid_at_offset(&s, 3), None);
    }
}
