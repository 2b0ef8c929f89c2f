//! ADX: Average Directional Index (Wilder), with the +DI / −DI lines.
//!
//! 1. +DM / −DM from consecutive bars
//! 2. Wilder-smooth +DM, −DM and TR
//! 3. ±DI = 100 · smoothed(±DM) / smoothed(TR)
//! 4. DX = 100 · |+DI − −DI| / (+DI + −DI)
//! 5. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 · period.

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::Bar;

/// The three directional series, aligned with the input bars.
#[derive(Debug, Clone, PartialEq)]
pub struct AdxSeries {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

pub fn directional_series(bars: &[Bar], period: usize) -> AdxSeries {
    let n = bars.len();
    let mut series = AdxSeries {
        adx: vec![f64::NAN; n],
        plus_di: vec![f64::NAN; n],
        minus_di: vec![f64::NAN; n],
    };
    if n < 2 || period == 0 {
        return series;
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];
    for i in 1..n {
        let (cur, prev) = (&bars[i], &bars[i - 1]);
        if cur.high.is_nan() || cur.low.is_nan() || prev.high.is_nan() || prev.low.is_nan() {
            continue;
        }
        let up = cur.high - prev.high;
        let down = prev.low - cur.low;
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }

    let mut tr = true_range(bars);
    tr[0] = f64::NAN;
    let smooth_tr = wilder_smooth(&tr, period);
    let smooth_plus = wilder_smooth(&plus_dm, period);
    let smooth_minus = wilder_smooth(&minus_dm, period);

    let mut dx = vec![f64::NAN; n];
    for i in 0..n {
        if smooth_tr[i].is_nan() || smooth_plus[i].is_nan() || smooth_minus[i].is_nan() {
            continue;
        }
        if smooth_tr[i] == 0.0 {
            continue;
        }
        let pdi = 100.0 * smooth_plus[i] / smooth_tr[i];
        let mdi = 100.0 * smooth_minus[i] / smooth_tr[i];
        series.plus_di[i] = pdi;
        series.minus_di[i] = mdi;
        let sum = pdi + mdi;
        dx[i] = if sum == 0.0 {
            0.0
        } else {
            100.0 * (pdi - mdi).abs() / sum
        };
    }

    series.adx = wilder_smooth(&dx, period);
    series
}

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }

    pub fn series(&self, bars: &[Bar]) -> AdxSeries {
        directional_series(bars, self.period)
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        directional_series(bars, self.period).adx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn adx_bounds() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0 + i as f64 * 0.2)
            .collect();
        let result = Adx::new(14).compute(&make_bars(&closes));
        for v in result.iter().filter(|v| !v.is_nan()) {
            assert!((0.0..=100.0).contains(v), "ADX out of range: {v}");
        }
    }

    #[test]
    fn uptrend_has_plus_di_above_minus_di() {
        let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64 * 2.0).collect();
        let s = Adx::new(14).series(&make_bars(&closes));
        let last = closes.len() - 1;
        assert!(s.plus_di[last] > s.minus_di[last]);
        assert!(s.adx[last] > 25.0);
    }

    #[test]
    fn warmup_is_nan() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let adx = Adx::new(14).compute(&make_bars(&closes));
        // DX first valid at index 14, ADX seed needs 14 DX values
        assert!(adx[26].is_nan());
        assert!(!adx[27].is_nan());
    }

    #[test]
    fn short_series_is_all_nan() {
        let s = directional_series(&make_bars(&[100.0]), 14);
        assert!(s.adx[0].is_nan() && s.plus_di[0].is_nan());
    }
}
