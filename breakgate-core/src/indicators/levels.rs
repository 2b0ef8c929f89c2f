//! Breakout reference levels: N-day highs and lows over the bars *before*
//! the current bar, so today's range never moves its own trigger.

use crate::domain::Bar;

fn rolling_extreme(bars: &[Bar], n: usize, pick: impl Fn(&Bar) -> f64, max: bool) -> Vec<f64> {
    let len = bars.len();
    let mut out = vec![f64::NAN; len];
    if n == 0 {
        return out;
    }
    for i in n..len {
        let window = &bars[i - n..i];
        let mut acc = if max { f64::NEG_INFINITY } else { f64::INFINITY };
        let mut poisoned = false;
        for bar in window {
            let v = pick(bar);
            if v.is_nan() {
                poisoned = true;
                break;
            }
            acc = if max { acc.max(v) } else { acc.min(v) };
        }
        if !poisoned {
            out[i] = acc;
        }
    }
    out
}

/// Highest high of the `n` bars preceding each bar.
pub fn rolling_high(bars: &[Bar], n: usize) -> Vec<f64> {
    rolling_extreme(bars, n, |b| b.high, true)
}

/// Lowest low of the `n` bars preceding each bar.
pub fn rolling_low(bars: &[Bar], n: usize) -> Vec<f64> {
    rolling_extreme(bars, n, |b| b.low, false)
}

/// N-day high as of the latest bar.
pub fn prior_high(bars: &[Bar], n: usize) -> Option<f64> {
    super::last_valid(&rolling_high(bars, n))
}

/// N-day low as of the latest bar.
pub fn prior_low(bars: &[Bar], n: usize) -> Option<f64> {
    super::last_valid(&rolling_low(bars, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_ohlc_bars;

    #[test]
    fn excludes_current_bar() {
        let bars = make_ohlc_bars(&[
            (10.0, 12.0, 9.0, 11.0),
            (11.0, 13.0, 10.0, 12.0),
            (12.0, 20.0, 11.0, 19.0),
        ]);
        let highs = rolling_high(&bars, 2);
        assert!(highs[1].is_nan());
        assert_eq!(highs[2], 13.0);
        assert_eq!(prior_low(&bars, 2), Some(9.0));
    }

    #[test]
    fn insufficient_history_is_none() {
        let bars = make_ohlc_bars(&[(10.0, 12.0, 9.0, 11.0)]);
        assert_eq!(prior_high(&bars, 20), None);
    }
}
