//! Return series and pairwise correlation.

use crate::domain::Bar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ln(p[t] / p[t-1]); NaN where either price is non-positive or NaN.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 && w[1] > 0.0 {
                (w[1] / w[0]).ln()
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Simple return over the last `lookback` bars: close[t] / close[t-lookback] - 1.
pub fn trailing_return(bars: &[Bar], lookback: usize) -> Option<f64> {
    if lookback == 0 || bars.len() <= lookback {
        return None;
    }
    let last = bars[bars.len() - 1].close;
    let base = bars[bars.len() - 1 - lookback].close;
    if base.is_nan() || base <= 0.0 || !last.is_finite() {
        return None;
    }
    Some(last / base - 1.0)
}

/// Pearson correlation of two equal-length series. NaN pairs are skipped.
/// `None` with fewer than two usable pairs or zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let ma = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mb = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut va = 0.0;
    let mut vb = 0.0;
    for (x, y) in &pairs {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va == 0.0 || vb == 0.0 {
        return None;
    }
    Some((cov / (va.sqrt() * vb.sqrt())).clamp(-1.0, 1.0))
}

/// Correlation of two tickers together with how many overlapping
/// observations produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairCorrelation {
    pub r: f64,
    pub observations: usize,
}

/// Date-aligned log-return correlation over the last `window` overlapping
/// returns of two bar histories.
pub fn pair_correlation(a: &[Bar], b: &[Bar], window: usize) -> Option<PairCorrelation> {
    let by_date: BTreeMap<NaiveDate, f64> = b.iter().map(|bar| (bar.date, bar.close)).collect();
    let aligned: Vec<(f64, f64)> = a
        .iter()
        .filter_map(|bar| by_date.get(&bar.date).map(|close_b| (bar.close, *close_b)))
        .collect();
    if aligned.len() < 3 {
        return None;
    }
    let start = aligned.len().saturating_sub(window + 1);
    let (pa, pb): (Vec<f64>, Vec<f64>) = aligned[start..].iter().copied().unzip();
    let ra = log_returns(&pa);
    let rb = log_returns(&pb);
    let observations = ra
        .iter()
        .zip(&rb)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .count();
    let r = pearson(&ra, &rb)?;
    Some(PairCorrelation { r, observations })
}
