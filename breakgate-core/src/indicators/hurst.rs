//! Hurst exponent by rescaled-range (R/S) analysis.
//!
//! Log returns are split into non-overlapping chunks at several window sizes;
//! the slope of log(mean R/S) against log(window) estimates H. H > 0.5 means
//! trending, H < 0.5 mean-reverting.

/// Minimum number of returns for an estimate.
pub const MIN_RETURNS: usize = 64;

const MIN_WINDOW: usize = 8;

fn rescaled_range(chunk: &[f64]) -> Option<f64> {
    let n = chunk.len() as f64;
    let mean = chunk.iter().sum::<f64>() / n;
    let var = chunk.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    if std < 1e-12 {
        return None;
    }
    let mut cum = 0.0;
    let mut lo = 0.0_f64;
    let mut hi = 0.0_f64;
    for r in chunk {
        cum += r - mean;
        lo = lo.min(cum);
        hi = hi.max(cum);
    }
    Some((hi - lo) / std)
}

/// Hurst exponent of a close series, clamped to [0, 1].
pub fn hurst_exponent(closes: &[f64]) -> Option<f64> {
    let returns = super::log_returns(closes);
    if returns.len() < MIN_RETURNS || returns.iter().any(|r| !r.is_finite()) {
        return None;
    }

    let mut points: Vec<(f64, f64)> = Vec::new();
    let mut window = MIN_WINDOW;
    while window <= returns.len() / 2 {
        let rs: Vec<f64> = returns
            .chunks_exact(window)
            .filter_map(rescaled_range)
            .collect();
        if !rs.is_empty() {
            let mean_rs = rs.iter().sum::<f64>() / rs.len() as f64;
            if mean_rs > 0.0 {
                points.push(((window as f64).ln(), mean_rs.ln()));
            }
        }
        window *= 2;
    }
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxy: f64 = points.iter().map(|(x, y)| (x - mx) * (y - my)).sum();
    let sxx: f64 = points.iter().map(|(x, _)| (x - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    Some((sxy / sxx).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_returns() {
        let closes: Vec<f64> = (0..64).map(|i| 100.0 + i as f64).collect();
        // 64 closes = 63 returns
        assert_eq!(hurst_exponent(&closes), None);
    }

    #[test]
    fn flat_series_has_no_estimate() {
        assert_eq!(hurst_exponent(&[100.0; 200]), None);
    }

    #[test]
    fn estimate_is_bounded() {
        let closes: Vec<f64> = (0..300)
            .map(|i| 100.0 + ((i * 7919 % 13) as f64 - 6.0) * 0.5 + i as f64 * 0.1)
            .collect();
        let h = hurst_exponent(&closes).unwrap();
        assert!((0.0..=1.0).contains(&h));
    }

    #[test]
    fn alternating_returns_are_anti_persistent() {
        let mut closes = vec![100.0];
        for i in 0..256 {
            let step = if i % 2 == 0 { 1.01 } else { 1.0 / 1.01 };
            let last = *closes.last().unwrap();
            closes.push(last * step);
        }
        let h = hurst_exponent(&closes).unwrap();
        assert!(h < 0.5, "expected mean reversion, got {h}");
    }
}
