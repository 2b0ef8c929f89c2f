use crate::domain::Bar;

/// Today's volume over the mean volume of the previous `n` bars.
///
/// `None` without `n + 1` bars or when the reference mean is zero.
pub fn volume_ratio(bars: &[Bar], n: usize) -> Option<f64> {
    if n == 0 || bars.len() < n + 1 {
        return None;
    }
    let (today, history) = bars.split_last()?;
    let window = &history[history.len() - n..];
    let mean = window.iter().map(|b| b.volume as f64).sum::<f64>() / n as f64;
    if mean <= 0.0 {
        return None;
    }
    Some(today.volume as f64 / mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn ratio_against_prior_mean() {
        let mut bars = make_bars(&[10.0, 10.0, 10.0, 10.0]);
        bars[3].volume = 3000;
        assert_eq!(volume_ratio(&bars, 3), Some(3.0));
    }

    #[test]
    fn zero_reference_volume() {
        let mut bars = make_bars(&[10.0, 10.0]);
        bars[0].volume = 0;
        assert_eq!(volume_ratio(&bars, 1), None);
        assert_eq!(volume_ratio(&bars, 5), None);
    }
}
