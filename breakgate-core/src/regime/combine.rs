use super::{Regime, RegimeReading};
use serde::{Deserialize, Serialize};

/// Regime across a primary and optional secondary benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedRegime {
    pub regime: Regime,
    /// Either benchmark sits inside its own chop band.
    pub chop_detected: bool,
}

/// BULLISH only if both are bullish, BEARISH if either is bearish,
/// UNKNOWN if either could not be read, SIDEWAYS otherwise. A single
/// benchmark passes through unchanged.
pub fn combine(primary: &RegimeReading, secondary: Option<&RegimeReading>) -> CombinedRegime {
    let Some(secondary) = secondary else {
        return CombinedRegime {
            regime: primary.regime,
            chop_detected: primary.in_chop_band,
        };
    };

    let regime = match (primary.regime, secondary.regime) {
        (Regime::Bearish, _) | (_, Regime::Bearish) => Regime::Bearish,
        (Regime::Bullish, Regime::Bullish) => Regime::Bullish,
        (Regime::Unknown, _) | (_, Regime::Unknown) => Regime::Unknown,
        _ => Regime::Sideways,
    };
    CombinedRegime {
        regime,
        chop_detected: primary.in_chop_band || secondary.in_chop_band,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::{classify, RegimeInputs};

    fn reading(price: f64) -> RegimeReading {
        classify(&RegimeInputs {
            price: Some(price),
            ma200: Some(100.0),
            ..Default::default()
        })
    }

    #[test]
    fn both_bullish() {
        let c = combine(&reading(110.0), Some(&reading(115.0)));
        assert_eq!(c.regime, Regime::Bullish);
        assert!(!c.chop_detected);
    }

    #[test]
    fn either_bearish_wins() {
        let c = combine(&reading(90.0), Some(&reading(115.0)));
        assert_eq!(c.regime, Regime::Bearish);
    }

    #[test]
    fn chop_band_and_bullish() {
        let c = combine(&reading(101.0), Some(&reading(115.0)));
        assert_eq!(c.regime, Regime::Sideways);
        assert!(c.chop_detected);
    }

    #[test]
    fn stale_benchmark_poisons_all_but_bearish() {
        let stale = crate::regime::classify_dated(&RegimeInputs::default(), 10, 5);
        assert_eq!(combine(&stale, Some(&reading(115.0))).regime, Regime::Unknown);
        assert_eq!(combine(&reading(90.0), Some(&stale)).regime, Regime::Bearish);
    }

    #[test]
    fn single_benchmark_passes_through() {
        let c = combine(&reading(110.0), None);
        assert_eq!(c.regime, Regime::Bullish);
    }
}
