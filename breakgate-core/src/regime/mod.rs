//! Market regime detection.
//!
//! `classify` turns one benchmark's inputs into a daily label,
//! `stability::confirm` requires the label to persist before it is trusted,
//! and `combine` merges two benchmarks.

pub mod combine;
pub mod stability;

pub use combine::{combine, CombinedRegime};
pub use stability::{confirm, regime_flipped_recently, DailyRegime, RegimeState};

use crate::indicators::IndicatorSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-width of the band around the 200-day MA, as a fraction.
pub const CHOP_BAND_PCT: f64 = 0.02;
/// Margin the winning side needs over the other.
pub const DECISIVE_MARGIN: u32 = 3;

const TREND_WEIGHT: u32 = 3;
const DI_WEIGHT_STRONG: u32 = 2;
const DI_WEIGHT_WEAK: u32 = 1;
const ADX_STRONG: f64 = 20.0;
const VOL_CALM: f64 = 20.0;
const VOL_ELEVATED: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Bullish,
    Sideways,
    Bearish,
    /// Label has not persisted long enough to be trusted.
    Chop,
    /// Benchmark data too old to classify.
    Unknown,
}

impl Regime {
    /// New long entries are only allowed in a bullish regime.
    pub fn can_buy(self) -> bool {
        matches!(self, Regime::Bullish)
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Regime::Bullish => "BULLISH",
            Regime::Sideways => "SIDEWAYS",
            Regime::Bearish => "BEARISH",
            Regime::Chop => "CHOP",
            Regime::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Free-function form of [`Regime::can_buy`].
pub fn can_buy(regime: Regime) -> bool {
    regime.can_buy()
}

/// Inclusive price band around a moving average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChopBand {
    pub lower: f64,
    pub upper: f64,
}

impl ChopBand {
    pub fn around(ma: f64, pct: f64) -> Self {
        Self {
            lower: ma * (1.0 - pct),
            upper: ma * (1.0 + pct),
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }
}

/// Benchmark inputs for one day. Any field may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeInputs {
    pub price: Option<f64>,
    pub ma200: Option<f64>,
    pub adx: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    /// Volatility index level (VIX-like).
    pub vol_index: Option<f64>,
    /// Fraction of sampled names above their 50-day MA. Reported only.
    pub breadth: Option<f64>,
}

impl RegimeInputs {
    pub fn from_snapshot(snapshot: &IndicatorSnapshot, vol_index: Option<f64>) -> Self {
        Self {
            price: snapshot.price,
            ma200: snapshot.ma200,
            adx: snapshot.adx,
            plus_di: snapshot.plus_di,
            minus_di: snapshot.minus_di,
            vol_index,
            breadth: None,
        }
    }

    pub fn with_breadth(mut self, breadth: Option<f64>) -> Self {
        self.breadth = breadth;
        self
    }
}

/// Result of classifying a single benchmark on a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub regime: Regime,
    pub bull_score: u32,
    pub bear_score: u32,
    pub in_chop_band: bool,
    pub band: Option<ChopBand>,
    pub breadth: Option<f64>,
    pub notes: Vec<String>,
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// Benchmark bars older than this many calendar days are not classified.
pub const MAX_DATA_AGE_DAYS: i64 = 5;

/// `classify`, unless the benchmark's last bar is more than `max_age_days`
/// old, in which case the reading is UNKNOWN.
pub fn classify_dated(inputs: &RegimeInputs, data_age_days: i64, max_age_days: i64) -> RegimeReading {
    if data_age_days <= max_age_days {
        return classify(inputs);
    }
    RegimeReading {
        regime: Regime::Unknown,
        bull_score: 0,
        bear_score: 0,
        in_chop_band: false,
        band: None,
        breadth: finite(inputs.breadth),
        notes: vec![format!(
            "stale benchmark data: last bar {data_age_days}d old (max {max_age_days}d)"
        )],
    }
}

/// Classify a benchmark. Never panics; missing price or MA yields SIDEWAYS.
pub fn classify(inputs: &RegimeInputs) -> RegimeReading {
    let mut reading = RegimeReading {
        regime: Regime::Sideways,
        bull_score: 0,
        bear_score: 0,
        in_chop_band: false,
        band: None,
        breadth: finite(inputs.breadth),
        notes: Vec::new(),
    };

    let (price, ma) = match (finite(inputs.price), finite(inputs.ma200)) {
        (Some(p), Some(m)) if m > 0.0 => (p, m),
        _ => {
            reading
                .notes
                .push("insufficient data: benchmark price or 200-day MA missing".into());
            return reading;
        }
    };

    let band = ChopBand::around(ma, CHOP_BAND_PCT);
    reading.band = Some(band);
    if band.contains(price) {
        reading.in_chop_band = true;
        reading.notes.push(format!(
            "price {price:.2} inside chop band [{:.2}, {:.2}]",
            band.lower, band.upper
        ));
        return reading;
    }

    if price > ma {
        reading.bull_score += TREND_WEIGHT;
    } else {
        reading.bear_score += TREND_WEIGHT;
    }

    if let (Some(pdi), Some(mdi)) = (finite(inputs.plus_di), finite(inputs.minus_di)) {
        let weight = match finite(inputs.adx) {
            Some(adx) if adx >= ADX_STRONG => DI_WEIGHT_STRONG,
            _ => DI_WEIGHT_WEAK,
        };
        if pdi > mdi {
            reading.bull_score += weight;
        } else if mdi > pdi {
            reading.bear_score += weight;
        }
    }

    if let Some(vix) = finite(inputs.vol_index) {
        if vix < VOL_CALM {
            reading.bull_score += 1;
        } else if vix > VOL_ELEVATED {
            reading.bear_score += 1;
        }
    }

    let (bull, bear) = (reading.bull_score, reading.bear_score);
    reading.regime = if bull >= bear + DECISIVE_MARGIN {
        Regime::Bullish
    } else if bear >= bull + DECISIVE_MARGIN {
        Regime::Bearish
    } else {
        Regime::Sideways
    };
    reading
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(price: f64, ma: f64) -> RegimeInputs {
        RegimeInputs {
            price: Some(price),
            ma200: Some(ma),
            ..Default::default()
        }
    }

    #[test]
    fn stale_benchmark_is_unknown() {
        let bullish = inputs(560.0, 480.0);
        assert_eq!(classify_dated(&bullish, 5, MAX_DATA_AGE_DAYS).regime, Regime::Bullish);

        let r = classify_dated(&bullish, 6, MAX_DATA_AGE_DAYS);
        assert_eq!(r.regime, Regime::Unknown);
        assert!(!r.regime.can_buy());
        assert!(r.notes[0].contains("6d old"));
    }

    #[test]
    fn chop_band_edges() {
        let band = ChopBand::around(480.0, CHOP_BAND_PCT);
        assert!((band.lower - 470.4).abs() < 1e-9);
        assert!((band.upper - 489.6).abs() < 1e-9);
        assert!(band.contains(489.0));
        assert!(!band.contains(491.0));
    }

    #[test]
    fn inside_band_is_sideways() {
        let r = classify(&inputs(489.0, 480.0));
        assert_eq!(r.regime, Regime::Sideways);
        assert!(r.in_chop_band);
    }

    #[test]
    fn trend_alone_is_decisive() {
        assert_eq!(classify(&inputs(520.0, 480.0)).regime, Regime::Bullish);
        assert_eq!(classify(&inputs(440.0, 480.0)).regime, Regime::Bearish);
    }

    #[test]
    fn opposing_signals_cancel() {
        let r = classify(&RegimeInputs {
            adx: Some(28.0),
            plus_di: Some(15.0),
            minus_di: Some(30.0),
            vol_index: Some(35.0),
            ..inputs(520.0, 480.0)
        });
        // bull 3, bear 2 + 1
        assert_eq!((r.bull_score, r.bear_score), (3, 3));
        assert_eq!(r.regime, Regime::Sideways);
    }

    #[test]
    fn weak_adx_halves_di_weight() {
        let r = classify(&RegimeInputs {
            adx: Some(12.0),
            plus_di: Some(15.0),
            minus_di: Some(30.0),
            ..inputs(520.0, 480.0)
        });
        assert_eq!((r.bull_score, r.bear_score), (3, 1));
        assert_eq!(r.regime, Regime::Sideways);
    }

    #[test]
    fn missing_inputs_never_panic() {
        let r = classify(&RegimeInputs::default());
        assert_eq!(r.regime, Regime::Sideways);
        assert!(r.notes[0].contains("insufficient data"));

        let nan = classify(&inputs(f64::NAN, 480.0));
        assert_eq!(nan.regime, Regime::Sideways);
    }

    #[test]
    fn breadth_is_reported_not_scored() {
        let r = classify(&inputs(520.0, 480.0).with_breadth(Some(0.1)));
        assert_eq!(r.breadth, Some(0.1));
        assert_eq!(r.regime, Regime::Bullish);
    }

    #[test]
    fn only_bullish_can_buy() {
        assert!(can_buy(Regime::Bullish));
        assert!(!can_buy(Regime::Sideways));
        assert!(!can_buy(Regime::Bearish));
        assert!(!can_buy(Regime::Chop));
    }
}
