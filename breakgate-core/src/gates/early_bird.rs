//! Early entry into fast breakouts whose ADX has not caught up yet.

use super::{Advisory, Gate, GateContext, GateVerdict};
use crate::domain::Sleeve;

/// Top of the 55-day range on heavy volume with at least some direction.
///
/// Flags the candidate only; the classifier decides whether the flag may
/// lift it to READY.
#[derive(Debug, Clone)]
pub struct EarlyBirdGate {
    /// Minimum position of price within the 55-day range, 0..1.
    pub min_range_position: f64,
    pub min_volume_ratio: f64,
    pub min_adx: f64,
}

impl Default for EarlyBirdGate {
    fn default() -> Self {
        Self {
            min_range_position: 0.90,
            min_volume_ratio: 1.5,
            min_adx: 15.0,
        }
    }
}

impl Gate for EarlyBirdGate {
    fn name(&self) -> &'static str {
        "early_bird"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(c) = ctx.candidate() else {
            return GateVerdict::not_applicable(name, "candidate-only gate");
        };
        if matches!(c.sleeve, Sleeve::Etf | Sleeve::Hedge) {
            return GateVerdict::not_applicable(name, "stocks only");
        }
        let s = &c.snapshot;
        // The 20-day low stands in when the 55-day low is not available yet.
        let low = s.low55.or(s.low20);
        let (Some(price), Some(high), Some(low), Some(adx)) = (s.price, s.high55, low, s.adx) else {
            return GateVerdict::not_evaluated(name, "55-day range or ADX missing");
        };
        let range = high - low;
        if range.is_nan() || range <= 0.0 {
            return GateVerdict::not_evaluated(name, "empty 55-day range");
        }
        let position = (price - low) / range;

        if position < self.min_range_position {
            return GateVerdict::pass(
                name,
                format!("range position {:.0}%", position * 100.0),
            );
        }
        match s.volume_ratio {
            Some(v) if v >= self.min_volume_ratio => {}
            Some(v) => return GateVerdict::pass(name, format!("volume {v:.1}x")),
            None => return GateVerdict::pass(name, "volume ratio unavailable"),
        }
        if adx < self.min_adx {
            return GateVerdict::pass(name, format!("ADX {adx:.0}"));
        }
        GateVerdict::advisory(
            name,
            Advisory::EarlyBird,
            format!(
                "EARLY_BIRD: top {:.0}% of 55d range, volume {:.1}x, ADX {adx:.0}",
                ((1.0 - position) * 100.0).max(0.0),
                s.volume_ratio.unwrap_or_default()
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, Sleeve, UniverseEntry};
    use crate::gates::test_support::*;
    use crate::gates::{GateEffect, GateSubject};

    fn fast_mover(price: f64, volume: f64, adx: f64) -> Candidate {
        let mut c = candidate("PLTR", "SOFTWARE");
        c.snapshot.price = Some(price);
        c.snapshot.high55 = Some(100.0);
        c.snapshot.low55 = Some(80.0);
        c.snapshot.volume_ratio = Some(volume);
        c.snapshot.adx = Some(adx);
        c
    }

    fn run(c: &Candidate) -> GateVerdict {
        let f = Fixture::new(day(2024, 6, 3));
        EarlyBirdGate::default().evaluate(&f.ctx(GateSubject::Candidate(c)))
    }

    #[test]
    fn flags_top_of_range_on_volume() {
        let v = run(&fast_mover(98.0, 1.5, 15.0));
        assert_eq!(v.effect, GateEffect::Advisory(Advisory::EarlyBird));
        assert!(v.is_early_bird());
    }

    #[test]
    fn each_criterion_is_required() {
        assert_eq!(run(&fast_mover(97.0, 2.0, 20.0)).effect, GateEffect::Pass);
        assert_eq!(run(&fast_mover(99.0, 1.4, 20.0)).effect, GateEffect::Pass);
        assert_eq!(run(&fast_mover(99.0, 2.0, 14.0)).effect, GateEffect::Pass);
    }

    #[test]
    fn falls_back_to_twenty_day_low() {
        let mut c = fast_mover(99.5, 2.0, 20.0);
        c.snapshot.low55 = None;
        // low20 = 92 from the fixture
        assert_eq!(run(&c).effect, GateEffect::Advisory(Advisory::EarlyBird));
        c.snapshot.high55 = None;
        assert_eq!(run(&c).effect, GateEffect::NotEvaluated);
    }

    #[test]
    fn etfs_are_skipped() {
        let entry = UniverseEntry::new("XLK", Sleeve::Etf);
        let c = Candidate::new(&entry, fast_mover(99.0, 2.0, 20.0).snapshot);
        assert_eq!(run(&c).effect, GateEffect::NotApplicable);
    }
}
