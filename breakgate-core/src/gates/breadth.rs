//! Market breadth safety valve.

use super::{CapOverride, Gate, GateContext, GateScope, GateVerdict};
use crate::domain::UniverseEntry;
use crate::rng::RngHierarchy;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreadthReading {
    pub sampled: usize,
    pub above_ma50: usize,
}

impl BreadthReading {
    /// Build from per-ticker "above MA50" flags; unknowns are skipped.
    pub fn from_flags(flags: impl IntoIterator<Item = Option<bool>>) -> Option<Self> {
        let mut sampled = 0;
        let mut above_ma50 = 0;
        for flag in flags.into_iter().flatten() {
            sampled += 1;
            if flag {
                above_ma50 += 1;
            }
        }
        (sampled > 0).then_some(Self {
            sampled,
            above_ma50,
        })
    }

    pub fn pct_above(&self) -> f64 {
        if self.sampled == 0 {
            return 0.0;
        }
        self.above_ma50 as f64 / self.sampled as f64 * 100.0
    }
}

/// Deterministic sample of up to `size` non-hedge tickers, stable for a
/// given `seed` and universe.
pub fn sample_breadth_universe(
    universe: &[UniverseEntry],
    size: usize,
    seed: &RngHierarchy,
) -> Vec<String> {
    let mut tickers: Vec<String> = universe
        .iter()
        .filter(|e| !e.sleeve.is_hedge())
        .map(|e| e.ticker.clone())
        .collect();
    tickers.sort();
    tickers.dedup();
    if tickers.len() <= size {
        return tickers;
    }
    let mut rng = seed.breadth_rng();
    let mut sample: Vec<String> = tickers.choose_multiple(&mut rng, size).cloned().collect();
    sample.sort();
    sample
}

#[derive(Debug, Clone)]
pub struct BreadthGate {
    pub threshold_pct: f64,
    pub reduced_max_positions: u32,
}

impl Default for BreadthGate {
    fn default() -> Self {
        Self {
            threshold_pct: 40.0,
            reduced_max_positions: 4,
        }
    }
}

impl Gate for BreadthGate {
    fn name(&self) -> &'static str {
        "breadth"
    }

    fn scope(&self) -> GateScope {
        GateScope::Portfolio
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(reading) = ctx.market.breadth else {
            return GateVerdict::not_evaluated(name, "no breadth sample");
        };
        let pct = reading.pct_above();
        if pct < self.threshold_pct {
            let cap = ctx.profile.max_positions.min(self.reduced_max_positions);
            GateVerdict::cap_override(
                name,
                CapOverride::MaxPositions(cap),
                format!(
                    "weak breadth {pct:.0}% above MA50 ({}/{}), max positions {cap}",
                    reading.above_ma50, reading.sampled
                ),
            )
        } else {
            GateVerdict::pass(name, format!("breadth {pct:.0}% above MA50"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sleeve;
    use crate::gates::test_support::*;
    use crate::gates::{GateEffect, GateSubject};

    #[test]
    fn weak_breadth_caps_positions() {
        let mut f = Fixture::new(day(2024, 6, 3));
        f.market.breadth = BreadthReading::from_flags([Some(true), Some(false), Some(false), None]);
        let v = BreadthGate::default().evaluate(&f.ctx(GateSubject::Portfolio));
        assert_eq!(v.effect, GateEffect::CapOverride(CapOverride::MaxPositions(4)));
    }

    #[test]
    fn healthy_breadth_passes() {
        let mut f = Fixture::new(day(2024, 6, 3));
        f.market.breadth = Some(BreadthReading {
            sampled: 10,
            above_ma50: 4,
        });
        let v = BreadthGate::default().evaluate(&f.ctx(GateSubject::Portfolio));
        assert_eq!(v.effect, GateEffect::Pass);
    }

    #[test]
    fn missing_breadth_not_evaluated() {
        let f = Fixture::new(day(2024, 6, 3));
        let v = BreadthGate::default().evaluate(&f.ctx(GateSubject::Portfolio));
        assert_eq!(v.effect, GateEffect::NotEvaluated);
    }

    #[test]
    fn sample_is_deterministic_and_skips_hedges() {
        let mut universe: Vec<UniverseEntry> = (0..50)
            .map(|i| UniverseEntry::new(format!("T{i:02}"), Sleeve::Core))
            .collect();
        universe.push(UniverseEntry::new("HEDGE1", Sleeve::Hedge));
        let seed = RngHierarchy::new(7);
        let a = sample_breadth_universe(&universe, 30, &seed);
        let b = sample_breadth_universe(&universe, 30, &seed);
        assert_eq!(a.len(), 30);
        assert_eq!(a, b);
        assert!(!a.contains(&"HEDGE1".to_string()));
    }
}
