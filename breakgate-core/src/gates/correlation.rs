//! Correlation gate and the time-stamped correlation table it reads.

use super::{Advisory, Gate, GateContext, GateVerdict};
use crate::indicators::PairCorrelation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pairwise return correlations computed offline for one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationTable {
    pub as_of: NaiveDate,
    /// Return window the pairs were computed over.
    pub window: usize,
    pairs: BTreeMap<String, PairCorrelation>,
}

/// Order-independent key, tickers in alphabetical order.
pub fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}|{b}")
    } else {
        format!("{b}|{a}")
    }
}

impl CorrelationTable {
    pub fn new(as_of: NaiveDate, window: usize) -> Self {
        Self {
            as_of,
            window,
            pairs: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, a: &str, b: &str, pc: PairCorrelation) {
        self.pairs.insert(pair_key(a, b), pc);
    }

    pub fn get(&self, a: &str, b: &str) -> Option<PairCorrelation> {
        self.pairs.get(&pair_key(a, b)).copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn is_stale(&self, today: NaiveDate, max_age_days: i64) -> bool {
        (today - self.as_of).num_days() > max_age_days
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PairCorrelation)> {
        self.pairs.iter()
    }
}

#[derive(Debug, Clone)]
pub struct CorrelationGate {
    pub threshold: f64,
    pub min_observations: usize,
    pub size_scalar: f64,
    pub max_age_days: i64,
}

impl Default for CorrelationGate {
    fn default() -> Self {
        Self {
            threshold: 0.75,
            min_observations: 60,
            size_scalar: 0.5,
            max_age_days: 7,
        }
    }
}

impl Gate for CorrelationGate {
    fn name(&self) -> &'static str {
        "correlation"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(candidate) = ctx.candidate() else {
            return GateVerdict::not_applicable(name, "candidate-only gate");
        };
        let holdings: Vec<&str> = ctx
            .open_positions
            .iter()
            .filter(|p| p.is_open() && p.ticker != candidate.ticker)
            .map(|p| p.ticker.as_str())
            .collect();
        if holdings.is_empty() {
            return GateVerdict::not_applicable(name, "no open positions");
        }
        let Some(table) = ctx.correlations else {
            return GateVerdict::not_evaluated(name, "no correlation table");
        };
        if table.is_stale(ctx.today, self.max_age_days) {
            return GateVerdict::not_evaluated(
                name,
                format!("correlation table from {} is stale", table.as_of),
            );
        }

        let mut evaluated = 0;
        let mut flagged: Vec<(String, f64)> = Vec::new();
        for held in holdings {
            let Some(pc) = table.get(&candidate.ticker, held) else {
                continue;
            };
            if pc.observations < self.min_observations {
                continue;
            }
            evaluated += 1;
            if pc.r > self.threshold {
                let (a, b) = if candidate.ticker.as_str() <= held {
                    (candidate.ticker.as_str(), held)
                } else {
                    (held, candidate.ticker.as_str())
                };
                flagged.push((format!("{a}/{b}"), pc.r));
            }
        }

        if evaluated == 0 {
            return GateVerdict::not_evaluated(
                name,
                format!("fewer than {} overlapping observations", self.min_observations),
            );
        }
        if flagged.is_empty() {
            return GateVerdict::pass(name, format!("{evaluated} pairs below r={}", self.threshold));
        }
        flagged.sort_by(|a, b| a.0.cmp(&b.0));
        let detail: Vec<String> = flagged
            .iter()
            .map(|(pair, r)| format!("{pair} r={r:.2}"))
            .collect();
        GateVerdict::advisory(
            name,
            Advisory::SizeScalar(self.size_scalar),
            format!("HIGH_CORR: {}", detail.join(", ")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::*;
    use crate::gates::{GateEffect, GateSubject};

    fn fixture(r: f64, observations: usize) -> Fixture {
        let today = day(2024, 6, 3);
        let mut f = Fixture::new(today);
        f.open.push(open_position("AMD", "SEMIS", day(2024, 5, 1)));
        let mut table = CorrelationTable::new(today, 90);
        table.insert("NVDA", "AMD", PairCorrelation { r, observations });
        f.correlations = Some(table);
        f
    }

    #[test]
    fn high_correlation_flags_alphabetically() {
        let f = fixture(0.82, 60);
        let c = candidate("NVDA", "SEMIS");
        let v = CorrelationGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert_eq!(v.effect, GateEffect::Advisory(Advisory::SizeScalar(0.5)));
        assert!(v.reason.contains("AMD/NVDA"));
        assert!(v.passed);
    }

    #[test]
    fn thin_overlap_never_flags() {
        let f = fixture(0.95, 59);
        let c = candidate("NVDA", "SEMIS");
        let v = CorrelationGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert_eq!(v.effect, GateEffect::NotEvaluated);
    }

    #[test]
    fn low_correlation_passes() {
        let f = fixture(0.40, 80);
        let c = candidate("NVDA", "SEMIS");
        let v = CorrelationGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert_eq!(v.effect, GateEffect::Pass);
    }

    #[test]
    fn stale_table_gives_no_verdict() {
        let mut f = fixture(0.95, 80);
        f.today = day(2024, 6, 30);
        let c = candidate("NVDA", "SEMIS");
        let v = CorrelationGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert_eq!(v.effect, GateEffect::NotEvaluated);
    }

    #[test]
    fn key_is_order_independent() {
        assert_eq!(pair_key("MSFT", "AAPL"), "AAPL|MSFT");
        assert_eq!(pair_key("AAPL", "MSFT"), "AAPL|MSFT");
    }
}
