use super::{CapOverride, Gate, GateContext, GateScope, GateVerdict};

/// Strong benchmark trends widen the open-risk budget.
#[derive(Debug, Clone)]
pub struct MomentumExpansionGate {
    pub adx_threshold: f64,
    pub base_open_risk_pct: f64,
    pub expanded_open_risk_pct: f64,
}

impl Default for MomentumExpansionGate {
    fn default() -> Self {
        Self {
            adx_threshold: 25.0,
            base_open_risk_pct: 7.0,
            expanded_open_risk_pct: 8.5,
        }
    }
}

impl MomentumExpansionGate {
    pub fn multiplier(&self) -> f64 {
        self.expanded_open_risk_pct / self.base_open_risk_pct
    }
}

impl Gate for MomentumExpansionGate {
    fn name(&self) -> &'static str {
        "momentum_expansion"
    }

    fn scope(&self) -> GateScope {
        GateScope::Portfolio
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(adx) = ctx.market.benchmark_adx.filter(|a| a.is_finite()) else {
            return GateVerdict::not_evaluated(name, "benchmark ADX unavailable");
        };
        if adx > self.adx_threshold {
            let expanded = ctx.profile.max_open_risk_pct * self.multiplier();
            GateVerdict::cap_override(
                name,
                CapOverride::MaxOpenRiskPct(expanded),
                format!("benchmark ADX {adx:.1}, max open risk {expanded:.2}%"),
            )
        } else {
            GateVerdict::pass(name, format!("benchmark ADX {adx:.1}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::*;
    use crate::gates::{GateEffect, GateSubject};

    #[test]
    fn strong_trend_expands_open_risk() {
        let mut f = Fixture::new(day(2024, 6, 3));
        f.market.benchmark_adx = Some(28.0);
        let base = f.profile.max_open_risk_pct;
        let v = MomentumExpansionGate::default().evaluate(&f.ctx(GateSubject::Portfolio));
        match v.effect {
            GateEffect::CapOverride(CapOverride::MaxOpenRiskPct(pct)) => {
                assert!((pct - base * 8.5 / 7.0).abs() < 1e-9);
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut f = Fixture::new(day(2024, 6, 3));
        f.market.benchmark_adx = Some(25.0);
        let v = MomentumExpansionGate::default().evaluate(&f.ctx(GateSubject::Portfolio));
        assert_eq!(v.effect, GateEffect::Pass);

        f.market.benchmark_adx = None;
        let v = MomentumExpansionGate::default().evaluate(&f.ctx(GateSubject::Portfolio));
        assert_eq!(v.effect, GateEffect::NotEvaluated);
    }
}
