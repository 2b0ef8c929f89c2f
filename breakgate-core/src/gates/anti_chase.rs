use super::{Gate, GateContext, GateVerdict};

/// Refuses entries that are already too far past the trigger on the
/// execution day.
#[derive(Debug, Clone)]
pub struct AntiChaseGate {
    pub max_atr_extension: f64,
    pub max_pct_extension: f64,
}

impl Default for AntiChaseGate {
    fn default() -> Self {
        Self {
            max_atr_extension: 0.75,
            max_pct_extension: 3.0,
        }
    }
}

impl Gate for AntiChaseGate {
    fn name(&self) -> &'static str {
        "anti_chase"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(candidate) = ctx.candidate() else {
            return GateVerdict::not_applicable(name, "candidate-only gate");
        };
        if !ctx.market.is_execution_day {
            return GateVerdict::not_applicable(name, "not the execution day");
        }
        let (Some(trigger), Some(atr)) = (candidate.entry_trigger, candidate.snapshot.atr14) else {
            return GateVerdict::not_evaluated(name, "trigger or ATR unavailable");
        };
        let price = candidate.price;
        if !price.is_finite() {
            return GateVerdict::not_evaluated(name, "no current price");
        }
        if price < trigger {
            return GateVerdict::pass(name, format!("{price:.2} below trigger {trigger:.2}"));
        }

        let extension = price - trigger;
        let ext_atr = if atr > 0.0 { extension / atr } else { f64::INFINITY };
        let ext_pct = extension / trigger * 100.0;
        if ext_atr > self.max_atr_extension || ext_pct > self.max_pct_extension {
            GateVerdict::block(
                name,
                format!("CHASE: {ext_atr:.2} ATR / {ext_pct:.1}% above trigger {trigger:.2}"),
            )
        } else {
            GateVerdict::pass(
                name,
                format!("{ext_atr:.2} ATR above trigger, within limits"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::*;
    use crate::gates::{GateEffect, GateSubject};

    fn at(price: f64, execution_day: bool) -> GateVerdict {
        let mut f = Fixture::new(day(2024, 6, 3));
        f.market.is_execution_day = execution_day;
        let mut c = candidate("META", "MEGA");
        c.entry_trigger = Some(100.0);
        c.price = price;
        AntiChaseGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)))
    }

    #[test]
    fn only_runs_on_execution_day() {
        assert_eq!(at(110.0, false).effect, GateEffect::NotApplicable);
    }

    #[test]
    fn extension_limits() {
        // ATR is 2.0, so 0.75 ATR = 1.5
        assert_eq!(at(99.0, true).effect, GateEffect::Pass);
        assert_eq!(at(101.4, true).effect, GateEffect::Pass);
        assert!(at(101.6, true).is_block());
    }

    #[test]
    fn percent_limit_applies_with_wide_atr() {
        let mut f = Fixture::new(day(2024, 6, 3));
        f.market.is_execution_day = true;
        let mut c = candidate("META", "MEGA");
        c.entry_trigger = Some(100.0);
        c.snapshot.atr14 = Some(10.0);
        c.price = 103.5;
        let v = AntiChaseGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert!(v.is_block());
    }
}
