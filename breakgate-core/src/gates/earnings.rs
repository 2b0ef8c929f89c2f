use super::{Advisory, Gate, GateContext, GateVerdict};
use crate::domain::EarningsConfidence;

/// Keeps new entries away from imminent earnings reports.
#[derive(Debug, Clone)]
pub struct EarningsGate {
    pub block_days: i64,
    pub watch_days: i64,
}

impl Default for EarningsGate {
    fn default() -> Self {
        Self {
            block_days: 2,
            watch_days: 5,
        }
    }
}

impl Gate for EarningsGate {
    fn name(&self) -> &'static str {
        "earnings"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(candidate) = ctx.candidate() else {
            return GateVerdict::not_applicable(name, "candidate-only gate");
        };
        // Unknown earnings dates carry no penalty but are not a pass either.
        let Some(info) = candidate.earnings else {
            return GateVerdict::not_evaluated(name, "no earnings data");
        };
        let Some(days) = info.days_until else {
            return GateVerdict::not_evaluated(name, "earnings date unknown");
        };
        if info.confidence == EarningsConfidence::None {
            return GateVerdict::not_evaluated(name, "earnings date unconfirmed");
        }
        if days < 0 {
            return GateVerdict::pass(name, format!("earnings reported {}d ago", -days));
        }

        if days <= self.block_days {
            if info.confidence.is_confirmed() {
                GateVerdict::block(name, format!("AUTO_NO: earnings in {days}d"))
            } else {
                GateVerdict::advisory(
                    name,
                    Advisory::DemoteWatch,
                    format!("WARNING: earnings possibly in {days}d (low confidence date)"),
                )
            }
        } else if days <= self.watch_days {
            GateVerdict::advisory(
                name,
                Advisory::DemoteWatch,
                format!("earnings in {days}d, watch until after report"),
            )
        } else {
            GateVerdict::pass(name, format!("earnings in {days}d"))
        }
    }
}
