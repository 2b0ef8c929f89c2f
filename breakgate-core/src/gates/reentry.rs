//! Re-entry rules after a position on the same ticker was closed.

use super::{Gate, GateContext, GateVerdict};
use crate::domain::ExitReason;

#[derive(Debug, Clone)]
pub struct ReentryGate {
    /// Fast-follower window after a stop-out.
    pub stop_window_days: i64,
    pub reclaim_volume_ratio: f64,
    /// Minimum realized R for the profitable-exit rules.
    pub profit_r: f64,
    pub cooldown_days: i64,
    pub reclaim_window_days: i64,
}

impl Default for ReentryGate {
    fn default() -> Self {
        Self {
            stop_window_days: 10,
            reclaim_volume_ratio: 2.0,
            profit_r: 0.5,
            cooldown_days: 5,
            reclaim_window_days: 30,
        }
    }
}

impl Gate for ReentryGate {
    fn name(&self) -> &'static str {
        "reentry"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(candidate) = ctx.candidate() else {
            return GateVerdict::not_applicable(name, "candidate-only gate");
        };
        let Some(last) = ctx.last_exit(&candidate.ticker) else {
            return GateVerdict::not_applicable(name, "no prior exit");
        };
        let Some(exit) = last.exit() else {
            return GateVerdict::not_applicable(name, "no prior exit");
        };
        let since = (ctx.today - exit.date).num_days();
        if since < 0 {
            return GateVerdict::not_applicable(name, "exit dated after scan");
        }
        let price = candidate.price;
        let high20 = candidate.snapshot.high20;

        if exit.reason == ExitReason::StopHit {
            if since > self.stop_window_days {
                return GateVerdict::not_applicable(name, format!("stopped out {since}d ago"));
            }
            let (Some(high20), Some(vr)) = (high20, candidate.snapshot.volume_ratio) else {
                return GateVerdict::not_evaluated(name, "20-day high or volume ratio unavailable");
            };
            return if price >= high20 && vr >= self.reclaim_volume_ratio {
                GateVerdict::pass(
                    name,
                    format!("FAST_FOLLOWER: reclaimed {high20:.2} on {vr:.1}x volume"),
                )
            } else {
                GateVerdict::block(
                    name,
                    format!(
                        "stopped out {since}d ago, needs close >= {high20:.2} on {:.0}x volume",
                        self.reclaim_volume_ratio
                    ),
                )
            };
        }

        let profitable = last.realized_r().is_some_and(|r| r > self.profit_r);
        if !profitable || since > self.reclaim_window_days {
            return GateVerdict::not_applicable(name, format!("exited {since}d ago"));
        }
        if since < self.cooldown_days {
            return GateVerdict::block(
                name,
                format!("REENTRY_COOLDOWN: profitable exit {since}d ago"),
            );
        }
        let Some(high20) = high20 else {
            return GateVerdict::not_evaluated(name, "20-day high unavailable");
        };
        if price >= high20 {
            GateVerdict::pass(name, format!("re-entry: reclaimed 20-day high {high20:.2}"))
        } else {
            GateVerdict::block(
                name,
                format!("re-entry needs reclaim of 20-day high {high20:.2}"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::*;
    use crate::gates::{GateEffect, GateSubject};

    fn fixture_with(exit_price: f64, reason: ExitReason) -> Fixture {
        let mut f = Fixture::new(day(2024, 6, 10));
        f.closed.push(closed_position(
            "AMZN",
            day(2024, 5, 1),
            day(2024, 6, 3),
            exit_price,
            reason,
        ));
        f
    }

    #[test]
    fn fast_follower_needs_reclaim_on_volume() {
        let f = fixture_with(90.0, ExitReason::StopHit);
        let mut c = candidate("AMZN", "MEGA");
        let v = ReentryGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert!(v.is_block());

        c.snapshot.volume_ratio = Some(2.5);
        let v = ReentryGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert_eq!(v.effect, GateEffect::Pass);
    }

    #[test]
    fn profitable_exit_cooldown_then_reclaim() {
        // 1R = 10, exit at 110 is +1R
        let f = fixture_with(110.0, ExitReason::ProfitTarget);
        let c = candidate("AMZN", "MEGA");
        let mut early = Fixture::new(day(2024, 6, 5));
        early.closed = f.closed.clone();
        let v = ReentryGate::default().evaluate(&early.ctx(GateSubject::Candidate(&c)));
        assert!(v.is_block());

        let v = ReentryGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert_eq!(v.effect, GateEffect::Pass);

        let mut below = c.clone();
        below.price = 98.0;
        let v = ReentryGate::default().evaluate(&f.ctx(GateSubject::Candidate(&below)));
        assert!(v.is_block());
    }

    #[test]
    fn small_winner_or_unknown_ticker_not_applicable() {
        let f = fixture_with(103.0, ExitReason::Discretionary);
        let c = candidate("AMZN", "MEGA");
        let v = ReentryGate::default().evaluate(&f.ctx(GateSubject::Candidate(&c)));
        assert_eq!(v.effect, GateEffect::NotApplicable);

        let other = candidate("MSFT", "MEGA");
        let v = ReentryGate::default().evaluate(&f.ctx(GateSubject::Candidate(&other)));
        assert_eq!(v.effect, GateEffect::NotApplicable);
    }
}
