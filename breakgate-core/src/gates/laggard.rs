//! Reviews of held positions that are tying up capital.

use super::{Advisory, Gate, GateContext, GateScope, GateVerdict};

/// Held long enough and still underwater, without having hit the stop.
#[derive(Debug, Clone)]
pub struct LaggardGate {
    pub min_holding_days: i64,
    pub min_loss_pct: f64,
}

impl Default for LaggardGate {
    fn default() -> Self {
        Self {
            min_holding_days: 10,
            min_loss_pct: 2.0,
        }
    }
}

impl Gate for LaggardGate {
    fn name(&self) -> &'static str {
        "laggard"
    }

    fn scope(&self) -> GateScope {
        GateScope::Position
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some((position, market)) = ctx.position() else {
            return GateVerdict::not_applicable(name, "position-only gate");
        };
        if !position.is_open() || position.sleeve.is_hedge() {
            return GateVerdict::not_applicable(name, "closed or hedge position");
        }
        if !market.price.is_finite() || market.price <= 0.0 {
            return GateVerdict::not_evaluated(name, "no current price");
        }
        let held = position.holding_days(ctx.today);
        let loss_pct = (position.entry_price - market.price) / position.entry_price * 100.0;

        if held >= self.min_holding_days
            && loss_pct >= self.min_loss_pct
            && market.price > position.current_stop()
        {
            GateVerdict::advisory(
                name,
                Advisory::TrimLaggard,
                format!("TRIM_LAGGARD: held {held}d, down {loss_pct:.1}%"),
            )
        } else {
            GateVerdict::pass(name, format!("held {held}d, P/L {:.1}%", -loss_pct))
        }
    }
}

/// Long-held positions going nowhere, unless they show signs of recovery.
#[derive(Debug, Clone)]
pub struct DeadMoneyGate {
    pub min_holding_days: i64,
    pub r_floor: f64,
    pub r_ceiling: f64,
}

impl Default for DeadMoneyGate {
    fn default() -> Self {
        Self {
            min_holding_days: 30,
            r_floor: -1.0,
            r_ceiling: 0.5,
        }
    }
}

impl Gate for DeadMoneyGate {
    fn name(&self) -> &'static str {
        "dead_money"
    }

    fn scope(&self) -> GateScope {
        GateScope::Position
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some((position, market)) = ctx.position() else {
            return GateVerdict::not_applicable(name, "position-only gate");
        };
        if !position.is_open() || position.sleeve.is_hedge() {
            return GateVerdict::not_applicable(name, "closed or hedge position");
        }
        let held = position.holding_days(ctx.today);
        if held < self.min_holding_days {
            return GateVerdict::pass(name, format!("held {held}d"));
        }
        let Some(r) = position.r_multiple(market.price) else {
            return GateVerdict::not_evaluated(name, "R-multiple unavailable");
        };
        if r <= self.r_floor || r >= self.r_ceiling {
            return GateVerdict::pass(name, format!("R={r:.2} outside dead-money band"));
        }

        // Any missing input means no exemption.
        let recovering = match (market.ma20, market.adx, market.adx_prev) {
            (Some(ma20), Some(adx), Some(prev)) => market.price > ma20 && adx > prev,
            _ => false,
        };
        if recovering {
            return GateVerdict::pass(
                name,
                format!("R={r:.2} after {held}d but recovering (above MA20, ADX rising)"),
            );
        }
        GateVerdict::advisory(
            name,
            Advisory::DeadMoney,
            format!("DEAD_MONEY: held {held}d at R={r:.2}"),
        )
    }
}
