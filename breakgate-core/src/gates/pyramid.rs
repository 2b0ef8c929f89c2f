use super::{Advisory, Gate, GateContext, GateScope, GateVerdict};

const TREND_ADX: f64 = 20.0;

/// Pyramid adds at fixed ATR multiples above entry, while the name's own
/// trend is intact.
#[derive(Debug, Clone)]
pub struct PyramidAddGate {
    /// ATR multiples above entry, one per add, in order.
    pub add_levels_atr: Vec<f64>,
}

impl Default for PyramidAddGate {
    fn default() -> Self {
        Self {
            add_levels_atr: vec![0.5, 1.0],
        }
    }
}

impl PyramidAddGate {
    pub fn max_adds(&self) -> u32 {
        u32::try_from(self.add_levels_atr.len()).unwrap_or(u32::MAX)
    }
}

impl Gate for PyramidAddGate {
    fn name(&self) -> &'static str {
        "pyramid_add"
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
        let taken = position.adds_taken;
        let Some(multiple) = usize::try_from(taken)
            .ok()
            .and_then(|i| self.add_levels_atr.get(i))
        else {
            return GateVerdict::pass(name, format!("max adds taken ({})", self.max_adds()));
        };
        let Some(atr) = market.atr14.filter(|a| a.is_finite() && *a > 0.0) else {
            return GateVerdict::not_evaluated(name, "no valid ATR");
        };

        // Price above a rising long-term structure with a real trend.
        let trending = match (market.ma50, market.ma200, market.adx) {
            (Some(ma50), Some(ma200), Some(adx)) => {
                market.price > ma200 && ma50 > ma200 && adx >= TREND_ADX
            }
            _ => false,
        };
        if !trending {
            return GateVerdict::pass(name, "trend not confirmed, no add");
        }

        let level = position.entry_price + multiple * atr;
        let n = taken + 1;
        if market.price >= level {
            GateVerdict::advisory(
                name,
                Advisory::AddUnit(n),
                format!("ADD #{n}: close {:.2} >= entry + {multiple}*ATR ({level:.2})", market.price),
            )
        } else {
            GateVerdict::pass(name, format!("next add #{n} at {level:.2}"))
        }
    }
}
