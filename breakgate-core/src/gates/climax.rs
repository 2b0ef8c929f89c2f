//! Blow-off top detection for held positions.

use super::{Advisory, Gate, GateContext, GateScope, GateVerdict};
use serde::{Deserialize, Serialize};

/// What to suggest when a climax top is detected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClimaxAction {
    /// Sell this fraction into strength.
    Trim { fraction: f64 },
    /// Raise the stop to `price - atr_mult * ATR`.
    TightenStop { atr_mult: f64 },
}

/// Price stretched far above its 20-day MA on climactic volume.
#[derive(Debug, Clone)]
pub struct ClimaxGate {
    /// Minimum fractional distance above the 20-day MA.
    pub min_ma20_extension: f64,
    pub min_volume_ratio: f64,
    pub action: ClimaxAction,
}

impl Default for ClimaxGate {
    fn default() -> Self {
        Self {
            min_ma20_extension: 0.18,
            min_volume_ratio: 3.0,
            action: ClimaxAction::Trim { fraction: 0.5 },
        }
    }
}

impl Gate for ClimaxGate {
    fn name(&self) -> &'static str {
        "climax"
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
        let (Some(extension), Some(volume)) = (market.ma20_extension(), market.volume_ratio)
        else {
            return GateVerdict::not_evaluated(name, "20-day MA or volume ratio missing");
        };
        if extension < self.min_ma20_extension || volume < self.min_volume_ratio {
            return GateVerdict::pass(
                name,
                format!("+{:.0}% vs MA20, volume {volume:.1}x", extension * 100.0),
            );
        }

        let head = format!(
            "CLIMAX: +{:.0}% above MA20 on {volume:.1}x volume",
            extension * 100.0
        );
        match self.action {
            ClimaxAction::Trim { fraction } => GateVerdict::advisory(
                name,
                Advisory::TrimClimax(fraction),
                format!("{head}, trim {:.0}%", fraction * 100.0),
            ),
            ClimaxAction::TightenStop { atr_mult } => match market.atr14 {
                Some(atr) if atr.is_finite() && atr > 0.0 => {
                    // Never suggest a level below the stop already in place.
                    let stop = (market.price - atr_mult * atr).max(position.current_stop());
                    GateVerdict::advisory(
                        name,
                        Advisory::TightenStop(stop),
                        format!("{head}, tighten stop to {stop:.2}"),
                    )
                }
                _ => GateVerdict::advisory(
                    name,
                    Advisory::TightenStop(position.current_stop()),
                    format!("{head}, consider tightening the stop"),
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::*;
    use crate::gates::{GateEffect, GateSubject, PositionMarket};

    fn stretched(price: f64, volume: f64) -> PositionMarket {
        PositionMarket {
            price,
            ma20: Some(100.0),
            atr14: Some(4.0),
            volume_ratio: Some(volume),
            ..Default::default()
        }
    }

    fn verdict(gate: &ClimaxGate, market: &PositionMarket) -> GateVerdict {
        let f = Fixture::new(day(2024, 6, 3));
        let p = open_position("SMCI", "SEMIS", day(2024, 3, 1));
        gate.evaluate(&f.ctx(GateSubject::Position {
            position: &p,
            market,
        }))
    }

    #[test]
    fn extension_and_volume_both_required() {
        let gate = ClimaxGate::default();
        let v = verdict(&gate, &stretched(118.0, 3.0));
        assert_eq!(v.effect, GateEffect::Advisory(Advisory::TrimClimax(0.5)));
        assert!(v.reason.contains("trim 50%"));

        assert_eq!(verdict(&gate, &stretched(117.0, 4.0)).effect, GateEffect::Pass);
        assert_eq!(verdict(&gate, &stretched(125.0, 2.9)).effect, GateEffect::Pass);
    }

    #[test]
    fn tighten_stop_never_loosens() {
        let gate = ClimaxGate {
            action: ClimaxAction::TightenStop { atr_mult: 1.5 },
            ..Default::default()
        };
        let v = verdict(&gate, &stretched(120.0, 3.5));
        assert_eq!(v.effect, GateEffect::Advisory(Advisory::TightenStop(114.0)));

        // 1.5 * 40 below price would sit under the 90 stop
        let wide = PositionMarket {
            atr14: Some(40.0),
            ..stretched(120.0, 3.5)
        };
        let v = verdict(&gate, &wide);
        assert_eq!(v.effect, GateEffect::Advisory(Advisory::TightenStop(90.0)));
    }

    #[test]
    fn missing_volume_is_not_evaluated() {
        let market = PositionMarket {
            volume_ratio: None,
            ..stretched(130.0, 5.0)
        };
        let v = verdict(&ClimaxGate::default(), &market);
        assert_eq!(v.effect, GateEffect::NotEvaluated);
    }
}
