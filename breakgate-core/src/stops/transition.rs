//! Applying stop changes to a position.

use super::ProtectionLevel;
use crate::domain::{Position, PositionId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopTransition {
    /// Normal ratchet: stop and level must both move forward.
    Trail {
        new_stop: f64,
        level: ProtectionLevel,
    },
    /// Operator override; may lower the stop. Requires a reason.
    AdminReset { new_stop: f64, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopEvent {
    Raised {
        id: PositionId,
        from: f64,
        to: f64,
        level_from: ProtectionLevel,
        level_to: ProtectionLevel,
    },
    AdminReset {
        id: PositionId,
        from: f64,
        to: f64,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StopRejection {
    #[error("position {0} is closed")]
    PositionClosed(PositionId),

    #[error("stop must increase: proposed {proposed} <= current {current}")]
    NonMonotonic { current: f64, proposed: f64 },

    #[error("protection level cannot regress from {current} to {proposed}")]
    LevelRegression {
        current: ProtectionLevel,
        proposed: ProtectionLevel,
    },

    #[error("administrative reset requires a non-empty reason")]
    MissingAuditReason,

    #[error("invalid stop price {0}")]
    InvalidStop(f64),
}

/// Apply `transition` to `position`. On rejection the position is unchanged.
pub fn apply_transition(
    position: &mut Position,
    transition: StopTransition,
) -> Result<StopEvent, StopRejection> {
    if !position.is_open() {
        return Err(StopRejection::PositionClosed(position.id.clone()));
    }
    let from = position.current_stop;

    match transition {
        StopTransition::Trail { new_stop, level } => {
            if !new_stop.is_finite() || new_stop <= 0.0 {
                return Err(StopRejection::InvalidStop(new_stop));
            }
            if new_stop <= from {
                return Err(StopRejection::NonMonotonic {
                    current: from,
                    proposed: new_stop,
                });
            }
            if level < position.protection_level {
                return Err(StopRejection::LevelRegression {
                    current: position.protection_level,
                    proposed: level,
                });
            }
            let level_from = position.protection_level;
            position.current_stop = new_stop;
            position.protection_level = level;
            Ok(StopEvent::Raised {
                id: position.id.clone(),
                from,
                to: new_stop,
                level_from,
                level_to: level,
            })
        }
        StopTransition::AdminReset { new_stop, reason } => {
            if reason.trim().is_empty() {
                return Err(StopRejection::MissingAuditReason);
            }
            if !new_stop.is_finite() || new_stop < 0.0 {
                return Err(StopRejection::InvalidStop(new_stop));
            }
            position.current_stop = new_stop;
            tracing::warn!(
                target: "breakgate::audit",
                position = %position.id,
                ticker = %position.ticker,
                from,
                to = new_stop,
                reason = %reason,
                "administrative stop reset"
            );
            Ok(StopEvent::AdminReset {
                id: position.id.clone(),
                from,
                to: new_stop,
                reason,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, PositionExit, Sleeve};
    use chrono::NaiveDate;

    fn position() -> Position {
        Position::open(
            PositionId::new("p"),
            "MSFT",
            Sleeve::Core,
            100.0,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            10,
            90.0,
        )
        .unwrap()
    }

    #[test]
    fn trail_raises_stop_and_level() {
        let mut p = position();
        let ev = apply_transition(
            &mut p,
            StopTransition::Trail {
                new_stop: 100.0,
                level: ProtectionLevel::Breakeven,
            },
        )
        .unwrap();
        assert!(matches!(ev, StopEvent::Raised { from, to, .. } if from == 90.0 && to == 100.0));
        assert_eq!(p.current_stop(), 100.0);
        assert_eq!(p.protection_level(), ProtectionLevel::Breakeven);
    }

    #[test]
    fn equal_stop_is_rejected() {
        let mut p = position();
        let err = apply_transition(
            &mut p,
            StopTransition::Trail {
                new_stop: 90.0,
                level: ProtectionLevel::Initial,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StopRejection::NonMonotonic { .. }));
        assert_eq!(p.current_stop(), 90.0);
    }

    #[test]
    fn level_regression_is_rejected() {
        let mut p = position()
            .with_persisted_stop(108.0, ProtectionLevel::Lock08R)
            .unwrap();
        let err = apply_transition(
            &mut p,
            StopTransition::Trail {
                new_stop: 109.0,
                level: ProtectionLevel::Breakeven,
            },
        )
        .unwrap_err();
        assert!(matches!(err, StopRejection::LevelRegression { .. }));
        assert_eq!(p.current_stop(), 108.0);
    }

    #[test]
    fn admin_reset_can_lower_with_reason() {
        let mut p = position()
            .with_persisted_stop(100.0, ProtectionLevel::Breakeven)
            .unwrap();
        let ev = apply_transition(
            &mut p,
            StopTransition::AdminReset {
                new_stop: 95.0,
                reason: "broker stop misfire".into(),
            },
        )
        .unwrap();
        assert!(matches!(ev, StopEvent::AdminReset { .. }));
        assert_eq!(p.current_stop(), 95.0);
        assert_eq!(p.protection_level(), ProtectionLevel::Breakeven);
    }

    #[test]
    fn admin_reset_requires_reason() {
        let mut p = position();
        let err = apply_transition(
            &mut p,
            StopTransition::AdminReset {
                new_stop: 85.0,
                reason: "  ".into(),
            },
        )
        .unwrap_err();
        assert_eq!(err, StopRejection::MissingAuditReason);
    }

    #[test]
    fn closed_rejects_everything() {
        let mut p = position();
        p.close(PositionExit {
            price: 90.0,
            date: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            reason: ExitReason::StopHit,
        })
        .unwrap();
        let err = apply_transition(
            &mut p,
            StopTransition::AdminReset {
                new_stop: 80.0,
                reason: "fix".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, StopRejection::PositionClosed(_)));
    }
}
