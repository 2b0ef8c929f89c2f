use crate::domain::ids::PositionId;
use crate::domain::instrument::Sleeve;
use crate::stops::ProtectionLevel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopHit,
    ProfitTarget,
    Discretionary,
    Rotation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionExit {
    pub price: f64,
    pub date: NaiveDate,
    pub reason: ExitReason,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("position {0} is already closed")]
    AlreadyClosed(PositionId),

    #[error("initial stop {stop} must be below entry {entry}")]
    StopAboveEntry { entry: f64, stop: f64 },

    #[error("invalid {field}: {value}")]
    InvalidField { field: &'static str, value: f64 },
}

/// A long position held in the portfolio.
///
/// `current_stop` and `protection_level` are crate-private: only the stop
/// manager moves them, through `stops::apply_transition`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub ticker: String,
    pub sleeve: Sleeve,
    pub cluster: Option<String>,
    pub super_cluster: Option<String>,
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    pub shares: u64,
    pub initial_stop: f64,
    /// Risk per share at entry (entry - initial stop), i.e. 1R.
    pub initial_risk: f64,
    /// Pyramid units added since entry.
    #[serde(default)]
    pub adds_taken: u32,
    pub(crate) current_stop: f64,
    pub(crate) protection_level: ProtectionLevel,
    pub(crate) status: PositionStatus,
    pub(crate) exit: Option<PositionExit>,
}

impl Position {
    pub fn open(
        id: PositionId,
        ticker: impl Into<String>,
        sleeve: Sleeve,
        entry_price: f64,
        entry_date: NaiveDate,
        shares: u64,
        initial_stop: f64,
    ) -> Result<Self, PositionError> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(PositionError::InvalidField {
                field: "entry_price",
                value: entry_price,
            });
        }
        if !initial_stop.is_finite() || initial_stop < 0.0 {
            return Err(PositionError::InvalidField {
                field: "initial_stop",
                value: initial_stop,
            });
        }
        if initial_stop >= entry_price {
            return Err(PositionError::StopAboveEntry {
                entry: entry_price,
                stop: initial_stop,
            });
        }
        Ok(Self {
            id,
            ticker: ticker.into(),
            sleeve,
            cluster: None,
            super_cluster: None,
            entry_price,
            entry_date,
            shares,
            initial_stop,
            initial_risk: entry_price - initial_stop,
            adds_taken: 0,
            current_stop: initial_stop,
            protection_level: ProtectionLevel::Initial,
            status: PositionStatus::Open,
            exit: None,
        })
    }

    pub fn in_cluster(mut self, cluster: &str, super_cluster: &str) -> Self {
        self.cluster = Some(cluster.to_string());
        self.super_cluster = Some(super_cluster.to_string());
        self
    }

    pub fn with_adds_taken(mut self, adds: u32) -> Self {
        self.adds_taken = adds;
        self
    }

    /// Restore stop state loaded from a store. Not a stop transition: the
    /// persisted values are taken as the current truth.
    pub fn with_persisted_stop(
        mut self,
        current_stop: f64,
        level: ProtectionLevel,
    ) -> Result<Self, PositionError> {
        if !current_stop.is_finite() || current_stop < 0.0 {
            return Err(PositionError::InvalidField {
                field: "current_stop",
                value: current_stop,
            });
        }
        self.current_stop = current_stop;
        self.protection_level = level;
        Ok(self)
    }

    pub fn current_stop(&self) -> f64 {
        self.current_stop
    }

    pub fn protection_level(&self) -> ProtectionLevel {
        self.protection_level
    }

    pub fn status(&self) -> PositionStatus {
        self.status
    }

    pub fn exit(&self) -> Option<&PositionExit> {
        self.exit.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// R-multiple at `price`. `None` when the position carries no initial risk.
    pub fn r_multiple(&self, price: f64) -> Option<f64> {
        if self.initial_risk <= 0.0 || !price.is_finite() {
            return None;
        }
        Some((price - self.entry_price) / self.initial_risk)
    }

    /// R-multiple realized at exit, if closed.
    pub fn realized_r(&self) -> Option<f64> {
        self.exit.as_ref().and_then(|e| self.r_multiple(e.price))
    }

    /// Dollars lost if the current stop is hit, never negative.
    pub fn open_risk_dollars(&self) -> f64 {
        if !self.is_open() {
            return 0.0;
        }
        (self.shares as f64 * (self.entry_price - self.current_stop)).max(0.0)
    }

    pub fn holding_days(&self, today: NaiveDate) -> i64 {
        (today - self.entry_date).num_days().max(0)
    }

    /// OPEN -> CLOSED, exactly once.
    pub fn close(&mut self, exit: PositionExit) -> Result<(), PositionError> {
        if self.status == PositionStatus::Closed {
            return Err(PositionError::AlreadyClosed(self.id.clone()));
        }
        self.status = PositionStatus::Closed;
        self.exit = Some(exit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn position() -> Position {
        Position::open(
            PositionId::new("p1"),
            "NVDA",
            Sleeve::Core,
            100.0,
            d(2024, 3, 1),
            50,
            94.0,
        )
        .unwrap()
    }

    #[test]
    fn open_sets_initial_state() {
        let p = position();
        assert_eq!(p.initial_risk, 6.0);
        assert_eq!(p.current_stop(), 94.0);
        assert_eq!(p.protection_level(), ProtectionLevel::Initial);
        assert!(p.is_open());
    }

    #[test]
    fn open_rejects_stop_above_entry() {
        let err = Position::open(
            PositionId::new("p2"),
            "NVDA",
            Sleeve::Core,
            100.0,
            d(2024, 3, 1),
            10,
            101.0,
        )
        .unwrap_err();
        assert!(matches!(err, PositionError::StopAboveEntry { .. }));
    }

    #[test]
    fn r_multiple_and_open_risk() {
        let p = position();
        assert_eq!(p.r_multiple(112.0), Some(2.0));
        assert_eq!(p.open_risk_dollars(), 300.0);
    }

    #[test]
    fn open_risk_clamped_at_zero_above_entry() {
        let p = position()
            .with_persisted_stop(104.0, ProtectionLevel::Lock08R)
            .unwrap();
        assert_eq!(p.open_risk_dollars(), 0.0);
    }

    #[test]
    fn close_exactly_once() {
        let mut p = position();
        let exit = PositionExit {
            price: 94.0,
            date: d(2024, 3, 10),
            reason: ExitReason::StopHit,
        };
        p.close(exit.clone()).unwrap();
        assert_eq!(p.status(), PositionStatus::Closed);
        assert_eq!(p.realized_r(), Some(-1.0));
        assert_eq!(p.open_risk_dollars(), 0.0);
        assert!(matches!(p.close(exit), Err(PositionError::AlreadyClosed(_))));
    }

    #[test]
    fn holding_days_never_negative() {
        let p = position();
        assert_eq!(p.holding_days(d(2024, 3, 11)), 10);
        assert_eq!(p.holding_days(d(2024, 2, 1)), 0);
    }
}
