use super::breadth::BreadthReading;
use super::correlation::CorrelationTable;
use crate::domain::{Candidate, Position};
use crate::indicators::IndicatorSnapshot;
use crate::risk::RiskProfile;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Today's market inputs for a held position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionMarket {
    pub price: f64,
    pub atr14: Option<f64>,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
    pub ma200: Option<f64>,
    pub adx: Option<f64>,
    pub adx_prev: Option<f64>,
    pub volume_ratio: Option<f64>,
}

impl PositionMarket {
    pub fn from_snapshot(price: f64, snapshot: &IndicatorSnapshot) -> Self {
        Self {
            price,
            atr14: snapshot.atr14,
            ma20: snapshot.ma20,
            ma50: snapshot.ma50,
            ma200: snapshot.ma200,
            adx: snapshot.adx,
            adx_prev: snapshot.adx_prev,
            volume_ratio: snapshot.volume_ratio,
        }
    }

    /// Fractional distance of price above the 20-day MA.
    pub fn ma20_extension(&self) -> Option<f64> {
        self.ma20
            .filter(|ma| ma.is_finite() && *ma > 0.0)
            .map(|ma| (self.price - ma) / ma)
    }
}

/// Scan-wide market inputs for portfolio-level gates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketGateInputs {
    pub benchmark_adx: Option<f64>,
    pub breadth: Option<BreadthReading>,
    /// Orders are only placed on the execution day.
    pub is_execution_day: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum GateSubject<'a> {
    Candidate(&'a Candidate),
    Position {
        position: &'a Position,
        market: &'a PositionMarket,
    },
    Portfolio,
}

/// Read-only view shared by every gate in one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub today: NaiveDate,
    pub subject: GateSubject<'a>,
    pub open_positions: &'a [Position],
    pub closed_positions: &'a [Position],
    pub profile: &'a RiskProfile,
    pub correlations: Option<&'a CorrelationTable>,
    /// Trailing 63-day return by ticker.
    pub momentum: &'a BTreeMap<String, f64>,
    pub market: &'a MarketGateInputs,
}

impl<'a> GateContext<'a> {
    pub fn candidate(&self) -> Option<&'a Candidate> {
        match self.subject {
            GateSubject::Candidate(c) => Some(c),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<(&'a Position, &'a PositionMarket)> {
        match self.subject {
            GateSubject::Position { position, market } => Some((position, market)),
            _ => None,
        }
    }

    /// Most recently closed position for `ticker`.
    pub fn last_exit(&self, ticker: &str) -> Option<&'a Position> {
        self.closed_positions
            .iter()
            .filter(|p| p.ticker == ticker && p.exit().is_some())
            .max_by_key(|p| p.exit().map(|e| e.date))
    }
}
