use crate::domain::instrument::{EarningsInfo, Sleeve, UniverseEntry};
use crate::gates::GateVerdict;
use crate::indicators::IndicatorSnapshot;
use crate::scoring::ScoreCard;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final classification of a scan candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateStatus {
    Ready,
    Conditional,
    Watch,
    AutoNo,
    InsufficientData,
    DataUnavailable,
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidateStatus::Ready => "READY",
            CandidateStatus::Conditional => "CONDITIONAL",
            CandidateStatus::Watch => "WATCH",
            CandidateStatus::AutoNo => "AUTO_NO",
            CandidateStatus::InsufficientData => "INSUFFICIENT_DATA",
            CandidateStatus::DataUnavailable => "DATA_UNAVAILABLE",
        };
        f.write_str(s)
    }
}

/// A universe member evaluated during one scan. Rebuilt on every scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub sleeve: Sleeve,
    pub cluster: Option<String>,
    pub super_cluster: Option<String>,
    pub sector: Option<String>,
    pub price: f64,
    pub snapshot: IndicatorSnapshot,
    pub earnings: Option<EarningsInfo>,
    pub scores: Option<ScoreCard>,
    pub status: CandidateStatus,
    pub action_note: String,
    pub entry_trigger: Option<f64>,
    pub stop_price: Option<f64>,
    pub shares: u64,
    pub risk_dollars: f64,
    pub verdicts: Vec<GateVerdict>,
}

impl Candidate {
    /// Fresh candidate with levels taken from the snapshot; scoring and
    /// classification fill in the rest.
    pub fn new(entry: &UniverseEntry, snapshot: IndicatorSnapshot) -> Self {
        let price = snapshot.price.unwrap_or(f64::NAN);
        Self {
            ticker: entry.ticker.clone(),
            sleeve: entry.sleeve,
            cluster: entry.cluster.clone(),
            super_cluster: entry.super_cluster.clone(),
            sector: entry.sector.clone(),
            price,
            entry_trigger: snapshot.entry_trigger(),
            stop_price: snapshot.initial_stop(),
            snapshot,
            earnings: None,
            scores: None,
            status: CandidateStatus::Watch,
            action_note: String::new(),
            shares: 0,
            risk_dollars: 0.0,
            verdicts: Vec::new(),
        }
    }

    /// Placeholder for a ticker whose data could not be fetched.
    pub fn unavailable(entry: &UniverseEntry, reason: impl Into<String>) -> Self {
        let mut c = Self::new(entry, IndicatorSnapshot::default());
        c.status = CandidateStatus::DataUnavailable;
        c.action_note = reason.into();
        c
    }

    pub fn with_earnings(mut self, earnings: Option<EarningsInfo>) -> Self {
        self.earnings = earnings;
        self
    }

    pub fn is_actionable(&self) -> bool {
        matches!(
            self.status,
            CandidateStatus::Ready | CandidateStatus::Conditional
        )
    }
}
