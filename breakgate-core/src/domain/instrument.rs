use serde::{Deserialize, Serialize};
use std::fmt;

/// Portfolio sleeve an instrument is allocated to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sleeve {
    /// Stock core
    Core,
    /// ETF core
    Etf,
    /// Stock high-risk
    HighRisk,
    /// Hedges are excluded from position counts and laggard review.
    Hedge,
}

impl Sleeve {
    pub const ALL: [Sleeve; 4] = [Sleeve::Core, Sleeve::Etf, Sleeve::HighRisk, Sleeve::Hedge];

    pub fn is_hedge(self) -> bool {
        matches!(self, Sleeve::Hedge)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sleeve::Core => "CORE",
            Sleeve::Etf => "ETF",
            Sleeve::HighRisk => "HIGH_RISK",
            Sleeve::Hedge => "HEDGE",
        }
    }
}

impl fmt::Display for Sleeve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Sleeve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "CORE" | "STOCK_CORE" => Ok(Sleeve::Core),
            "ETF" | "ETF_CORE" => Ok(Sleeve::Etf),
            "HIGH_RISK" | "STOCK_HIGH_RISK" => Ok(Sleeve::HighRisk),
            "HEDGE" => Ok(Sleeve::Hedge),
            other => Err(format!("unknown sleeve '{other}'")),
        }
    }
}

/// One row of the tradeable universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseEntry {
    pub ticker: String,
    pub sleeve: Sleeve,
    pub cluster: Option<String>,
    pub super_cluster: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
}

impl UniverseEntry {
    pub fn new(ticker: impl Into<String>, sleeve: Sleeve) -> Self {
        Self {
            ticker: ticker.into(),
            sleeve,
            cluster: None,
            super_cluster: None,
            sector: None,
        }
    }

    pub fn with_cluster(mut self, cluster: &str, super_cluster: &str) -> Self {
        self.cluster = Some(cluster.to_string());
        self.super_cluster = Some(super_cluster.to_string());
        self
    }
}

/// How much the earnings date source trusts its own date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EarningsConfidence {
    High,
    Medium,
    Low,
    None,
}

impl EarningsConfidence {
    /// HIGH and MEDIUM dates are treated as confirmed.
    pub fn is_confirmed(self) -> bool {
        matches!(self, EarningsConfidence::High | EarningsConfidence::Medium)
    }
}

/// Next earnings event relative to the scan date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsInfo {
    /// Calendar days until the report; negative when it is in the past.
    pub days_until: Option<i64>,
    pub confidence: EarningsConfidence,
}

impl EarningsInfo {
    pub fn in_days(days: i64, confidence: EarningsConfidence) -> Self {
        Self {
            days_until: Some(days),
            confidence,
        }
    }

    pub fn unknown() -> Self {
        Self {
            days_until: None,
            confidence: EarningsConfidence::None,
        }
    }
}
