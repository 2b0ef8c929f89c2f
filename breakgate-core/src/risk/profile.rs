use crate::domain::Sleeve;
use crate::stops::StopLadder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-sleeve share of the max open risk budget. Hedges are uncapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SleeveCaps {
    pub core: f64,
    pub etf: f64,
    pub high_risk: f64,
}

impl SleeveCaps {
    pub fn get(&self, sleeve: Sleeve) -> Option<f64> {
        match sleeve {
            Sleeve::Core => Some(self.core),
            Sleeve::Etf => Some(self.etf),
            Sleeve::HighRisk => Some(self.high_risk),
            Sleeve::Hedge => None,
        }
    }
}

/// Risk limits for a portfolio. Percentages are percent of equity
/// (0.75 = 0.75%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub name: String,
    pub risk_per_trade_pct: f64,
    pub max_open_risk_pct: f64,
    pub max_positions: u32,
    pub sleeve_caps: SleeveCaps,
    pub cluster_cap_pct: f64,
    pub super_cluster_cap_pct: f64,
    #[serde(default)]
    pub stop_ladder: StopLadder,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown risk profile preset '{0}' (expected conservative, balanced or aggressive)")]
pub struct UnknownPreset(pub String);

fn caps(core: f64, etf: f64, high_risk: f64) -> SleeveCaps {
    SleeveCaps {
        core,
        etf,
        high_risk,
    }
}

impl RiskProfile {
    pub fn conservative() -> Self {
        Self {
            name: "conservative".into(),
            risk_per_trade_pct: 0.5,
            max_open_risk_pct: 5.0,
            max_positions: 6,
            sleeve_caps: caps(0.60, 0.50, 0.25),
            cluster_cap_pct: 2.0,
            super_cluster_cap_pct: 3.5,
            stop_ladder: StopLadder::default(),
        }
    }

    pub fn balanced() -> Self {
        Self {
            name: "balanced".into(),
            risk_per_trade_pct: 0.75,
            max_open_risk_pct: 7.0,
            max_positions: 8,
            sleeve_caps: caps(0.70, 0.60, 0.30),
            cluster_cap_pct: 2.5,
            super_cluster_cap_pct: 4.0,
            stop_ladder: StopLadder::default(),
        }
    }

    pub fn aggressive() -> Self {
        Self {
            name: "aggressive".into(),
            risk_per_trade_pct: 1.0,
            max_open_risk_pct: 8.5,
            max_positions: 10,
            sleeve_caps: caps(0.80, 0.80, 0.40),
            cluster_cap_pct: 3.0,
            super_cluster_cap_pct: 5.0,
            stop_ladder: StopLadder::default(),
        }
    }

    pub fn preset(name: &str) -> Result<Self, UnknownPreset> {
        match name.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(Self::conservative()),
            "balanced" | "default" => Ok(Self::balanced()),
            "aggressive" => Ok(Self::aggressive()),
            other => Err(UnknownPreset(other.to_string())),
        }
    }

    /// Sleeve cap as percent of equity. Sleeves without a cap (hedges)
    /// return `None`.
    pub fn sleeve_cap_pct(&self, sleeve: Sleeve) -> Option<f64> {
        self.sleeve_caps
            .get(sleeve)
            .map(|frac| frac * self.max_open_risk_pct)
    }
}

impl Default for RiskProfile {
    fn default() -> Self {
        Self::balanced()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_resolve() {
        assert_eq!(RiskProfile::preset("Balanced").unwrap().max_positions, 8);
        assert_eq!(RiskProfile::preset("aggressive").unwrap().risk_per_trade_pct, 1.0);
        assert!(RiskProfile::preset("yolo").is_err());
    }

    #[test]
    fn sleeve_cap_in_equity_percent() {
        let p = RiskProfile::balanced();
        assert!((p.sleeve_cap_pct(Sleeve::HighRisk).unwrap() - 2.1).abs() < 1e-9);
        assert_eq!(p.sleeve_cap_pct(Sleeve::Hedge), None);
    }

    #[test]
    fn json_round_trip_keeps_caps() {
        let p = RiskProfile::conservative();
        let text = serde_json::to_string(&p).unwrap();
        let back: RiskProfile = serde_json::from_str(&text).unwrap();
        assert_eq!(back, p);
    }
}
