//! Risk budget ledger. Always recomputed from the live position set.

use super::RiskProfile;
use crate::domain::{Position, Sleeve};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cap overrides produced by portfolio-level gates (breadth, momentum).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapOverrides {
    pub max_positions: Option<u32>,
    pub max_open_risk_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub used_pct: f64,
    pub cap_pct: f64,
    /// used / cap
    pub utilization: f64,
}

impl Utilization {
    fn new(used_pct: f64, cap_pct: f64) -> Self {
        let utilization = if cap_pct > 0.0 {
            used_pct / cap_pct
        } else if used_pct > 0.0 {
            1.0
        } else {
            0.0
        };
        Self {
            used_pct,
            cap_pct,
            utilization,
        }
    }

    /// Utilization after adding `extra_pct` of risk.
    pub fn with_additional(&self, extra_pct: f64) -> f64 {
        Self::new(self.used_pct + extra_pct, self.cap_pct).utilization
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskBudget {
    pub equity: f64,
    pub used_risk_pct: f64,
    pub max_risk_pct: f64,
    pub remaining_risk_pct: f64,
    pub used_positions: u32,
    pub max_positions: u32,
    pub sleeve_utilization: BTreeMap<Sleeve, Utilization>,
    pub cluster_utilization: BTreeMap<String, Utilization>,
    pub super_cluster_utilization: BTreeMap<String, Utilization>,
}

impl RiskBudget {
    pub fn compute(
        equity: f64,
        profile: &RiskProfile,
        positions: &[Position],
        overrides: &CapOverrides,
    ) -> Self {
        let to_pct = |dollars: f64| {
            if equity > 0.0 {
                dollars / equity * 100.0
            } else {
                0.0
            }
        };

        let mut used_dollars = 0.0;
        let mut used_positions = 0u32;
        let mut by_sleeve: BTreeMap<Sleeve, f64> = BTreeMap::new();
        let mut by_cluster: BTreeMap<String, f64> = BTreeMap::new();
        let mut by_super: BTreeMap<String, f64> = BTreeMap::new();

        for p in positions.iter().filter(|p| p.is_open()) {
            let risk = p.open_risk_dollars();
            used_dollars += risk;
            if !p.sleeve.is_hedge() {
                used_positions += 1;
            }
            *by_sleeve.entry(p.sleeve).or_default() += risk;
            if let Some(c) = &p.cluster {
                *by_cluster.entry(c.clone()).or_default() += risk;
            }
            if let Some(s) = &p.super_cluster {
                *by_super.entry(s.clone()).or_default() += risk;
            }
        }

        let max_risk_pct = overrides
            .max_open_risk_pct
            .unwrap_or(profile.max_open_risk_pct);
        let max_positions = overrides.max_positions.unwrap_or(profile.max_positions);
        let used_risk_pct = to_pct(used_dollars);

        let sleeve_utilization = Sleeve::ALL
            .iter()
            .filter_map(|s| {
                let cap = profile.sleeve_caps.get(*s)? * max_risk_pct;
                let used = to_pct(by_sleeve.get(s).copied().unwrap_or(0.0));
                Some((*s, Utilization::new(used, cap)))
            })
            .collect();
        let cluster_utilization = by_cluster
            .into_iter()
            .map(|(k, d)| (k, Utilization::new(to_pct(d), profile.cluster_cap_pct)))
            .collect();
        let super_cluster_utilization = by_super
            .into_iter()
            .map(|(k, d)| (k, Utilization::new(to_pct(d), profile.super_cluster_cap_pct)))
            .collect();

        Self {
            equity,
            used_risk_pct,
            max_risk_pct,
            remaining_risk_pct: (max_risk_pct - used_risk_pct).max(0.0),
            used_positions,
            max_positions,
            sleeve_utilization,
            cluster_utilization,
            super_cluster_utilization,
        }
    }

    pub fn positions_full(&self) -> bool {
        self.used_positions >= self.max_positions
    }

    /// Utilization of a cluster, zero-used when nothing is held in it.
    pub fn cluster(&self, name: &str, cap_pct: f64) -> Utilization {
        self.cluster_utilization
            .get(name)
            .copied()
            .unwrap_or_else(|| Utilization::new(0.0, cap_pct))
    }

    pub fn super_cluster(&self, name: &str, cap_pct: f64) -> Utilization {
        self.super_cluster_utilization
            .get(name)
            .copied()
            .unwrap_or_else(|| Utilization::new(0.0, cap_pct))
    }

    /// Capacity warnings for adding `new_risk_pct` of risk in `sleeve`.
    /// Hedges never count against position or sleeve limits.
    pub fn capacity_warnings(&self, sleeve: Sleeve, new_risk_pct: f64) -> Vec<String> {
        let mut warnings = Vec::new();
        if !sleeve.is_hedge() && self.positions_full() {
            warnings.push(format!(
                "max positions reached ({}/{})",
                self.used_positions, self.max_positions
            ));
        }
        if self.used_risk_pct + new_risk_pct > self.max_risk_pct {
            warnings.push(format!(
                "open risk budget exceeded ({:.2}% + {:.2}% > {:.2}%)",
                self.used_risk_pct, new_risk_pct, self.max_risk_pct
            ));
        }
        if let Some(u) = self.sleeve_utilization.get(&sleeve) {
            if u.with_additional(new_risk_pct) > 1.0 {
                warnings.push(format!(
                    "{sleeve} sleeve cap exceeded ({:.2}% + {:.2}% > {:.2}%)",
                    u.used_pct, new_risk_pct, u.cap_pct
                ));
            }
        }
        warnings
    }
}
