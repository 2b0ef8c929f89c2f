//! Net Conviction Score: quality net of fragility and portfolio penalties.

use serde::{Deserialize, Serialize};

/// Portfolio and calendar inputs that reduce the net score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NcsInputs {
    pub earnings_days: Option<i64>,
    /// Cluster risk used / cluster cap, as a fraction.
    pub cluster_utilization: Option<f64>,
    pub super_cluster_utilization: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NcsBreakdown {
    pub base: f64,
    pub earnings_penalty: f64,
    pub cluster_penalty: f64,
    pub super_cluster_penalty: f64,
    pub total: f64,
}

fn earnings_penalty(days: Option<i64>) -> f64 {
    match days {
        Some(d) if (0..=2).contains(&d) => 20.0,
        Some(d) if (3..=5).contains(&d) => 10.0,
        _ => 0.0,
    }
}

fn utilization_penalty(util: Option<f64>, warn: f64, full: f64) -> f64 {
    match util {
        Some(u) if u >= 1.0 => full,
        Some(u) if u >= 0.8 => warn,
        _ => 0.0,
    }
}

pub fn net_score(bqs: f64, fws: f64, inputs: &NcsInputs) -> NcsBreakdown {
    let base = (bqs - 0.5 * fws + 10.0).clamp(0.0, 100.0);
    let earnings = earnings_penalty(inputs.earnings_days);
    let cluster = utilization_penalty(inputs.cluster_utilization, 5.0, 10.0);
    let super_cluster = utilization_penalty(inputs.super_cluster_utilization, 10.0, 15.0);
    NcsBreakdown {
        base,
        earnings_penalty: earnings,
        cluster_penalty: cluster,
        super_cluster_penalty: super_cluster,
        total: (base - earnings - cluster - super_cluster).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_formula() {
        let n = net_score(80.0, 20.0, &NcsInputs::default());
        assert_eq!(n.base, 80.0);
        assert_eq!(n.total, 80.0);
        assert_eq!(net_score(100.0, 0.0, &NcsInputs::default()).base, 100.0);
    }

    #[test]
    fn deductions_floor_at_zero() {
        let inputs = NcsInputs {
            earnings_days: Some(1),
            cluster_utilization: Some(1.2),
            super_cluster_utilization: Some(1.0),
        };
        let n = net_score(20.0, 10.0, &inputs);
        assert_eq!(n.earnings_penalty, 20.0);
        assert_eq!(n.cluster_penalty, 10.0);
        assert_eq!(n.super_cluster_penalty, 15.0);
        assert_eq!(n.total, 0.0);
    }

    #[test]
    fn warning_tiers() {
        let inputs = NcsInputs {
            earnings_days: Some(4),
            cluster_utilization: Some(0.85),
            super_cluster_utilization: Some(0.8),
        };
        let n = net_score(70.0, 0.0, &inputs);
        assert_eq!(n.total, 80.0 - 10.0 - 5.0 - 10.0);
    }

    #[test]
    fn past_or_distant_earnings_ignored() {
        assert_eq!(earnings_penalty(Some(-1)), 0.0);
        assert_eq!(earnings_penalty(Some(6)), 0.0);
        assert_eq!(earnings_penalty(None), 0.0);
    }
}
