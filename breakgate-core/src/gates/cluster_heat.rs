use super::{Gate, GateContext, GateVerdict};

/// Margin a candidate must clear beyond the threshold; a value sitting on
/// the threshold up to rounding error is treated as equal to it.
const BOUNDARY_EPS: f64 = 1e-9;

/// Crowded clusters require a new entry to out-run the names already held.
#[derive(Debug, Clone)]
pub struct ClusterHeatGate {
    pub min_positions: usize,
    /// Required premium over the held average, as a fraction of |avg|.
    pub premium: f64,
}

impl Default for ClusterHeatGate {
    fn default() -> Self {
        Self {
            min_positions: 3,
            premium: 0.20,
        }
    }
}

impl Gate for ClusterHeatGate {
    fn name(&self) -> &'static str {
        "cluster_heat"
    }

    fn evaluate(&self, ctx: &GateContext<'_>) -> GateVerdict {
        let name = self.name();
        let Some(candidate) = ctx.candidate() else {
            return GateVerdict::not_applicable(name, "candidate-only gate");
        };
        let Some(cluster) = candidate.cluster.as_deref() else {
            return GateVerdict::not_applicable(name, "candidate has no cluster");
        };
        let held: Vec<&str> = ctx
            .open_positions
            .iter()
            .filter(|p| p.is_open() && p.cluster.as_deref() == Some(cluster))
            .map(|p| p.ticker.as_str())
            .collect();
        if held.len() < self.min_positions {
            return GateVerdict::not_applicable(
                name,
                format!("{} open in {cluster} (< {})", held.len(), self.min_positions),
            );
        }

        let Some(mine) = ctx.momentum.get(&candidate.ticker).copied() else {
            return GateVerdict::not_evaluated(name, "candidate momentum unavailable");
        };
        let theirs: Vec<f64> = held
            .iter()
            .filter_map(|t| ctx.momentum.get(*t).copied())
            .collect();
        if theirs.is_empty() {
            return GateVerdict::not_evaluated(name, "held momentum unavailable");
        }
        let avg = theirs.iter().sum::<f64>() / theirs.len() as f64;
        let threshold = avg + self.premium * avg.abs();

        if mine - threshold > BOUNDARY_EPS * threshold.abs().max(1.0) {
            GateVerdict::pass(
                name,
                format!("momentum {mine:.3} beats {threshold:.3} in crowded {cluster}"),
            )
        } else {
            GateVerdict::block(
                name,
                format!(
                    "HEAT_CHECK: {} held in {cluster}, momentum {mine:.3} <= {threshold:.3}",
                    held.len()
                ),
            )
        }
    }
}
