//! Rotation out of held positions into stronger READY candidates.
//!
//! Unlike the other gates this runs after classification: it needs the
//! final READY list, which no single-subject gate can see.

use crate::domain::{Candidate, CandidateStatus, Position, PositionId};
use crate::risk::{RiskBudget, RiskProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapKind {
    /// Cluster is at its risk cap and a same-cluster candidate is stronger.
    ClusterLeader,
    /// Held position is flagged as dead weight and barely in profit.
    Laggard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapSuggestion {
    pub position: PositionId,
    pub ticker: String,
    pub replace_with: String,
    pub kind: SwapKind,
    pub reason: String,
}

/// What the advisor needs to know about one held position.
#[derive(Debug, Clone, Copy)]
pub struct HeldForSwap<'a> {
    pub position: &'a Position,
    /// Trailing 63-day return.
    pub momentum: Option<f64>,
    pub r_multiple: Option<f64>,
    /// A position review flagged it as a laggard or dead money.
    pub lagging: bool,
}

#[derive(Debug, Clone)]
pub struct SwapAdvisor {
    /// Cluster utilization at or above this counts as "at cap".
    pub at_cap_utilization: f64,
    /// Laggards at or above this R are left alone.
    pub laggard_max_r: f64,
}

impl Default for SwapAdvisor {
    fn default() -> Self {
        Self {
            at_cap_utilization: 0.9,
            laggard_max_r: 0.5,
        }
    }
}

impl SwapAdvisor {
    /// At most one suggestion per position; a cluster swap takes precedence.
    pub fn suggest(
        &self,
        held: &HeldForSwap<'_>,
        candidates: &[Candidate],
        budget: &RiskBudget,
        profile: &RiskProfile,
    ) -> Option<SwapSuggestion> {
        let position = held.position;
        if !position.is_open() || position.sleeve.is_hedge() {
            return None;
        }
        let ready: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.status == CandidateStatus::Ready && c.ticker != position.ticker)
            .collect();
        if ready.is_empty() {
            return None;
        }
        self.cluster_swap(held, &ready, budget, profile)
            .or_else(|| self.laggard_swap(held, &ready))
    }

    fn cluster_swap(
        &self,
        held: &HeldForSwap<'_>,
        ready: &[&Candidate],
        budget: &RiskBudget,
        profile: &RiskProfile,
    ) -> Option<SwapSuggestion> {
        let cluster = held.position.cluster.as_deref()?;
        let usage = budget.cluster(cluster, profile.cluster_cap_pct);
        if usage.utilization < self.at_cap_utilization {
            return None;
        }
        let mine = held.momentum?;
        let (leader, theirs) = ready
            .iter()
            .filter(|c| c.cluster.as_deref() == Some(cluster))
            .filter_map(|c| c.snapshot.return_63d.map(|m| (*c, m)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        if theirs <= mine {
            return None;
        }
        Some(self.suggestion(
            held,
            leader,
            SwapKind::ClusterLeader,
            format!(
                "SWAP: {} has stronger momentum ({:+.1}% vs {:+.1}%) in capped cluster {cluster}",
                leader.ticker,
                theirs * 100.0,
                mine * 100.0
            ),
        ))
    }

    fn laggard_swap(&self, held: &HeldForSwap<'_>, ready: &[&Candidate]) -> Option<SwapSuggestion> {
        if !held.lagging {
            return None;
        }
        let r = held.r_multiple?;
        if r >= self.laggard_max_r {
            return None;
        }
        let best = ready
            .iter()
            .filter_map(|c| c.scores.as_ref().map(|s| (*c, s.ncs.total)))
            .max_by(|a, b| a.1.total_cmp(&b.1))?
            .0;
        Some(self.suggestion(
            held,
            best,
            SwapKind::Laggard,
            format!(
                "LAGGARD_SWAP: replace {} ({r:.2}R) with {} ({})",
                held.position.ticker,
                best.ticker,
                best.cluster.as_deref().unwrap_or("unclustered")
            ),
        ))
    }

    fn suggestion(
        &self,
        held: &HeldForSwap<'_>,
        with: &Candidate,
        kind: SwapKind,
        reason: String,
    ) -> SwapSuggestion {
        SwapSuggestion {
            position: held.position.id.clone(),
            ticker: held.position.ticker.clone(),
            replace_with: with.ticker.clone(),
            kind,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::test_support::*;
    use crate::risk::CapOverrides;
    use crate::scoring::{MarketContext, NcsInputs, ScoreCard, ScoreThresholds};

    fn ready(ticker: &str, cluster: &str, momentum: f64) -> Candidate {
        let mut c = candidate(ticker, cluster);
        c.snapshot.return_63d = Some(momentum);
        c.scores = Some(ScoreCard::compute(
            &c.snapshot,
            &MarketContext::default(),
            &NcsInputs::default(),
            &ScoreThresholds::default(),
        ));
        c.status = CandidateStatus::Ready;
        c
    }

    fn held(position: &Position, momentum: f64, r: f64, lagging: bool) -> HeldForSwap<'_> {
        HeldForSwap {
            position,
            momentum: Some(momentum),
            r_multiple: Some(r),
            lagging,
        }
    }

    /// Balanced budget over a 100k account.
    fn budget(positions: &[Position]) -> (RiskBudget, RiskProfile) {
        let profile = RiskProfile::balanced();
        let budget = RiskBudget::compute(100_000.0, &profile, positions, &CapOverrides::default());
        (budget, profile)
    }

    fn semis_at_cap(profile: &RiskProfile) -> Vec<Position> {
        // 10 shares * 10 risk = 100 per unit position
        let units = (profile.cluster_cap_pct / 100.0 * 100_000.0 / 100.0).ceil() as usize;
        (0..units)
            .map(|i| open_position(&format!("S{i}"), "SEMIS", day(2024, 4, 1)))
            .collect()
    }

    #[test]
    fn stronger_same_cluster_leader_replaces_holding_in_capped_cluster() {
        let profile = RiskProfile::balanced();
        let positions = semis_at_cap(&profile);
        let (budget, profile) = budget(&positions);
        let candidates = vec![
            ready("AMD", "SEMIS", 0.30),
            ready("AVGO", "SEMIS", 0.45),
            ready("CRM", "SOFTWARE", 0.90),
        ];
        let s = SwapAdvisor::default()
            .suggest(&held(&positions[0], 0.10, 1.0, false), &candidates, &budget, &profile)
            .unwrap();
        assert_eq!(s.kind, SwapKind::ClusterLeader);
        assert_eq!(s.replace_with, "AVGO");

        let weaker = vec![ready("AMD", "SEMIS", 0.05)];
        assert!(SwapAdvisor::default()
            .suggest(&held(&positions[0], 0.10, 1.0, false), &weaker, &budget, &profile)
            .is_none());
    }

    #[test]
    fn uncapped_cluster_needs_a_laggard() {
        let p = open_position("INTC", "SEMIS", day(2024, 4, 1));
        let (budget, profile) = budget(std::slice::from_ref(&p));
        let candidates = vec![ready("AVGO", "SEMIS", 0.45), ready("CRM", "SOFTWARE", 0.20)];
        let advisor = SwapAdvisor::default();

        assert!(advisor
            .suggest(&held(&p, 0.01, 0.2, false), &candidates, &budget, &profile)
            .is_none());

        let s = advisor
            .suggest(&held(&p, 0.01, 0.2, true), &candidates, &budget, &profile)
            .unwrap();
        assert_eq!(s.kind, SwapKind::Laggard);
        assert!(s.reason.starts_with("LAGGARD_SWAP"));

        // enough profit to keep
        assert!(advisor
            .suggest(&held(&p, 0.01, 0.6, true), &candidates, &budget, &profile)
            .is_none());
    }

    #[test]
    fn only_ready_candidates_are_offered() {
        let p = open_position("INTC", "SEMIS", day(2024, 4, 1));
        let (budget, profile) = budget(std::slice::from_ref(&p));
        let mut watch = ready("AVGO", "SEMIS", 0.45);
        watch.status = CandidateStatus::Watch;
        assert!(SwapAdvisor::default()
            .suggest(&held(&p, 0.01, 0.0, true), &[watch], &budget, &profile)
            .is_none());
    }
}
