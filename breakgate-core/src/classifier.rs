//! Final candidate status from scores, gate verdicts, regime and capacity.

use crate::domain::{Candidate, CandidateStatus};
use crate::gates::{GateEffect, GateVerdict};
use crate::regime::Regime;
use crate::risk::{size_position, RiskBudget, RiskProfile};
use crate::scoring::ScoreClass;

/// Portfolio-wide inputs shared by every candidate in a scan.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierContext<'a> {
    pub regime: Regime,
    pub profile: &'a RiskProfile,
    pub budget: &'a RiskBudget,
}

/// Combine everything known about `candidate` into its status, action note
/// and suggested size. `verdicts` are the candidate-scope gate results.
pub fn classify_candidate(
    candidate: &mut Candidate,
    verdicts: Vec<GateVerdict>,
    ctx: &ClassifierContext<'_>,
) {
    candidate.verdicts = verdicts;
    candidate.shares = 0;
    candidate.risk_dollars = 0.0;

    if matches!(candidate.status, CandidateStatus::DataUnavailable) {
        return;
    }
    let Some(scores) = candidate.scores.as_ref() else {
        candidate.status = CandidateStatus::InsufficientData;
        candidate.action_note = missing_fields_note(candidate);
        return;
    };
    if !candidate.snapshot.is_scorable() {
        candidate.status = CandidateStatus::InsufficientData;
        candidate.action_note = missing_fields_note(candidate);
        return;
    }
    let class = scores.class;
    let fws = scores.fws.total;
    let ncs = scores.ncs.total;

    let blocks: Vec<&str> = reasons(&candidate.verdicts, GateVerdict::is_block);
    let demotions: Vec<&str> = reasons(&candidate.verdicts, GateVerdict::is_demotion);
    let early_bird = candidate.verdicts.iter().any(GateVerdict::is_early_bird);

    let (status, note) = if !blocks.is_empty() {
        (CandidateStatus::AutoNo, blocks.join("; "))
    } else if class == ScoreClass::AutoNo {
        (
            CandidateStatus::AutoNo,
            format!("fragility veto (FWS {fws:.0})"),
        )
    } else if !demotions.is_empty() {
        (CandidateStatus::Watch, demotions.join("; "))
    } else if !ctx.regime.can_buy() {
        (
            CandidateStatus::Watch,
            format!("regime {}: no new entries (NCS {ncs:.0})", ctx.regime),
        )
    } else if class == ScoreClass::AutoYes {
        (
            CandidateStatus::Ready,
            format!("NCS {ncs:.0} / FWS {fws:.0}"),
        )
    } else if early_bird {
        // Momentum stands in for the trend confirmation the score lacks.
        (
            CandidateStatus::Ready,
            format!("early entry, NCS {ncs:.0} / FWS {fws:.0}"),
        )
    } else {
        (
            CandidateStatus::Conditional,
            format!("NCS {ncs:.0} / FWS {fws:.0}, review"),
        )
    };
    candidate.status = status;
    candidate.action_note = note;

    if candidate.status == CandidateStatus::AutoNo {
        return;
    }

    let scalar: f64 = candidate
        .verdicts
        .iter()
        .filter_map(GateVerdict::size_scalar)
        .product();
    let size = size_position(
        ctx.budget.equity,
        ctx.profile.risk_per_trade_pct,
        candidate.entry_trigger,
        candidate.stop_price,
        scalar,
    );
    candidate.shares = size.shares;
    candidate.risk_dollars = size.risk_dollars;

    let mut extras: Vec<String> = candidate
        .verdicts
        .iter()
        .filter(|v| matches!(v.effect, GateEffect::Advisory(_)) && !v.is_demotion())
        .map(|v| v.reason.clone())
        .collect();
    if candidate.is_actionable() {
        let new_risk_pct = if ctx.budget.equity > 0.0 {
            size.risk_dollars / ctx.budget.equity * 100.0
        } else {
            0.0
        };
        extras.extend(
            ctx.budget
                .capacity_warnings(candidate.sleeve, new_risk_pct)
                .into_iter()
                .map(|w| format!("WARNING: {w}")),
        );
    }
    for extra in extras {
        candidate.action_note.push_str(" | ");
        candidate.action_note.push_str(&extra);
    }
}

fn reasons(verdicts: &[GateVerdict], pick: impl Fn(&GateVerdict) -> bool) -> Vec<&str> {
    verdicts
        .iter()
        .filter(|v| pick(v))
        .map(|v| v.reason.as_str())
        .collect()
}

fn missing_fields_note(candidate: &Candidate) -> String {
    let s = &candidate.snapshot;
    let missing: Vec<&str> = [
        ("price", s.price.is_none()),
        ("ATR14", s.atr14.is_none()),
        ("ADX", s.adx.is_none()),
        ("DI", s.plus_di.is_none() || s.minus_di.is_none()),
        ("20-day high", s.high20.is_none()),
        ("20-day low", s.low20.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();
    if missing.is_empty() {
        "not scored".to_string()
    } else {
        format!("insufficient history ({} bars): {}", s.history, missing.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Sleeve, UniverseEntry};
    use crate::gates::Advisory;
    use crate::indicators::IndicatorSnapshot;
    use crate::risk::CapOverrides;
    use crate::scoring::{MarketContext, NcsInputs, ScoreCard, ScoreThresholds};

    fn scorable_candidate() -> Candidate {
        let entry = UniverseEntry::new("NVDA", Sleeve::Core).with_cluster("SEMIS", "TECH");
        let snapshot = IndicatorSnapshot {
            price: Some(100.0),
            atr14: Some(2.0),
            atr_ref: Some(2.0),
            adx: Some(35.0),
            adx_prev: Some(34.0),
            plus_di: Some(35.0),
            minus_di: Some(12.0),
            high20: Some(99.5),
            low20: Some(92.0),
            volume_ratio: Some(1.6),
            hurst: Some(0.72),
            history: 260,
            ..Default::default()
        };
        let mut c = Candidate::new(&entry, snapshot);
        let market = MarketContext {
            regime: Regime::Bullish,
            regime_stable: true,
            ..Default::default()
        };
        c.scores = Some(ScoreCard::compute(
            &c.snapshot,
            &market,
            &NcsInputs::default(),
            &ScoreThresholds::default(),
        ));
        c
    }

    fn run(c: &mut Candidate, verdicts: Vec<GateVerdict>, regime: Regime) {
        let profile = RiskProfile::balanced();
        let budget = RiskBudget::compute(100_000.0, &profile, &[], &CapOverrides::default());
        let ctx = ClassifierContext {
            regime,
            profile: &profile,
            budget: &budget,
        };
        classify_candidate(c, verdicts, &ctx);
    }

    fn force_class(c: &mut Candidate, class: ScoreClass) {
        if let Some(s) = c.scores.as_mut() {
            s.class = class;
        }
    }

    #[test]
    fn auto_yes_without_gates_is_ready_and_sized() {
        let mut c = scorable_candidate();
        force_class(&mut c, ScoreClass::AutoYes);
        run(&mut c, vec![], Regime::Bullish);
        assert_eq!(c.status, CandidateStatus::Ready);
        assert!(c.shares > 0);
    }

    #[test]
    fn block_wins_over_everything() {
        let mut c = scorable_candidate();
        force_class(&mut c, ScoreClass::AutoYes);
        let verdicts = vec![
            GateVerdict::block("whipsaw", "WHIPSAW: blocked"),
            GateVerdict::advisory("earnings", Advisory::DemoteWatch, "earnings in 4d"),
        ];
        run(&mut c, verdicts, Regime::Bullish);
        assert_eq!(c.status, CandidateStatus::AutoNo);
        assert!(c.action_note.contains("WHIPSAW"));
        assert_eq!(c.shares, 0);
    }

    #[test]
    fn fragility_veto() {
        let mut c = scorable_candidate();
        force_class(&mut c, ScoreClass::AutoNo);
        run(&mut c, vec![], Regime::Bullish);
        assert_eq!(c.status, CandidateStatus::AutoNo);
        assert!(c.action_note.contains("fragility veto"));
    }

    #[test]
    fn demotion_and_regime_give_watch() {
        let mut c = scorable_candidate();
        force_class(&mut c, ScoreClass::AutoYes);
        let verdicts = vec![GateVerdict::advisory(
            "earnings",
            Advisory::DemoteWatch,
            "earnings in 4d",
        )];
        run(&mut c, verdicts, Regime::Bullish);
        assert_eq!(c.status, CandidateStatus::Watch);

        let mut c = scorable_candidate();
        force_class(&mut c, ScoreClass::Conditional);
        run(&mut c, vec![], Regime::Sideways);
        assert_eq!(c.status, CandidateStatus::Watch);
    }

    #[test]
    fn size_scalar_halves_shares() {
        let mut full = scorable_candidate();
        force_class(&mut full, ScoreClass::AutoYes);
        run(&mut full, vec![], Regime::Bullish);

        let mut half = scorable_candidate();
        force_class(&mut half, ScoreClass::AutoYes);
        let verdicts = vec![GateVerdict::advisory(
            "correlation",
            Advisory::SizeScalar(0.5),
            "HIGH_CORR: AMD/NVDA r=0.82",
        )];
        run(&mut half, verdicts, Regime::Bullish);
        assert_eq!(half.status, CandidateStatus::Ready);
        assert!(half.shares <= full.shares / 2 + 1);
        assert!(half.action_note.contains("HIGH_CORR"));
    }

    #[test]
    fn early_bird_lifts_conditional_but_not_vetoes() {
        let flag = || {
            vec![GateVerdict::advisory(
                "early_bird",
                Advisory::EarlyBird,
                "EARLY_BIRD: top 5% of 55d range",
            )]
        };
        let mut c = scorable_candidate();
        force_class(&mut c, ScoreClass::Conditional);
        run(&mut c, flag(), Regime::Bullish);
        assert_eq!(c.status, CandidateStatus::Ready);
        assert!(c.action_note.contains("EARLY_BIRD"));

        let mut vetoed = scorable_candidate();
        force_class(&mut vetoed, ScoreClass::AutoNo);
        run(&mut vetoed, flag(), Regime::Bullish);
        assert_eq!(vetoed.status, CandidateStatus::AutoNo);

        let mut sideways = scorable_candidate();
        force_class(&mut sideways, ScoreClass::Conditional);
        run(&mut sideways, flag(), Regime::Sideways);
        assert_eq!(sideways.status, CandidateStatus::Watch);
    }

    #[test]
    fn unscored_candidate_is_insufficient_data() {
        let entry = UniverseEntry::new("NEW", Sleeve::Core);
        let mut c = Candidate::new(&entry, IndicatorSnapshot::default());
        run(&mut c, vec![], Regime::Bullish);
        assert_eq!(c.status, CandidateStatus::InsufficientData);
        assert!(c.action_note.contains("ATR14"));
    }
}
