//! Scan orchestration.
//!
//! One pass over the universe: fetch bars, read the benchmark regime and
//! market breadth, run portfolio gates to settle today's caps, then score,
//! gate and classify every candidate on the scan pool. Open positions get a
//! review from the position gates, a stop recommendation and, once the READY
//! list is known, a possible swap suggestion. Bars older than the configured
//! data age count as missing.

use crate::cache::{cache_key, TtlCache};
use crate::config::{ConfigError, ScanConfig};
use crate::fetch::{fetch_all, FetchOutcome};
use crate::notify::{Alert, AlertKind};
use crate::universe::EarningsCalendar;
use breakgate_core::classifier::{classify_candidate, ClassifierContext};
use breakgate_core::data::MarketDataProvider;
use breakgate_core::domain::{
    Bar, Candidate, CandidateStatus, Position, PositionId, UniverseEntry,
};
use breakgate_core::gates::{
    sample_breadth_universe, Advisory, BreadthReading, CapOverride, CorrelationTable,
    GateContext, GateEffect, GateRegistry, GateScope, GateSubject, GateVerdict, HeldForSwap,
    MarketGateInputs, PositionMarket, SwapAdvisor, SwapSuggestion,
};
use breakgate_core::indicators::IndicatorSnapshot;
use breakgate_core::regime::stability::{FLIP_WINDOW, STABILITY_DAYS};
use breakgate_core::regime::{
    self, combine, confirm, regime_flipped_recently, CombinedRegime, DailyRegime,
    RegimeInputs, RegimeReading, RegimeState,
};
use breakgate_core::risk::{CapOverrides, RiskBudget, RiskProfile};
use breakgate_core::rng::RngHierarchy;
use breakgate_core::scoring::{MarketContext, NcsInputs, ScoreCard};
use breakgate_core::stops::{recommend, ProtectionLevel, StopInputs, StopRecommendation};
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build scan thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Per-scan inputs besides market data.
#[derive(Debug, Clone, Copy)]
pub struct ScanInputs<'a> {
    pub today: NaiveDate,
    pub universe: &'a [UniverseEntry],
    pub equity: f64,
    pub open_positions: &'a [Position],
    pub closed_positions: &'a [Position],
    pub correlations: Option<&'a CorrelationTable>,
    pub earnings: &'a EarningsCalendar,
    /// Previous daily regime labels; today's label is appended by the scan.
    pub regime_history: &'a [DailyRegime],
}

// ─── Report ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSummary {
    pub primary: RegimeReading,
    pub secondary: Option<RegimeReading>,
    /// Today's label across both benchmarks, before confirmation.
    pub combined: CombinedRegime,
    /// Confirmed regime; CHOP until the label has held for enough days.
    pub state: RegimeState,
    pub flipped_recently: bool,
    pub benchmark_adx: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReview {
    pub id: PositionId,
    pub ticker: String,
    pub price: Option<f64>,
    pub r_multiple: Option<f64>,
    pub holding_days: i64,
    pub current_stop: f64,
    pub protection_level: ProtectionLevel,
    pub verdicts: Vec<GateVerdict>,
    pub stop: Option<StopRecommendation>,
    pub swap: Option<SwapSuggestion>,
    pub note: String,
}

impl PositionReview {
    /// Flagged by the laggard or dead-money review.
    pub fn is_lagging(&self) -> bool {
        self.verdicts.iter().any(|v| {
            matches!(
                v.effect,
                GateEffect::Advisory(Advisory::TrimLaggard | Advisory::DeadMoney)
            )
        })
    }

    fn push_note(&mut self, text: &str) {
        if !self.note.is_empty() {
            self.note.push_str("; ");
        }
        self.note.push_str(text);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateStats {
    pub evaluated: usize,
    pub passed: usize,
    pub blocked: usize,
    pub advisories: usize,
    pub cap_overrides: usize,
    pub not_evaluated: usize,
    pub not_applicable: usize,
}

impl GateStats {
    fn record(&mut self, verdict: &GateVerdict) {
        self.evaluated += 1;
        match verdict.effect {
            GateEffect::Pass => self.passed += 1,
            GateEffect::Block => self.blocked += 1,
            GateEffect::Advisory(_) => self.advisories += 1,
            GateEffect::CapOverride(_) => self.cap_overrides += 1,
            GateEffect::NotEvaluated => self.not_evaluated += 1,
            GateEffect::NotApplicable => self.not_applicable += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub as_of: NaiveDate,
    pub profile: String,
    pub regime: RegimeSummary,
    pub breadth: Option<BreadthReading>,
    pub portfolio_verdicts: Vec<GateVerdict>,
    pub cap_overrides: CapOverrides,
    pub budget: RiskBudget,
    /// Sorted: actionable first, then by NCS descending.
    pub candidates: Vec<Candidate>,
    pub positions: Vec<PositionReview>,
    pub gate_stats: BTreeMap<String, GateStats>,
    pub fetch_failures: BTreeMap<String, String>,
    pub elapsed_ms: u64,
}

impl ScanReport {
    pub fn count(&self, status: CandidateStatus) -> usize {
        self.candidates.iter().filter(|c| c.status == status).count()
    }

    pub fn candidate(&self, ticker: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.ticker == ticker)
    }

    /// Today's confirmed-or-not label, for appending to the regime history.
    pub fn daily_regime(&self) -> DailyRegime {
        DailyRegime {
            date: self.as_of,
            regime: self.regime.combined.regime,
        }
    }

    /// Alerts worth pushing to a notification sink.
    pub fn alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .candidates
            .iter()
            .filter(|c| c.status == CandidateStatus::Ready)
            .map(|c| {
                Alert::new(
                    AlertKind::CandidateReady,
                    Some(&c.ticker),
                    format!(
                        "{} READY: {} sh, trigger {}, stop {} ({})",
                        c.ticker,
                        c.shares,
                        fmt_price(c.entry_trigger),
                        fmt_price(c.stop_price),
                        c.action_note
                    ),
                )
            })
            .collect();
        alerts.extend(
            self.positions
                .iter()
                .filter(|p| !p.note.is_empty())
                .map(|p| {
                    Alert::new(
                        AlertKind::PositionReview,
                        Some(&p.ticker),
                        format!("{}: {}", p.ticker, p.note),
                    )
                }),
        );
        if !self.fetch_failures.is_empty() {
            let tickers: Vec<&str> = self.fetch_failures.keys().map(String::as_str).collect();
            alerts.push(Alert::new(
                AlertKind::DataDegraded,
                None,
                format!(
                    "{} ticker(s) without data: {}",
                    tickers.len(),
                    tickers.join(", ")
                ),
            ));
        }
        alerts
    }
}

fn fmt_price(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |p| format!("{p:.2}"))
}

// ─── Scanner ────────────────────────────────────────────────────────

/// Read-only state every gate evaluation shares.
struct Shared<'a> {
    today: NaiveDate,
    open: &'a [Position],
    closed: &'a [Position],
    profile: &'a RiskProfile,
    correlations: Option<&'a CorrelationTable>,
    momentum: &'a BTreeMap<String, f64>,
    market: &'a MarketGateInputs,
}

impl<'a> Shared<'a> {
    fn context<'s>(&'s self, subject: GateSubject<'s>) -> GateContext<'s>
    where
        'a: 's,
    {
        GateContext {
            today: self.today,
            subject,
            open_positions: self.open,
            closed_positions: self.closed,
            profile: self.profile,
            correlations: self.correlations,
            momentum: self.momentum,
            market: self.market,
        }
    }
}

struct CandidateEnv<'a> {
    shared: &'a Shared<'a>,
    fetched: &'a FetchOutcome,
    snapshots: &'a BTreeMap<String, IndicatorSnapshot>,
    market: &'a MarketContext,
    budget: &'a RiskBudget,
    classifier: &'a ClassifierContext<'a>,
    earnings: &'a EarningsCalendar,
}

pub struct Scanner {
    config: ScanConfig,
    profile: RiskProfile,
    registry: GateRegistry,
    pool: rayon::ThreadPool,
    cache: TtlCache<ScanReport>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        let profile = config.risk_profile()?;
        let registry = config.gate_registry()?;
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("breakgate-scan-{i}"));
        if config.workers > 0 {
            builder = builder.num_threads(config.workers);
        }
        let pool = builder.build()?;
        let cache = TtlCache::new(Duration::from_secs(config.cache.scan_ttl_secs));
        Ok(Self {
            config,
            profile,
            registry,
            pool,
            cache,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn profile(&self) -> &RiskProfile {
        &self.profile
    }

    pub fn registry(&self) -> &GateRegistry {
        &self.registry
    }

    /// BLAKE3 digest of everything that determines a scan's outcome apart
    /// from market data.
    pub fn inputs_key(&self, inputs: &ScanInputs<'_>) -> Option<String> {
        #[derive(Serialize)]
        struct KeyInput<'a> {
            today: NaiveDate,
            universe: &'a [UniverseEntry],
            equity: f64,
            open: &'a [Position],
            closed: &'a [Position],
            correlations_as_of: Option<NaiveDate>,
            earnings: &'a EarningsCalendar,
            regime_history: &'a [DailyRegime],
            config: &'a ScanConfig,
        }
        let input = KeyInput {
            today: inputs.today,
            universe: inputs.universe,
            equity: inputs.equity,
            open: inputs.open_positions,
            closed: inputs.closed_positions,
            correlations_as_of: inputs.correlations.map(|t| t.as_of),
            earnings: inputs.earnings,
            regime_history: inputs.regime_history,
            config: &self.config,
        };
        cache_key(&input)
            .map_err(|e| tracing::warn!(error = %e, "scan cache key unavailable"))
            .ok()
    }

    /// `run`, reusing a report for identical inputs within the cache TTL.
    pub fn run_cached(
        &self,
        provider: &dyn MarketDataProvider,
        inputs: &ScanInputs<'_>,
    ) -> ScanReport {
        let key = self.inputs_key(inputs);
        if let Some(report) = key.as_deref().and_then(|k| self.cache.get(k)) {
            tracing::debug!(as_of = %inputs.today, "scan served from cache");
            return report;
        }
        let report = self.run(provider, inputs);
        if let Some(key) = key {
            self.cache.insert(key, report.clone());
        }
        report
    }

    pub fn run(&self, provider: &dyn MarketDataProvider, inputs: &ScanInputs<'_>) -> ScanReport {
        let started = Instant::now();
        let today = inputs.today;
        let bench = &self.config.benchmarks;

        let mut tickers: Vec<String> = inputs.universe.iter().map(|e| e.ticker.clone()).collect();
        tickers.push(bench.primary.clone());
        tickers.extend(bench.secondary.iter().cloned());
        tickers.extend(bench.vol_index.iter().cloned());
        tickers.extend(
            inputs
                .open_positions
                .iter()
                .filter(|p| p.is_open())
                .map(|p| p.ticker.clone()),
        );
        let fetched = fetch_all(provider, &tickers, today, &self.config.fetch);

        let snapshots: BTreeMap<String, IndicatorSnapshot> = self.pool.install(|| {
            fetched
                .bars
                .par_iter()
                .map(|(t, bars)| (t.clone(), IndicatorSnapshot::from_bars(bars)))
                .collect()
        });

        let seed = RngHierarchy::for_date(self.config.breadth.seed, today);
        let sample =
            sample_breadth_universe(inputs.universe, self.config.breadth.sample_size, &seed);
        let breadth = BreadthReading::from_flags(
            sample
                .iter()
                .map(|t| snapshots.get(t).and_then(IndicatorSnapshot::above_ma50)),
        );

        let regime = self.read_regime(&snapshots, breadth, inputs);
        let market_inputs = MarketGateInputs {
            benchmark_adx: regime.benchmark_adx,
            breadth,
            is_execution_day: today.weekday() == self.config.execution_weekday,
        };
        let momentum: BTreeMap<String, f64> = snapshots
            .iter()
            .filter_map(|(t, s)| s.return_63d.map(|r| (t.clone(), r)))
            .collect();
        let shared = Shared {
            today,
            open: inputs.open_positions,
            closed: inputs.closed_positions,
            profile: &self.profile,
            correlations: inputs.correlations,
            momentum: &momentum,
            market: &market_inputs,
        };

        let portfolio_verdicts = self
            .registry
            .evaluate(GateScope::Portfolio, &shared.context(GateSubject::Portfolio));
        let cap_overrides = fold_overrides(&portfolio_verdicts);
        let budget = RiskBudget::compute(
            inputs.equity,
            &self.profile,
            inputs.open_positions,
            &cap_overrides,
        );

        let market = MarketContext {
            regime: regime.combined.regime,
            regime_stable: regime.state.stable,
            regime_flipped_recently: regime.flipped_recently,
            benchmark_return_63d: snapshots.get(&bench.primary).and_then(|s| s.return_63d),
        };
        let classifier = ClassifierContext {
            regime: regime.state.regime,
            profile: &self.profile,
            budget: &budget,
        };
        let env = CandidateEnv {
            shared: &shared,
            fetched: &fetched,
            snapshots: &snapshots,
            market: &market,
            budget: &budget,
            classifier: &classifier,
            earnings: inputs.earnings,
        };

        let held: BTreeSet<&str> = inputs
            .open_positions
            .iter()
            .filter(|p| p.is_open())
            .map(|p| p.ticker.as_str())
            .collect();
        let mut candidates: Vec<Candidate> = self.pool.install(|| {
            inputs
                .universe
                .par_iter()
                .filter(|e| !held.contains(e.ticker.as_str()))
                .map(|entry| self.evaluate_candidate(entry, &env))
                .collect()
        });
        candidates.sort_by(|a, b| {
            status_rank(a.status)
                .cmp(&status_rank(b.status))
                .then_with(|| ncs(b).total_cmp(&ncs(a)))
                .then_with(|| a.ticker.cmp(&b.ticker))
        });

        let mut positions: Vec<PositionReview> = inputs
            .open_positions
            .iter()
            .filter(|p| p.is_open())
            .map(|p| self.review_position(p, &fetched, &snapshots, &shared))
            .collect();
        suggest_swaps(
            &SwapAdvisor::default(),
            &mut positions,
            inputs.open_positions,
            &candidates,
            &budget,
            &self.profile,
            &momentum,
        );

        let mut gate_stats: BTreeMap<String, GateStats> = BTreeMap::new();
        for v in portfolio_verdicts
            .iter()
            .chain(candidates.iter().flat_map(|c| &c.verdicts))
            .chain(positions.iter().flat_map(|p| &p.verdicts))
        {
            gate_stats.entry(v.gate.clone()).or_default().record(v);
        }

        let report = ScanReport {
            as_of: today,
            profile: self.profile.name.clone(),
            regime,
            breadth,
            portfolio_verdicts,
            cap_overrides,
            budget,
            candidates,
            positions,
            gate_stats,
            fetch_failures: fetched
                .failures
                .iter()
                .map(|(t, e)| (t.clone(), e.to_string()))
                .collect(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(
            %today,
            regime = %report.regime.state.regime,
            stable = report.regime.state.stable,
            candidates = report.candidates.len(),
            ready = report.count(CandidateStatus::Ready),
            conditional = report.count(CandidateStatus::Conditional),
            unavailable = report.count(CandidateStatus::DataUnavailable),
            elapsed_ms = report.elapsed_ms,
            "scan complete"
        );
        report
    }

    fn read_regime(
        &self,
        snapshots: &BTreeMap<String, IndicatorSnapshot>,
        breadth: Option<BreadthReading>,
        inputs: &ScanInputs<'_>,
    ) -> RegimeSummary {
        let bench = &self.config.benchmarks;
        let vol_index = bench
            .vol_index
            .as_ref()
            .and_then(|t| snapshots.get(t))
            .and_then(|s| s.price);
        let breadth_pct = breadth.map(|b| b.pct_above());
        let max_age = self.config.fetch.max_data_age_days;
        let today = inputs.today;
        let read = |ticker: &str| {
            snapshots.get(ticker).map(|s| {
                let regime_inputs =
                    RegimeInputs::from_snapshot(s, vol_index).with_breadth(breadth_pct);
                match data_age_days(s, today) {
                    Some(age) => regime::classify_dated(&regime_inputs, age, max_age),
                    None => regime::classify(&regime_inputs),
                }
            })
        };

        let primary = read(&bench.primary).unwrap_or_else(|| {
            tracing::warn!(benchmark = %bench.primary, "primary benchmark has no data");
            regime::classify(&RegimeInputs::default())
        });
        let secondary = bench.secondary.as_deref().and_then(read);
        let combined = combine(&primary, secondary.as_ref());

        let mut history: Vec<DailyRegime> = inputs
            .regime_history
            .iter()
            .filter(|d| d.date < inputs.today)
            .copied()
            .collect();
        history.push(DailyRegime {
            date: inputs.today,
            regime: combined.regime,
        });

        RegimeSummary {
            benchmark_adx: snapshots.get(&bench.primary).and_then(|s| s.adx),
            state: confirm(&history, STABILITY_DAYS),
            flipped_recently: regime_flipped_recently(&history, FLIP_WINDOW),
            primary,
            secondary,
            combined,
        }
    }

    fn evaluate_candidate(&self, entry: &UniverseEntry, env: &CandidateEnv<'_>) -> Candidate {
        let Some(snapshot) = env.snapshots.get(&entry.ticker) else {
            let reason = env.fetched.failure_reason(&entry.ticker);
            let mut candidate = Candidate::unavailable(entry, format!("data unavailable: {reason}"));
            classify_candidate(&mut candidate, Vec::new(), env.classifier);
            return candidate;
        };

        if let Some(age) = self.stale_age(snapshot, env.shared.today) {
            let mut candidate =
                Candidate::unavailable(entry, format!("data unavailable: last bar {age}d old"));
            classify_candidate(&mut candidate, Vec::new(), env.classifier);
            return candidate;
        }

        let earnings = env.earnings.info_for(&entry.ticker, env.shared.today);
        let mut candidate = Candidate::new(entry, snapshot.clone()).with_earnings(earnings);
        if snapshot.is_scorable() {
            let penalties = NcsInputs {
                earnings_days: earnings.and_then(|e| e.days_until),
                cluster_utilization: entry
                    .cluster
                    .as_deref()
                    .map(|c| env.budget.cluster(c, self.profile.cluster_cap_pct).utilization),
                super_cluster_utilization: entry.super_cluster.as_deref().map(|c| {
                    env.budget
                        .super_cluster(c, self.profile.super_cluster_cap_pct)
                        .utilization
                }),
            };
            candidate.scores = Some(ScoreCard::compute(
                snapshot,
                env.market,
                &penalties,
                &self.config.thresholds,
            ));
        }

        let verdicts = self.registry.evaluate(
            GateScope::Candidate,
            &env.shared.context(GateSubject::Candidate(&candidate)),
        );
        classify_candidate(&mut candidate, verdicts, env.classifier);
        candidate
    }

    fn review_position(
        &self,
        position: &Position,
        fetched: &FetchOutcome,
        snapshots: &BTreeMap<String, IndicatorSnapshot>,
        shared: &Shared<'_>,
    ) -> PositionReview {
        let snapshot = snapshots.get(&position.ticker);
        let price = snapshot.and_then(|s| s.price);
        let mut review = PositionReview {
            id: position.id.clone(),
            ticker: position.ticker.clone(),
            price,
            r_multiple: price.and_then(|p| position.r_multiple(p)),
            holding_days: position.holding_days(shared.today),
            current_stop: position.current_stop(),
            protection_level: position.protection_level(),
            verdicts: Vec::new(),
            stop: None,
            swap: None,
            note: String::new(),
        };
        let (Some(snapshot), Some(price)) = (snapshot, price) else {
            review.note = format!(
                "no market data: {}",
                fetched.failure_reason(&position.ticker)
            );
            return review;
        };
        if let Some(age) = self.stale_age(snapshot, shared.today) {
            review.note = format!("stale market data: last bar {age}d old");
            return review;
        }

        let market = PositionMarket::from_snapshot(price, snapshot);
        review.verdicts = self.registry.evaluate(
            GateScope::Position,
            &shared.context(GateSubject::Position {
                position,
                market: &market,
            }),
        );
        let inputs = StopInputs {
            price,
            atr14: snapshot.atr14,
            highest_close_since_entry: fetched
                .get(&position.ticker)
                .and_then(|bars| highest_close_since(bars, position.entry_date)),
        };
        review.stop = Some(recommend(position, &inputs, &self.profile.stop_ladder));
        review.note = review
            .verdicts
            .iter()
            .filter(|v| matches!(v.effect, GateEffect::Advisory(_)))
            .map(|v| v.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        review
    }

    /// Age in days of a snapshot past the configured limit, if any.
    fn stale_age(&self, snapshot: &IndicatorSnapshot, today: NaiveDate) -> Option<i64> {
        data_age_days(snapshot, today).filter(|age| *age > self.config.fetch.max_data_age_days)
    }
}

fn data_age_days(snapshot: &IndicatorSnapshot, today: NaiveDate) -> Option<i64> {
    snapshot.date.map(|d| (today - d).num_days())
}

/// Attach at most one swap suggestion to each reviewed position.
fn suggest_swaps(
    advisor: &SwapAdvisor,
    reviews: &mut [PositionReview],
    open: &[Position],
    candidates: &[Candidate],
    budget: &RiskBudget,
    profile: &RiskProfile,
    momentum: &BTreeMap<String, f64>,
) {
    for review in reviews.iter_mut() {
        let Some(position) = open.iter().find(|p| p.id == review.id) else {
            continue;
        };
        let held = HeldForSwap {
            position,
            momentum: momentum.get(&position.ticker).copied(),
            r_multiple: review.r_multiple,
            lagging: review.is_lagging(),
        };
        if let Some(swap) = advisor.suggest(&held, candidates, budget, profile) {
            tracing::info!(position = %review.id, with = %swap.replace_with, kind = ?swap.kind, "swap suggested");
            review.push_note(&swap.reason);
            review.swap = Some(swap);
        }
    }
}

/// Most restrictive override of each kind wins.
fn fold_overrides(verdicts: &[GateVerdict]) -> CapOverrides {
    let mut overrides = CapOverrides::default();
    for v in verdicts {
        match v.effect {
            GateEffect::CapOverride(CapOverride::MaxPositions(n)) => {
                overrides.max_positions = Some(overrides.max_positions.map_or(n, |m| m.min(n)));
            }
            GateEffect::CapOverride(CapOverride::MaxOpenRiskPct(pct)) => {
                overrides.max_open_risk_pct =
                    Some(overrides.max_open_risk_pct.map_or(pct, |m| m.min(pct)));
            }
            _ => {}
        }
    }
    overrides
}

fn highest_close_since(bars: &[Bar], since: NaiveDate) -> Option<f64> {
    bars.iter()
        .filter(|b| b.date >= since && b.close.is_finite())
        .map(|b| b.close)
        .reduce(f64::max)
}

fn status_rank(status: CandidateStatus) -> u8 {
    match status {
        CandidateStatus::Ready => 0,
        CandidateStatus::Conditional => 1,
        CandidateStatus::Watch => 2,
        CandidateStatus::AutoNo => 3,
        CandidateStatus::InsufficientData => 4,
        CandidateStatus::DataUnavailable => 5,
    }
}

fn ncs(c: &Candidate) -> f64 {
    c.scores.as_ref().map_or(f64::NEG_INFINITY, |s| s.ncs.total)
}
