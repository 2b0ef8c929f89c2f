//! BreakGate CLI: breakout scans, stop management and risk reporting.
//!
//! Commands:
//! - `scan`: score, gate and classify a universe; review open positions
//! - `stop recommend`: propose a stop for an open position (read-only)
//! - `stop apply`: raise a stop, explicitly or from the recommendation
//! - `stop reset`: audited administrative stop override
//! - `risk`: open-risk budget and sleeve/cluster utilization
//! - `correlations`: rebuild the offline correlation table
//! - `import`: load positions from CSV into the position store

use anyhow::{bail, Context, Result};
use breakgate_core::data::{CircuitBreaker, InMemoryProvider, MarketDataProvider, YahooProvider};
use breakgate_core::domain::{CandidateStatus, PositionId, UniverseEntry};
use breakgate_core::gates::GateEffect;
use breakgate_core::regime::DailyRegime;
use breakgate_core::risk::{CapOverrides, RiskBudget, RiskProfile};
use breakgate_core::stops::{ProtectionLevel, StopEvent, StopInputs, StopRecommendation};
use breakgate_runner::{
    compute_correlation_table, fetch_all, load_bars_csv, load_fresh_table, load_universe,
    notify_best_effort, save_table, BackgroundSink, EarningsCalendar, FanOutSink, InMemoryStore,
    JsonLinesSink, LogSink, NotificationSink, PositionStore, ReportCache, ScanConfig,
    ScanInputs, ScanReport, Scanner, StopService,
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "breakgate",
    about = "BreakGate CLI: breakout decision and risk-gate engine"
)]
struct Cli {
    /// Path to a TOML scan config. Defaults to built-in settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Risk profile preset; overrides the config file.
    #[arg(long, global = true)]
    profile: Option<String>,

    /// JSON position store.
    #[arg(long, global = true, default_value = "positions.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score, gate and classify every instrument in a universe file.
    Scan {
        /// Universe file (CSV or TOML).
        #[arg(long)]
        universe: PathBuf,

        /// Offline bars CSV (ticker,date,open,high,low,close,volume). Fetches live without it.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Earnings calendar CSV (ticker,date,confidence).
        #[arg(long)]
        earnings: Option<PathBuf>,

        /// Correlation table written by `correlations`.
        #[arg(long, default_value = "correlations.json")]
        correlations: PathBuf,

        /// Daily regime history; today's label is appended after the scan.
        #[arg(long, default_value = "regime_history.json")]
        regime_history: PathBuf,

        /// Scan date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Account equity; overrides the store's value.
        #[arg(long)]
        equity: Option<f64>,

        /// Write the full report as JSON.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Append alerts to this JSON-lines file as well as the log.
        #[arg(long)]
        alerts: Option<PathBuf>,

        /// Candidates to print.
        #[arg(long, default_value_t = 25)]
        top: usize,
    },
    /// Stop-loss management for open positions.
    Stop {
        #[command(subcommand)]
        action: StopAction,
    },
    /// Report open risk against the profile's caps.
    Risk {
        /// Account equity; overrides the store's value.
        #[arg(long)]
        equity: Option<f64>,
    },
    /// Rebuild the pairwise return-correlation table for a universe.
    Correlations {
        /// Universe file (CSV or TOML).
        #[arg(long)]
        universe: PathBuf,

        /// Offline bars CSV. Fetches live without it.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// As-of date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Trailing window in trading days.
        #[arg(long, default_value_t = breakgate_runner::CORRELATION_WINDOW)]
        window: usize,

        #[arg(long, default_value = "correlations.json")]
        output: PathBuf,
    },
    /// Import positions from CSV into the store.
    Import {
        /// Positions CSV.
        csv: PathBuf,

        /// Equity for a new store. Required when the store does not exist yet.
        #[arg(long)]
        equity: Option<f64>,
    },
}

#[derive(Subcommand)]
enum StopAction {
    /// Propose a stop without changing anything.
    Recommend {
        id: String,
        #[command(flatten)]
        market: MarketArgs,
    },
    /// Raise a stop. Pass --stop and --level, or market inputs to apply the recommendation.
    Apply {
        id: String,

        /// New stop price; must exceed the current stop.
        #[arg(long, requires = "level", conflicts_with = "price")]
        stop: Option<f64>,

        #[arg(long, value_enum)]
        level: Option<LevelArg>,

        #[command(flatten)]
        market: OptionalMarketArgs,

        /// Append the stop event to this JSON-lines file.
        #[arg(long)]
        alerts: Option<PathBuf>,
    },
    /// Administrative override; may lower the stop. Logged for audit.
    Reset {
        id: String,

        #[arg(long)]
        stop: f64,

        /// Audit reason (required).
        #[arg(long)]
        reason: String,

        #[arg(long)]
        alerts: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct MarketArgs {
    /// Last price.
    #[arg(long)]
    price: f64,

    /// 14-day ATR.
    #[arg(long)]
    atr: Option<f64>,

    /// Highest close since entry.
    #[arg(long)]
    highest_close: Option<f64>,
}

#[derive(clap::Args)]
struct OptionalMarketArgs {
    #[arg(long)]
    price: Option<f64>,

    #[arg(long)]
    atr: Option<f64>,

    #[arg(long)]
    highest_close: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Initial,
    Breakeven,
    #[value(name = "lock-08r")]
    Lock08R,
    #[value(name = "lock-1r-trail")]
    Lock1RTrail,
}

impl From<LevelArg> for ProtectionLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Initial => ProtectionLevel::Initial,
            LevelArg::Breakeven => ProtectionLevel::Breakeven,
            LevelArg::Lock08R => ProtectionLevel::Lock08R,
            LevelArg::Lock1RTrail => ProtectionLevel::Lock1RTrail,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.profile.as_deref())?;

    match cli.command {
        Commands::Scan {
            universe,
            bars,
            earnings,
            correlations,
            regime_history,
            date,
            equity,
            output,
            alerts,
            top,
        } => run_scan(
            config,
            &cli.store,
            ScanArgs {
                universe,
                bars,
                earnings,
                correlations,
                regime_history,
                date,
                equity,
                output,
                alerts,
                top,
            },
        ),
        Commands::Stop { action } => run_stop(&config, &cli.store, action),
        Commands::Risk { equity } => run_risk(&config, &cli.store, equity),
        Commands::Correlations {
            universe,
            bars,
            date,
            window,
            output,
        } => run_correlations(&config, &universe, bars.as_deref(), date, window, &output),
        Commands::Import { csv, equity } => run_import(&cli.store, &csv, equity),
    }
}

// ─── Shared setup ───────────────────────────────────────────────────

fn load_config(path: Option<&Path>, profile: Option<&str>) -> Result<ScanConfig> {
    let mut config = match path {
        Some(path) => ScanConfig::from_file(path)?,
        None => ScanConfig::default(),
    };
    if let Some(name) = profile {
        config.profile = name.to_string();
        config.risk = None;
    }
    config.validate()?;
    Ok(config)
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn market_provider(bars: Option<&Path>) -> Result<Box<dyn MarketDataProvider>> {
    match bars {
        Some(path) => {
            let provider: InMemoryProvider = load_bars_csv(path)?;
            Ok(Box::new(provider))
        }
        None => {
            let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
            Ok(Box::new(YahooProvider::new(circuit_breaker)?))
        }
    }
}

fn open_store(path: &Path, equity: Option<f64>) -> Result<InMemoryStore> {
    if path.exists() {
        let store = InMemoryStore::load(path)?;
        if let Some(equity) = equity {
            store.set_equity(equity);
        }
        return Ok(store);
    }
    match equity {
        Some(equity) => Ok(InMemoryStore::new(equity)),
        None => bail!(
            "position store {} not found; pass --equity to start an empty one",
            path.display()
        ),
    }
}

/// Log sink, plus a JSON-lines file when requested, delivered off-thread.
fn alert_sink(path: Option<&Path>) -> Result<BackgroundSink> {
    let inner: Arc<dyn NotificationSink> = match path {
        Some(path) => {
            let log: Arc<dyn NotificationSink> = Arc::new(LogSink);
            let file: Arc<dyn NotificationSink> = Arc::new(JsonLinesSink::new(path));
            Arc::new(FanOutSink::new(vec![log, file]))
        }
        None => Arc::new(LogSink),
    };
    BackgroundSink::spawn(inner).context("failed to start notification thread")
}

fn read_regime_history(path: &Path) -> Result<Vec<DailyRegime>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid regime history {}", path.display()))
}

fn write_regime_history(path: &Path, mut history: Vec<DailyRegime>, today: DailyRegime) -> Result<()> {
    history.retain(|d| d.date != today.date);
    history.push(today);
    history.sort_by_key(|d| d.date);
    let json = serde_json::to_string_pretty(&history)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── scan ───────────────────────────────────────────────────────────

struct ScanArgs {
    universe: PathBuf,
    bars: Option<PathBuf>,
    earnings: Option<PathBuf>,
    correlations: PathBuf,
    regime_history: PathBuf,
    date: Option<String>,
    equity: Option<f64>,
    output: Option<PathBuf>,
    alerts: Option<PathBuf>,
    top: usize,
}

fn run_scan(config: ScanConfig, store_path: &Path, args: ScanArgs) -> Result<()> {
    let today = parse_date(args.date.as_deref())?;
    let universe = load_universe(&args.universe)?;
    if universe.is_empty() {
        bail!("universe {} is empty", args.universe.display());
    }
    let earnings = match &args.earnings {
        Some(path) => EarningsCalendar::load(path)?,
        None => EarningsCalendar::new(),
    };
    let correlations = load_fresh_table(
        &args.correlations,
        today,
        config.cache.correlation_max_age_days,
    )?;
    let history = read_regime_history(&args.regime_history)?;

    let store = open_store(store_path, args.equity)?;
    let open_positions = store.open_positions()?;
    let closed_positions = store.closed_positions()?;

    let provider = market_provider(args.bars.as_deref())?;
    let report_cache = match &config.cache.dir {
        Some(dir) => Some(ReportCache::new(
            dir,
            Duration::from_secs(config.cache.scan_ttl_secs),
        )?),
        None => None,
    };
    let scanner = Scanner::new(config)?;

    let inputs = ScanInputs {
        today,
        universe: &universe,
        equity: store.equity()?,
        open_positions: &open_positions,
        closed_positions: &closed_positions,
        correlations: correlations.as_ref(),
        earnings: &earnings,
        regime_history: &history,
    };

    let key = report_cache.as_ref().and_then(|_| scanner.inputs_key(&inputs));
    let cached: Option<ScanReport> = match (&report_cache, &key) {
        (Some(cache), Some(key)) => cache.get(key)?,
        _ => None,
    };
    let report = match cached {
        Some(report) => {
            tracing::info!(as_of = %today, "scan report served from cache");
            report
        }
        None => {
            let report = scanner.run(provider.as_ref(), &inputs);
            if let (Some(cache), Some(key)) = (&report_cache, &key) {
                cache.put(key, &report)?;
            }
            report
        }
    };

    print_scan(&report, &universe, args.top);

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nReport saved to: {}", path.display());
    }
    write_regime_history(&args.regime_history, history, report.daily_regime())?;

    let sink = alert_sink(args.alerts.as_deref())?;
    for alert in report.alerts() {
        notify_best_effort(&sink, &alert);
    }
    Ok(())
}

fn print_scan(report: &ScanReport, universe: &[UniverseEntry], top: usize) {
    let regime = &report.regime;
    println!();
    println!("=== Breakout Scan {} ({}) ===", report.as_of, report.profile);
    println!(
        "Regime:     {} (today {}{}, {} day(s){})",
        regime.state.regime,
        regime.combined.regime,
        if regime.combined.chop_detected { ", chop" } else { "" },
        regime.state.consecutive_days,
        if regime.flipped_recently {
            ", flipped recently"
        } else {
            ""
        },
    );
    if let Some(breadth) = &report.breadth {
        println!(
            "Breadth:    {:.0}% above MA50 ({} of {})",
            breadth.pct_above(),
            breadth.above_ma50,
            breadth.sampled
        );
    }
    println!(
        "Risk:       {:.2}% used / {:.2}% max, {} of {} positions",
        report.budget.used_risk_pct,
        report.budget.max_risk_pct,
        report.budget.used_positions,
        report.budget.max_positions
    );
    for verdict in report.portfolio_verdicts.iter().filter(|v| !v.passed) {
        println!("Portfolio:  [{}] {}", verdict.gate, verdict.reason);
    }

    let statuses = [
        CandidateStatus::Ready,
        CandidateStatus::Conditional,
        CandidateStatus::Watch,
        CandidateStatus::AutoNo,
        CandidateStatus::InsufficientData,
        CandidateStatus::DataUnavailable,
    ];
    let counts: Vec<String> = statuses
        .iter()
        .map(|s| format!("{s} {}", report.count(*s)))
        .collect();
    println!(
        "Universe:   {} instruments: {}",
        universe.len(),
        counts.join(", ")
    );

    println!();
    println!(
        "{:<8} {:<12} {:<10} {:>9} {:>6} {:>6} {:>6} {:>9} {:>9} {:>7}  NOTE",
        "TICKER", "STATUS", "SLEEVE", "PRICE", "BQS", "FWS", "NCS", "TRIGGER", "STOP", "SHARES"
    );
    for c in report.candidates.iter().take(top) {
        let (bqs, fws, ncs) = match &c.scores {
            Some(s) => (
                format!("{:.0}", s.bqs.total),
                format!("{:.0}", s.fws.total),
                format!("{:.0}", s.ncs.total),
            ),
            None => ("-".into(), "-".into(), "-".into()),
        };
        println!(
            "{:<8} {:<12} {:<10} {:>9} {:>6} {:>6} {:>6} {:>9} {:>9} {:>7}  {}",
            c.ticker,
            c.status.to_string(),
            c.sleeve.to_string(),
            fmt_price(Some(c.price)),
            bqs,
            fws,
            ncs,
            fmt_price(c.entry_trigger),
            fmt_price(c.stop_price),
            c.shares,
            c.action_note
        );
    }
    if report.candidates.len() > top {
        println!("... {} more in the JSON report", report.candidates.len() - top);
    }

    if !report.positions.is_empty() {
        println!();
        println!(
            "{:<20} {:<8} {:>9} {:>7} {:>6} {:>9} {:<14} STOP ACTION",
            "POSITION", "TICKER", "PRICE", "R", "DAYS", "STOP", "LEVEL"
        );
        for p in &report.positions {
            let action = match &p.stop {
                Some(StopRecommendation::Raise(proposal)) => format!(
                    "raise to {:.2} ({})",
                    proposal.new_stop, proposal.level
                ),
                Some(StopRecommendation::NoChange { reason, .. }) => reason.clone(),
                None => p.note.clone(),
            };
            println!(
                "{:<20} {:<8} {:>9} {:>7} {:>6} {:>9.2} {:<14} {}",
                p.id.to_string(),
                p.ticker,
                fmt_price(p.price),
                p.r_multiple
                    .map(|r| format!("{r:+.2}"))
                    .unwrap_or_else(|| "-".into()),
                p.holding_days,
                p.current_stop,
                p.protection_level.to_string(),
                action
            );
            for verdict in p
                .verdicts
                .iter()
                .filter(|v| matches!(v.effect, GateEffect::Advisory(_) | GateEffect::Block))
            {
                println!("{:<20} [{}] {}", "", verdict.gate, verdict.reason);
            }
            if let Some(swap) = &p.swap {
                println!("{:<20} [swap] {}", "", swap.reason);
            }
        }
    }

    if !report.fetch_failures.is_empty() {
        println!();
        println!("Data unavailable for {} ticker(s):", report.fetch_failures.len());
        for (ticker, reason) in &report.fetch_failures {
            println!("  {ticker:<8} {reason}");
        }
    }
    println!();
    println!("Scan completed in {} ms", report.elapsed_ms);
}

fn fmt_price(price: Option<f64>) -> String {
    match price {
        Some(p) if p.is_finite() => format!("{p:.2}"),
        _ => "-".into(),
    }
}

// ─── stop ───────────────────────────────────────────────────────────

fn run_stop(config: &ScanConfig, store_path: &Path, action: StopAction) -> Result<()> {
    let profile = config.risk_profile()?;
    let store = Arc::new(open_store(store_path, None)?);

    match action {
        StopAction::Recommend { id, market } => {
            let service = StopService::new(store, profile.stop_ladder);
            let id = PositionId::new(id);
            let inputs = StopInputs {
                price: market.price,
                atr14: market.atr,
                highest_close_since_entry: market.highest_close,
            };
            match service.recommend(&id, &inputs)? {
                StopRecommendation::Raise(proposal) => {
                    println!(
                        "{id}: raise stop to {:.2} ({})",
                        proposal.new_stop, proposal.level
                    );
                    println!("  {}", proposal.justification);
                }
                StopRecommendation::NoChange {
                    reason,
                    trailing_candidate,
                } => {
                    println!("{id}: no change ({reason})");
                    if let Some(trail) = trailing_candidate {
                        println!("  trailing candidate {trail:.2}");
                    }
                }
            }
            Ok(())
        }
        StopAction::Apply {
            id,
            stop,
            level,
            market,
            alerts,
        } => {
            let sink: Arc<dyn NotificationSink> = Arc::new(alert_sink(alerts.as_deref())?);
            let service = StopService::new(store.clone(), profile.stop_ladder).with_notifier(sink);
            let id = PositionId::new(id);
            let event = match (stop, level, market.price) {
                (Some(stop), Some(level), _) => Some(service.apply(&id, stop, level.into())?),
                (None, _, Some(price)) => service.apply_recommended(
                    &id,
                    &StopInputs {
                        price,
                        atr14: market.atr,
                        highest_close_since_entry: market.highest_close,
                    },
                )?,
                _ => bail!("pass --stop with --level, or --price to apply the recommendation"),
            };
            match event {
                Some(event) => {
                    print_event(&event);
                    store.save(store_path)?;
                }
                None => println!("{id}: no stop change"),
            }
            Ok(())
        }
        StopAction::Reset {
            id,
            stop,
            reason,
            alerts,
        } => {
            let sink: Arc<dyn NotificationSink> = Arc::new(alert_sink(alerts.as_deref())?);
            let service = StopService::new(store.clone(), profile.stop_ladder).with_notifier(sink);
            let event = service.admin_reset(&PositionId::new(id), stop, &reason)?;
            print_event(&event);
            store.save(store_path)?;
            Ok(())
        }
    }
}

fn print_event(event: &StopEvent) {
    match event {
        StopEvent::Raised {
            id,
            from,
            to,
            level_from,
            level_to,
        } => println!("{id}: stop {from:.2} -> {to:.2} ({level_from} -> {level_to})"),
        StopEvent::AdminReset {
            id,
            from,
            to,
            reason,
        } => println!("{id}: stop reset {from:.2} -> {to:.2} (reason: {reason})"),
    }
}

// ─── risk ───────────────────────────────────────────────────────────

fn run_risk(config: &ScanConfig, store_path: &Path, equity: Option<f64>) -> Result<()> {
    let profile = config.risk_profile()?;
    let store = open_store(store_path, equity)?;
    let positions = store.open_positions()?;
    let budget = RiskBudget::compute(store.equity()?, &profile, &positions, &CapOverrides::default());
    print_budget(&budget, &profile);
    Ok(())
}

fn print_budget(budget: &RiskBudget, profile: &RiskProfile) {
    println!();
    println!("=== Risk Budget ({}) ===", profile.name);
    println!("Equity:          ${:.2}", budget.equity);
    println!(
        "Open risk:       {:.2}% of {:.2}% ({:.2}% remaining)",
        budget.used_risk_pct, budget.max_risk_pct, budget.remaining_risk_pct
    );
    println!(
        "Positions:       {} of {}{}",
        budget.used_positions,
        budget.max_positions,
        if budget.positions_full() { " (full)" } else { "" }
    );

    println!();
    println!("{:<16} {:>8} {:>8} {:>7}", "BUCKET", "USED %", "CAP %", "UTIL");
    for (sleeve, u) in &budget.sleeve_utilization {
        println!(
            "{:<16} {:>8.2} {:>8.2} {:>6.0}%",
            format!("sleeve {sleeve}"),
            u.used_pct,
            u.cap_pct,
            u.utilization * 100.0
        );
    }
    for (name, u) in &budget.cluster_utilization {
        println!(
            "{:<16} {:>8.2} {:>8.2} {:>6.0}%",
            name,
            u.used_pct,
            u.cap_pct,
            u.utilization * 100.0
        );
    }
    for (name, u) in &budget.super_cluster_utilization {
        println!(
            "{:<16} {:>8.2} {:>8.2} {:>6.0}%",
            format!("super {name}"),
            u.used_pct,
            u.cap_pct,
            u.utilization * 100.0
        );
    }
}

// ─── correlations ───────────────────────────────────────────────────

fn run_correlations(
    config: &ScanConfig,
    universe_path: &Path,
    bars: Option<&Path>,
    date: Option<String>,
    window: usize,
    output: &Path,
) -> Result<()> {
    let today = parse_date(date.as_deref())?;
    let universe = load_universe(universe_path)?;
    let tickers: Vec<String> = universe.iter().map(|e| e.ticker.clone()).collect();
    let provider = market_provider(bars)?;

    let outcome = fetch_all(provider.as_ref(), &tickers, today, &config.fetch);
    for (ticker, err) in &outcome.failures {
        eprintln!("Error for {ticker}: {err}");
    }
    if outcome.bars.len() < 2 {
        bail!("need bars for at least two tickers, got {}", outcome.bars.len());
    }

    let table = compute_correlation_table(&outcome.bars, today, window);
    save_table(&table, output)?;
    println!(
        "{} pairs over {} days saved to: {}",
        table.len(),
        window,
        output.display()
    );
    Ok(())
}

// ─── import ─────────────────────────────────────────────────────────

fn run_import(store_path: &Path, csv_path: &Path, equity: Option<f64>) -> Result<()> {
    let content = std::fs::read_to_string(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;
    let store = open_store(store_path, equity)?;
    let imported = store.import_csv(&content)?;
    store.save(store_path)?;
    println!(
        "Imported {imported} position(s); {} in {}",
        store.len(),
        store_path.display()
    );
    Ok(())
}
