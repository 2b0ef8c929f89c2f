//! Scan inputs loaded from files: universe, earnings calendar and offline
//! bar histories.

use anyhow::{bail, Context, Result};
use breakgate_core::data::InMemoryProvider;
use breakgate_core::domain::{Bar, EarningsConfidence, EarningsInfo, Sleeve, UniverseEntry};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ─── Universe ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct UniverseRow {
    ticker: String,
    sleeve: String,
    #[serde(default)]
    cluster: Option<String>,
    #[serde(default)]
    super_cluster: Option<String>,
    #[serde(default)]
    sector: Option<String>,
}

impl UniverseRow {
    fn into_entry(self) -> Result<UniverseEntry> {
        let sleeve: Sleeve = self
            .sleeve
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{}: {e}", self.ticker))?;
        let non_empty = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let ticker = self.ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            bail!("universe row with empty ticker");
        }
        Ok(UniverseEntry {
            ticker,
            sleeve,
            cluster: non_empty(self.cluster),
            super_cluster: non_empty(self.super_cluster),
            sector: non_empty(self.sector),
        })
    }
}

#[derive(Debug, Deserialize)]
struct UniverseFile {
    #[serde(default, rename = "instrument")]
    instruments: Vec<UniverseRow>,
}

/// Parse a universe CSV with columns
/// `ticker,sleeve,cluster,super_cluster,sector`.
pub fn parse_universe_csv(content: &str) -> Result<Vec<UniverseEntry>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut entries = Vec::new();
    for (i, row) in rdr.deserialize::<UniverseRow>().enumerate() {
        let row = row.with_context(|| format!("universe row {}", i + 1))?;
        entries.push(row.into_entry()?);
    }
    Ok(dedup_universe(entries))
}

/// Parse a universe TOML made of `[[instrument]]` tables.
pub fn parse_universe_toml(content: &str) -> Result<Vec<UniverseEntry>> {
    let file: UniverseFile = toml::from_str(content).context("failed to parse universe TOML")?;
    let entries = file
        .instruments
        .into_iter()
        .map(UniverseRow::into_entry)
        .collect::<Result<Vec<_>>>()?;
    Ok(dedup_universe(entries))
}

/// Load a universe file, picking the format from the extension.
pub fn load_universe(path: &Path) -> Result<Vec<UniverseEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read universe {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => parse_universe_toml(&content),
        _ => parse_universe_csv(&content),
    }
}

/// First occurrence of each ticker wins.
fn dedup_universe(entries: Vec<UniverseEntry>) -> Vec<UniverseEntry> {
    let mut seen = std::collections::BTreeSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.ticker.clone()))
        .collect()
}

// ─── Earnings calendar ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EarningsRow {
    ticker: String,
    date: NaiveDate,
    confidence: EarningsConfidence,
}

/// Known earnings dates per ticker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EarningsCalendar {
    events: BTreeMap<String, Vec<(NaiveDate, EarningsConfidence)>>,
}

impl EarningsCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: &str, date: NaiveDate, confidence: EarningsConfidence) {
        let events = self.events.entry(ticker.to_ascii_uppercase()).or_default();
        events.push((date, confidence));
        events.sort_by_key(|(d, _)| *d);
    }

    /// CSV with columns `ticker,date,confidence`.
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut calendar = Self::new();
        for (i, row) in rdr.deserialize::<EarningsRow>().enumerate() {
            let row = row.with_context(|| format!("earnings row {}", i + 1))?;
            calendar.insert(&row.ticker, row.date, row.confidence);
        }
        Ok(calendar)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read earnings calendar {}", path.display()))?;
        Self::from_csv(&content)
    }

    /// Next event on or after `today`; the latest past event when none is
    /// upcoming. `None` when the ticker has no entries at all.
    pub fn info_for(&self, ticker: &str, today: NaiveDate) -> Option<EarningsInfo> {
        let events = self.events.get(&ticker.to_ascii_uppercase())?;
        let (date, confidence) = events
            .iter()
            .find(|(d, _)| *d >= today)
            .or_else(|| events.last())?;
        Some(EarningsInfo::in_days((*date - today).num_days(), *confidence))
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ─── Offline bars ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BarRow {
    ticker: String,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// Long-format bar CSV (`ticker,date,open,high,low,close,volume`) into an
/// in-memory provider.
pub fn parse_bars_csv(content: &str) -> Result<InMemoryProvider> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut by_ticker: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for (i, row) in rdr.deserialize::<BarRow>().enumerate() {
        let row = row.with_context(|| format!("bar row {}", i + 1))?;
        by_ticker
            .entry(row.ticker.trim().to_ascii_uppercase())
            .or_default()
            .push(Bar {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
    }
    let mut provider = InMemoryProvider::new();
    for (ticker, bars) in by_ticker {
        provider.insert(&ticker, bars);
    }
    Ok(provider)
}

pub fn load_bars_csv(path: &Path) -> Result<InMemoryProvider> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bars {}", path.display()))?;
    parse_bars_csv(&content)
}
