//! Offline pairwise correlation matrix, written as a dated JSON table the
//! correlation gate reads.

use anyhow::{Context, Result};
use breakgate_core::domain::Bar;
use breakgate_core::gates::CorrelationTable;
use breakgate_core::indicators::pair_correlation;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

/// Trailing daily returns each pair is computed over.
pub const CORRELATION_WINDOW: usize = 90;

/// Correlate every unordered ticker pair. O(n²) pairs, spread over rayon.
pub fn compute_correlation_table(
    bars: &BTreeMap<String, Vec<Bar>>,
    as_of: NaiveDate,
    window: usize,
) -> CorrelationTable {
    let tickers: Vec<&String> = bars.keys().collect();
    let pairs: Vec<(&String, &String)> = tickers
        .iter()
        .enumerate()
        .flat_map(|(i, a)| tickers[i + 1..].iter().map(move |b| (*a, *b)))
        .collect();

    let computed: Vec<_> = pairs
        .par_iter()
        .filter_map(|(a, b)| {
            let pc = pair_correlation(&bars[*a], &bars[*b], window)?;
            Some((a.as_str(), b.as_str(), pc))
        })
        .collect();

    let mut table = CorrelationTable::new(as_of, window);
    for (a, b, pc) in computed {
        table.insert(a, b, pc);
    }
    tracing::info!(
        tickers = tickers.len(),
        pairs = pairs.len(),
        computed = table.len(),
        %as_of,
        "correlation table built"
    );
    table
}

pub fn save_table(table: &CorrelationTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create correlation directory")?;
    }
    let json = serde_json::to_string_pretty(table).context("Failed to serialize correlations")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write correlations to {}", path.display()))?;
    Ok(())
}

/// Load a table, dropping it when older than `max_age_days` relative to
/// `today`. A stale or missing table means the gate has no verdict.
pub fn load_fresh_table(
    path: &Path,
    today: NaiveDate,
    max_age_days: i64,
) -> Result<Option<CorrelationTable>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read correlations from {}", path.display()))?;
    let table: CorrelationTable =
        serde_json::from_str(&json).context("Failed to deserialize correlations")?;
    if table.is_stale(today, max_age_days) {
        tracing::warn!(as_of = %table.as_of, %today, "correlation table is stale, ignoring");
        return Ok(None);
    }
    Ok(Some(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn series(start: NaiveDate, closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: start + Duration::days(i as i64),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1_000,
            })
            .collect()
    }

    fn wave(n: usize, phase: f64, scale: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + scale * ((i as f64) * 0.7 + phase).sin() + i as f64 * 0.05)
            .collect()
    }

    #[test]
    fn table_covers_every_pair_once() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars = BTreeMap::new();
        bars.insert("NVDA".to_string(), series(start, &wave(120, 0.0, 3.0)));
        bars.insert("AMD".to_string(), series(start, &wave(120, 0.0, 2.0)));
        bars.insert("XOM".to_string(), series(start, &wave(120, 2.5, 3.0)));

        let table = compute_correlation_table(&bars, start + Duration::days(120), 90);
        assert_eq!(table.len(), 3);
        let same = table.get("AMD", "NVDA").unwrap();
        assert!(same.r > 0.9, "r = {}", same.r);
        assert_eq!(same.observations, 90);
        assert_eq!(table.get("NVDA", "AMD"), table.get("AMD", "NVDA"));
    }

    #[test]
    fn stale_table_is_ignored_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corr").join("table.json");
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        save_table(&CorrelationTable::new(as_of, 90), &path).unwrap();

        let fresh = load_fresh_table(&path, as_of + Duration::days(7), 7).unwrap();
        assert!(fresh.is_some());
        let stale = load_fresh_table(&path, as_of + Duration::days(8), 7).unwrap();
        assert!(stale.is_none());
        let missing = load_fresh_table(&dir.path().join("nope.json"), as_of, 7).unwrap();
        assert!(missing.is_none());
    }
}
