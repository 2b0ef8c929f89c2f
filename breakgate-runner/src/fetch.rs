//! Batched market-data fetch with an overall deadline.
//!
//! Tickers are fetched in batches of bounded concurrency with a pause between
//! batches. A failed ticker never aborts the batch; tickers not started before
//! the deadline are reported as `DeadlineExceeded`. The deadline is checked
//! before every provider call, so a scan overruns it by at most one call,
//! which the provider's own request timeout bounds.

use crate::config::FetchSettings;
use breakgate_core::data::{normalize_bars, DataError, MarketDataProvider};
use breakgate_core::domain::Bar;
use chrono::{Duration as ChronoDuration, NaiveDate};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub bars: BTreeMap<String, Vec<Bar>>,
    pub failures: BTreeMap<String, DataError>,
    pub elapsed: Duration,
}

impl FetchOutcome {
    pub fn get(&self, ticker: &str) -> Option<&[Bar]> {
        self.bars.get(ticker).map(Vec::as_slice)
    }

    pub fn failure_reason(&self, ticker: &str) -> String {
        self.failures
            .get(ticker)
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no data".to_string())
    }
}

/// One provider call, skipped once the deadline has passed.
fn fetch_ticker(
    provider: &dyn MarketDataProvider,
    ticker: &str,
    start: NaiveDate,
    end: NaiveDate,
    started: Instant,
    deadline: Duration,
) -> (String, Result<Vec<Bar>, DataError>) {
    let symbol = ticker.to_string();
    if started.elapsed() >= deadline {
        return (symbol.clone(), Err(DataError::DeadlineExceeded { symbol }));
    }
    let result = provider
        .fetch_bars(ticker, start, end)
        .map(normalize_bars)
        .and_then(|bars| {
            if bars.is_empty() {
                Err(DataError::SymbolNotFound {
                    symbol: symbol.clone(),
                })
            } else {
                Ok(bars)
            }
        });
    (symbol, result)
}

/// Fetch daily history ending at `end` for every ticker in `tickers`.
pub fn fetch_all(
    provider: &dyn MarketDataProvider,
    tickers: &[String],
    end: NaiveDate,
    settings: &FetchSettings,
) -> FetchOutcome {
    let started = Instant::now();
    let deadline = settings.deadline();
    let start = end - ChronoDuration::days(settings.history_days);
    let mut outcome = FetchOutcome::default();

    let mut unique: Vec<&String> = tickers.iter().collect();
    unique.sort();
    unique.dedup();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.batch_size.max(1))
        .build()
        .map_err(|e| tracing::warn!(error = %e, "fetch pool unavailable, fetching serially"))
        .ok();

    let batches: Vec<&[&String]> = unique.chunks(settings.batch_size.max(1)).collect();
    let total = batches.len();
    for (i, batch) in batches.into_iter().enumerate() {
        if started.elapsed() >= deadline {
            tracing::warn!(remaining = batch.len(), "fetch deadline reached");
            for ticker in batch {
                outcome.failures.insert(
                    (*ticker).clone(),
                    DataError::DeadlineExceeded {
                        symbol: (*ticker).clone(),
                    },
                );
            }
            continue;
        }

        let fetch_one =
            |ticker: &&String| fetch_ticker(provider, ticker, start, end, started, deadline);
        let results: Vec<(String, Result<Vec<Bar>, DataError>)> = match &pool {
            Some(pool) => pool.install(|| batch.par_iter().map(fetch_one).collect()),
            None => batch.iter().map(fetch_one).collect(),
        };

        for (ticker, result) in results {
            match result {
                Ok(bars) => {
                    tracing::debug!(%ticker, bars = bars.len(), "fetched");
                    outcome.bars.insert(ticker, bars);
                }
                Err(e) => {
                    tracing::warn!(%ticker, error = %e, transient = e.is_transient(), "fetch failed");
                    outcome.failures.insert(ticker, e);
                }
            }
        }

        if i + 1 < total && !settings.batch_delay().is_zero() {
            std::thread::sleep(settings.batch_delay());
        }
    }

    outcome.elapsed = started.elapsed();
    tracing::info!(
        fetched = outcome.bars.len(),
        failed = outcome.failures.len(),
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "market data fetch complete"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use breakgate_core::data::{InMemoryProvider, Quote};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bars(n: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| Bar {
                date: start + ChronoDuration::days(i as i64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 100,
            })
            .collect()
    }

    fn settings() -> FetchSettings {
        FetchSettings {
            batch_size: 2,
            batch_delay_ms: 0,
            deadline_secs: 60,
            history_days: 400,
            ..Default::default()
        }
    }

    #[test]
    fn failures_do_not_abort_batch() {
        let provider = InMemoryProvider::new()
            .with("AAA", bars(30))
            .with("BBB", bars(30));
        let tickers = vec!["AAA".to_string(), "ZZZ".to_string(), "BBB".to_string()];
        let end = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let out = fetch_all(&provider, &tickers, end, &settings());
        assert_eq!(out.bars.len(), 2);
        assert!(matches!(
            out.failures.get("ZZZ"),
            Some(DataError::SymbolNotFound { .. })
        ));
    }

    struct SlowProvider {
        calls: AtomicUsize,
        delay: Duration,
    }

    impl MarketDataProvider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        fn fetch_bars(
            &self,
            _ticker: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<Bar>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            Ok(bars(5))
        }

        fn latest_quote(&self, ticker: &str) -> Result<Quote, DataError> {
            Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            })
        }
    }

    #[test]
    fn deadline_degrades_remaining_tickers() {
        let provider = SlowProvider {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(30),
        };
        let tickers: Vec<String> = (0..6).map(|i| format!("T{i}")).collect();
        let mut s = settings();
        s.deadline_secs = 0;
        let out = fetch_all(&provider, &tickers, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), &s);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(out.failures.len(), 6);
        assert!(out
            .failures
            .values()
            .all(|e| matches!(e, DataError::DeadlineExceeded { .. })));
    }

    #[test]
    fn call_started_after_deadline_is_skipped() {
        let provider = SlowProvider {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        };
        let day = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let deadline = Duration::from_millis(50);

        let (_, fresh) = fetch_ticker(&provider, "AAA", day, day, Instant::now(), deadline);
        assert!(fresh.is_ok());

        let late = Instant::now() - Duration::from_millis(100);
        let (symbol, skipped) = fetch_ticker(&provider, "BBB", day, day, late, deadline);
        assert_eq!(symbol, "BBB");
        assert!(matches!(skipped, Err(DataError::DeadlineExceeded { .. })));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
