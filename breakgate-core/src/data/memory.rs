use super::provider::{DataError, MarketDataProvider, Quote};
use crate::domain::Bar;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Provider backed by bars already in memory (CSV imports, fixtures).
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    bars: HashMap<String, Vec<Bar>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: impl Into<String>, bars: Vec<Bar>) {
        self.bars
            .insert(ticker.into(), super::normalize_bars(bars));
    }

    pub fn with(mut self, ticker: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(ticker, bars);
        self
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.bars.keys().map(String::as_str)
    }

    fn series(&self, ticker: &str) -> Result<&[Bar], DataError> {
        self.bars
            .get(ticker)
            .map(Vec::as_slice)
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            })
    }
}

impl MarketDataProvider for InMemoryProvider {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, DataError> {
        let bars: Vec<Bar> = self
            .series(ticker)?
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .cloned()
            .collect();
        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        Ok(bars)
    }

    fn latest_quote(&self, ticker: &str) -> Result<Quote, DataError> {
        let last = self
            .series(ticker)?
            .last()
            .ok_or_else(|| DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            })?;
        Ok(Quote {
            ticker: ticker.to_string(),
            price: last.close,
            date: last.date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn fetch_filters_by_range_and_quotes_last_close() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let first = bars[0].date;
        let p = InMemoryProvider::new().with("SPY", bars);
        assert_eq!(p.fetch_bars("SPY", first, first).unwrap().len(), 1);
        assert_eq!(p.latest_quote("SPY").unwrap().price, 12.0);
        assert!(matches!(
            p.fetch_bars("QQQ", first, first),
            Err(DataError::SymbolNotFound { .. })
        ));
    }
}
