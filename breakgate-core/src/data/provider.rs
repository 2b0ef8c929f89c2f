//! Market data provider trait and structured error types.
//!
//! The trait abstracts over data sources (Yahoo Finance, CSV files, fixtures)
//! so the scanner can swap implementations and mock for tests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Bar;

/// Per-ticker fetch failure. A scan degrades the affected candidate to
/// "data unavailable" and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("provider blocked (circuit breaker open, {remaining_secs}s left)")]
    CircuitBreakerTripped { remaining_secs: u64 },

    #[error("fetch deadline exceeded for {symbol}")]
    DeadlineExceeded { symbol: String },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Errors worth retrying at the provider boundary.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_) | DataError::RateLimited { .. } | DataError::Other(_)
        )
    }
}

/// Most recent trade price for a ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub price: f64,
    pub date: NaiveDate,
}

/// Source of daily bars and latest quotes.
///
/// Implementations return bars oldest-first, but callers still pass results
/// through `normalize_bars` before use.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Daily OHLCV bars for `ticker` over `[start, end]`.
    fn fetch_bars(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Result<Vec<Bar>, DataError>;

    /// Latest quote for `ticker`.
    fn latest_quote(&self, ticker: &str) -> Result<Quote, DataError>;

    /// False while the provider is rate-limited or blocked.
    fn is_available(&self) -> bool {
        true
    }
}
