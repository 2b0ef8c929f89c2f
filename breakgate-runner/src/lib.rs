//! BreakGate Runner: scan orchestration and the services around it.
//!
//! This crate builds on `breakgate-core` to provide:
//! - TOML scan configuration with risk-profile presets
//! - Batched market-data fetch with a deadline
//! - Scan orchestration on a rayon pool, with a TTL result cache
//! - Offline correlation matrix
//! - Position store and the per-position-locked stop service
//! - Best-effort notification sinks

pub mod cache;
pub mod config;
pub mod correlation;
pub mod fetch;
pub mod notify;
pub mod scan;
pub mod stop_service;
pub mod store;
pub mod universe;

pub use cache::{cache_key, ReportCache, TtlCache};
pub use config::{ConfigError, ScanConfig};
pub use correlation::{compute_correlation_table, load_fresh_table, save_table, CORRELATION_WINDOW};
pub use fetch::{fetch_all, FetchOutcome};
pub use notify::{
    notify_best_effort, Alert, AlertKind, BackgroundSink, FanOutSink, JsonLinesSink, LogSink, MemorySink,
    NotificationSink, NotifyError,
};
pub use scan::{GateStats, PositionReview, RegimeSummary, ScanError, ScanInputs, ScanReport, Scanner};
pub use stop_service::{StopService, StopServiceError};
pub use store::{InMemoryStore, PositionStore, StoreError};
pub use universe::{load_bars_csv, load_universe, EarningsCalendar};
