//! BreakGate Core: the breakout decision and risk-gate engine.
//!
//! - Domain types (bars, candidates, positions, sleeves)
//! - Indicator library (ATR, ADX/DI, moving averages, levels, Hurst, correlation)
//! - Regime detection with stability confirmation
//! - Breakout scoring (BQS / FWS / NCS)
//! - Gate stack and classifier
//! - Monotonic stop state machine
//! - Risk budget ledger and position sizing
//! - Market data provider trait, HTTP provider and circuit breaker

pub mod classifier;
pub mod data;
pub mod domain;
pub mod gates;
pub mod indicators;
pub mod regime;
pub mod risk;
pub mod rng;
pub mod scoring;
pub mod stops;
