//! Market data: provider trait, HTTP provider, circuit breaker, bar hygiene.

pub mod canonicalize;
pub mod circuit_breaker;
pub mod memory;
pub mod provider;
pub mod yahoo;

pub use canonicalize::normalize_bars;
pub use circuit_breaker::CircuitBreaker;
pub use memory::InMemoryProvider;
pub use provider::{DataError, MarketDataProvider, Quote};
pub use yahoo::YahooProvider;
