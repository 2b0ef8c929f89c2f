//! Scan configuration, loaded from TOML.

use breakgate_core::gates::GateRegistry;
use breakgate_core::risk::{RiskProfile, UnknownPreset};
use breakgate_core::scoring::ScoreThresholds;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    UnknownPreset(#[from] UnknownPreset),

    #[error("unknown gate name(s): {0}")]
    UnknownGate(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub primary: String,
    pub secondary: Option<String>,
    /// Volatility index symbol; its last close feeds the regime detector.
    pub vol_index: Option<String>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            primary: "SPY".into(),
            secondary: Some("QQQ".into()),
            vol_index: Some("^VIX".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub deadline_secs: u64,
    /// Calendar days of history requested per ticker.
    pub history_days: i64,
    /// Bars whose last date is older than this are treated as missing.
    pub max_data_age_days: i64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            batch_size: 8,
            batch_delay_ms: 250,
            deadline_secs: 120,
            history_days: 400,
            max_data_age_days: breakgate_core::regime::MAX_DATA_AGE_DAYS,
        }
    }
}

impl FetchSettings {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Scan reports younger than this are reused.
    pub scan_ttl_secs: u64,
    /// Correlation tables older than this are ignored by the gate.
    pub correlation_max_age_days: i64,
    pub dir: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            scan_ttl_secs: 300,
            correlation_max_age_days: 7,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    /// When set, only these gates run.
    pub enabled: Option<Vec<String>>,
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreadthSettings {
    pub sample_size: usize,
    pub seed: u64,
}

impl Default for BreadthSettings {
    fn default() -> Self {
        Self {
            sample_size: 30,
            seed: 42,
        }
    }
}

/// Everything a scan needs besides market data and positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Named preset: conservative, balanced or aggressive.
    pub profile: String,
    /// Explicit profile; overrides `profile` when present.
    pub risk: Option<RiskProfile>,
    pub benchmarks: BenchmarkConfig,
    /// Anti-chase only runs on this weekday.
    pub execution_weekday: Weekday,
    pub fetch: FetchSettings,
    pub cache: CacheSettings,
    pub gates: GateSettings,
    pub breadth: BreadthSettings,
    pub thresholds: ScoreThresholds,
    /// Scan worker threads; 0 uses the rayon default.
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            profile: "balanced".into(),
            risk: None,
            benchmarks: BenchmarkConfig::default(),
            execution_weekday: Weekday::Mon,
            fetch: FetchSettings::default(),
            cache: CacheSettings::default(),
            gates: GateSettings::default(),
            breadth: BreadthSettings::default(),
            thresholds: ScoreThresholds::default(),
            workers: 0,
        }
    }
}

impl ScanConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.batch_size == 0 {
            return Err(ConfigError::Invalid("fetch.batch_size must be > 0".into()));
        }
        if self.fetch.history_days < 260 {
            return Err(ConfigError::Invalid(
                "fetch.history_days must cover at least 260 days".into(),
            ));
        }
        if self.fetch.max_data_age_days < 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_data_age_days must not be negative".into(),
            ));
        }
        if self.benchmarks.primary.trim().is_empty() {
            return Err(ConfigError::Invalid("benchmarks.primary is empty".into()));
        }
        let profile = self.risk_profile()?;
        if profile.risk_per_trade_pct <= 0.0 || profile.max_open_risk_pct <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "profile '{}' must have positive risk limits",
                profile.name
            )));
        }
        Ok(())
    }

    pub fn risk_profile(&self) -> Result<RiskProfile, ConfigError> {
        match &self.risk {
            Some(profile) => Ok(profile.clone()),
            None => Ok(RiskProfile::preset(&self.profile)?),
        }
    }

    /// Standard gate stack with the configured enable/disable lists applied.
    pub fn gate_registry(&self) -> Result<GateRegistry, ConfigError> {
        let mut registry = GateRegistry::standard();
        let mut unknown: Vec<String> = Vec::new();
        if let Some(enabled) = &self.gates.enabled {
            let names: Vec<&str> = enabled.iter().map(String::as_str).collect();
            unknown.extend(registry.enable_only(&names).into_iter().map(String::from));
        }
        for name in &self.gates.disabled {
            if !registry.disable(name) {
                unknown.push(name.clone());
            }
        }
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownGate(unknown.join(", ")));
        }
        Ok(registry)
    }
}
