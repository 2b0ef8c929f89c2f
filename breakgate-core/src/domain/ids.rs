use serde::{Deserialize, Serialize};
use std::fmt;

/// Position ID (assigned by the position store)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionId(pub String);

impl PositionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Deterministic id from ticker + entry date, used when importing
    /// broker snapshots that carry no id of their own.
    pub fn derive(ticker: &str, entry_date: chrono::NaiveDate) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(ticker.as_bytes());
        hasher.update(entry_date.to_string().as_bytes());
        let hex = hasher.finalize().to_hex();
        Self(format!("{ticker}-{}", &hex[..10]))
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PositionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn derived_id_is_deterministic() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(PositionId::derive("AAPL", d), PositionId::derive("AAPL", d));
        assert_ne!(
            PositionId::derive("AAPL", d),
            PositionId::derive("AAPL", d.succ_opt().unwrap())
        );
    }
}
