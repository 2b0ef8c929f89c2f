//! Position store: the persistence seam and an in-memory implementation
//! that snapshots to JSON.

use breakgate_core::domain::{
    Position, PositionError, PositionExit, PositionId, Sleeve,
};
use breakgate_core::stops::ProtectionLevel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("position {0} not found")]
    NotFound(PositionId),

    #[error("position {0} already exists")]
    Duplicate(PositionId),

    #[error("stop for {id} changed concurrently: expected {expected}, found {found}")]
    Conflict {
        id: PositionId,
        expected: f64,
        found: f64,
    },

    #[error("store I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store serialization: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid position row {row}: {message}")]
    Import { row: usize, message: String },

    #[error(transparent)]
    Domain(#[from] PositionError),
}

/// Persistence for positions and account equity.
///
/// `compare_and_set_stop` is the only way stop fields reach storage: the
/// write succeeds only if the stored stop still equals `expected_stop`.
pub trait PositionStore: Send + Sync {
    fn open_positions(&self) -> Result<Vec<Position>, StoreError>;

    fn closed_positions(&self) -> Result<Vec<Position>, StoreError>;

    fn get(&self, id: &PositionId) -> Result<Position, StoreError>;

    fn equity(&self) -> Result<f64, StoreError>;

    fn insert(&self, position: Position) -> Result<(), StoreError>;

    fn compare_and_set_stop(
        &self,
        id: &PositionId,
        expected_stop: f64,
        updated: &Position,
    ) -> Result<(), StoreError>;

    /// OPEN -> CLOSED. Closing twice is a domain error.
    fn close(&self, id: &PositionId, exit: PositionExit) -> Result<Position, StoreError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    equity: f64,
    positions: Vec<Position>,
}

#[derive(Debug, Default)]
struct State {
    equity: f64,
    positions: BTreeMap<PositionId, Position>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new(equity: f64) -> Self {
        Self {
            state: RwLock::new(State {
                equity,
                positions: BTreeMap::new(),
            }),
        }
    }

    pub fn with_positions(
        equity: f64,
        positions: impl IntoIterator<Item = Position>,
    ) -> Result<Self, StoreError> {
        let store = Self::new(equity);
        for p in positions {
            store.insert(p)?;
        }
        Ok(store)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_equity(&self, equity: f64) {
        self.write().equity = equity;
    }

    pub fn len(&self) -> usize {
        self.read().positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().positions.is_empty()
    }

    // ─── JSON snapshot ──────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, StoreError> {
        let state = self.read();
        let snapshot = Snapshot {
            equity: state.equity,
            positions: state.positions.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        Self::with_positions(snapshot.equity, snapshot.positions)
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    // ─── CSV import ─────────────────────────────────────────────────

    /// Import open positions from a broker-style CSV. Rows without an id get
    /// one derived from ticker and entry date; persisted stops are restored
    /// as-is.
    pub fn import_csv(&self, content: &str) -> Result<usize, StoreError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut imported = 0;
        for (i, row) in rdr.deserialize::<PositionRow>().enumerate() {
            let row_no = i + 1;
            let row = row.map_err(|e| StoreError::Import {
                row: row_no,
                message: e.to_string(),
            })?;
            let position = row.into_position().map_err(|message| StoreError::Import {
                row: row_no,
                message,
            })?;
            self.insert(position)?;
            imported += 1;
        }
        tracing::info!(imported, "positions imported");
        Ok(imported)
    }
}

#[derive(Debug, Deserialize)]
struct PositionRow {
    #[serde(default)]
    id: Option<String>,
    ticker: String,
    sleeve: String,
    #[serde(default)]
    cluster: Option<String>,
    #[serde(default)]
    super_cluster: Option<String>,
    entry_price: f64,
    entry_date: NaiveDate,
    shares: u64,
    initial_stop: f64,
    #[serde(default)]
    current_stop: Option<f64>,
    #[serde(default)]
    protection_level: Option<ProtectionLevel>,
    #[serde(default)]
    adds_taken: Option<u32>,
}

impl PositionRow {
    fn into_position(self) -> Result<Position, String> {
        let sleeve: Sleeve = self.sleeve.parse()?;
        let ticker = self.ticker.to_ascii_uppercase();
        let id = match self.id.filter(|s| !s.is_empty()) {
            Some(id) => PositionId::new(id),
            None => PositionId::derive(&ticker, self.entry_date),
        };
        let mut position = Position::open(
            id,
            ticker,
            sleeve,
            self.entry_price,
            self.entry_date,
            self.shares,
            self.initial_stop,
        )
        .map_err(|e| e.to_string())?
        .with_adds_taken(self.adds_taken.unwrap_or(0));
        position.cluster = self.cluster.filter(|s| !s.is_empty());
        position.super_cluster = self.super_cluster.filter(|s| !s.is_empty());
        if self.current_stop.is_some() || self.protection_level.is_some() {
            position = position
                .with_persisted_stop(
                    self.current_stop.unwrap_or(self.initial_stop),
                    self.protection_level.unwrap_or_default(),
                )
                .map_err(|e| e.to_string())?;
        }
        Ok(position)
    }
}

impl PositionStore for InMemoryStore {
    fn open_positions(&self) -> Result<Vec<Position>, StoreError> {
        Ok(self
            .read()
            .positions
            .values()
            .filter(|p| p.is_open())
            .cloned()
            .collect())
    }

    fn closed_positions(&self) -> Result<Vec<Position>, StoreError> {
        Ok(self
            .read()
            .positions
            .values()
            .filter(|p| !p.is_open())
            .cloned()
            .collect())
    }

    fn get(&self, id: &PositionId) -> Result<Position, StoreError> {
        self.read()
            .positions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn equity(&self) -> Result<f64, StoreError> {
        Ok(self.read().equity)
    }

    fn insert(&self, position: Position) -> Result<(), StoreError> {
        let mut state = self.write();
        if state.positions.contains_key(&position.id) {
            return Err(StoreError::Duplicate(position.id));
        }
        state.positions.insert(position.id.clone(), position);
        Ok(())
    }

    fn compare_and_set_stop(
        &self,
        id: &PositionId,
        expected_stop: f64,
        updated: &Position,
    ) -> Result<(), StoreError> {
        let mut state = self.write();
        let stored = state
            .positions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let found = stored.current_stop();
        if found.to_bits() != expected_stop.to_bits() {
            return Err(StoreError::Conflict {
                id: id.clone(),
                expected: expected_stop,
                found,
            });
        }
        *stored = updated.clone();
        Ok(())
    }

    fn close(&self, id: &PositionId, exit: PositionExit) -> Result<Position, StoreError> {
        let mut state = self.write();
        let stored = state
            .positions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        stored.close(exit)?;
        Ok(stored.clone())
    }
}
