//! Deterministic sampling RNG.
//!
//! A master seed is expanded into per-purpose sub-seeds with BLAKE3, so the
//! breadth sample for a given day is the same on every run and every thread.

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Seed that changes once per trading day.
    pub fn for_date(master_seed: u64, date: NaiveDate) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&master_seed.to_le_bytes());
        hasher.update(date.to_string().as_bytes());
        Self::new(first_u64(hasher.finalize().as_bytes()))
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a named purpose.
    pub fn sub_seed(&self, purpose: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(purpose.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        first_u64(hasher.finalize().as_bytes())
    }

    pub fn rng_for(&self, purpose: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(purpose, iteration))
    }

    pub fn breadth_rng(&self) -> StdRng {
        self.rng_for("breadth", 0)
    }
}

fn first_u64(bytes: &[u8; 32]) -> u64 {
    let mut head = [0u8; 8];
    head.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(head)
}
