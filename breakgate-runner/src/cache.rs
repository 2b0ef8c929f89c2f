//! TTL-bounded caches keyed by BLAKE3 digests of their inputs.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Content-addressed key: BLAKE3 over the JSON encoding of `value`.
pub fn cache_key<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value).context("Failed to encode cache key input")?;
    Ok(blake3::hash(&json).to_hex().to_string())
}

/// In-process cache whose entries expire `ttl` after insertion.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some((at, value)) if at.elapsed() < self.ttl => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), (Instant::now(), value));
    }

    /// Drop expired entries; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, (at, _)| at.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    stored_at: u64,
    value: T,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// On-disk JSON cache for scan reports, so repeated CLI invocations within
/// the TTL reuse the previous result.
#[derive(Debug, Clone)]
pub struct ReportCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl ReportCache {
    /// The directory is created if it doesn't exist.
    pub fn new(cache_dir: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;
        Ok(Self { cache_dir, ttl })
    }

    /// Cached value for `key`, or `None` when missing or expired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path).context("Failed to read cached report")?;
        let envelope: Envelope<T> =
            serde_json::from_str(&json).context("Failed to deserialize cached report")?;
        if unix_now().saturating_sub(envelope.stored_at) >= self.ttl.as_secs() {
            tracing::debug!(key, "cached report expired");
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let envelope = Envelope {
            stored_at: unix_now(),
            value,
        };
        let json = serde_json::to_string_pretty(&envelope).context("Failed to serialize report")?;
        std::fs::write(self.path(key), json).context("Failed to write cached report")?;
        Ok(())
    }

    /// Remove expired reports; returns how many were deleted.
    pub fn purge_expired(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let expired = std::fs::read_to_string(&path)
                .ok()
                .and_then(|json| serde_json::from_str::<Envelope<serde_json::Value>>(&json).ok())
                .map(|e| unix_now().saturating_sub(e.stored_at) >= self.ttl.as_secs())
                .unwrap_or(true);
            if expired {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{key}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_and_input_sensitive() {
        let a = cache_key(&("scan", 2024, vec!["SPY", "QQQ"])).unwrap();
        let b = cache_key(&("scan", 2024, vec!["SPY", "QQQ"])).unwrap();
        let c = cache_key(&("scan", 2025, vec!["SPY", "QQQ"])).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn ttl_cache_expires() {
        let cache = TtlCache::new(Duration::from_secs(60));
        cache.insert("k", 7);
        assert_eq!(cache.get("k"), Some(7));

        let expired = TtlCache::new(Duration::ZERO);
        expired.insert("k", 7);
        assert_eq!(expired.get("k"), None);
        expired.insert("j", 8);
        assert_eq!(expired.purge_expired(), 1);
        assert!(expired.is_empty());
    }

    #[test]
    fn report_cache_roundtrip_and_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ReportCache::new(dir.path(), Duration::from_secs(300)).unwrap();
        assert_eq!(cache.get::<Vec<u32>>("abc").unwrap(), None);
        cache.put("abc", &vec![1u32, 2, 3]).unwrap();
        assert_eq!(cache.get::<Vec<u32>>("abc").unwrap(), Some(vec![1, 2, 3]));

        let stale = ReportCache::new(dir.path(), Duration::ZERO).unwrap();
        assert_eq!(stale.get::<Vec<u32>>("abc").unwrap(), None);
        assert_eq!(stale.purge_expired().unwrap(), 1);
    }
}
