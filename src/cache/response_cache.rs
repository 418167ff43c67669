//! Assistant response cache with lazy TTL expiry, bulk eviction, popularity
//! tracking and snapshot persistence.
//!
//! Entries are keyed by `(language, normalized message)` (see [`super::key`]).
//! A write that pushes the table past `max_entries` evicts the oldest 20% of
//! entries by write time. Reads never refresh the write time, they only bump
//! the entry's hit counter.
//!
//! The whole state is persisted as one JSON snapshot under [`STORAGE_KEY`]
//! through an injected [`CacheStorage`]. Storage and parse faults are logged
//! and never surface to the caller.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::key::{generate_cache_key, popularity_key};
use super::snapshot::{self, Decoded, Snapshot};
use super::storage::CacheStorage;
use crate::config::CacheConfig;

/// Storage key the snapshot lives under.
pub const STORAGE_KEY: &str = "ai-tap-cache";
/// Serialized snapshots above this size trigger one eviction before saving.
pub const MAX_SNAPSHOT_BYTES: usize = 5 * 1024 * 1024;
/// Snapshots older than this are discarded on load: 7 days.
pub const SNAPSHOT_MAX_AGE_MS: i64 = 7 * 24 * 60 * 60 * 1000;
/// Fraction of `max_entries` removed per eviction sweep.
const EVICTION_RATIO: f64 = 0.2;
/// Entries reported by [`ResponseCache::get_cache_stats`].
const STATS_POPULAR_LIMIT: usize = 5;
/// Default `limit` for [`ResponseCache::get_popular_queries`].
pub const DEFAULT_POPULAR_LIMIT: usize = 10;

/// A single cached response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The generated response text.
    pub response: String,
    /// Milliseconds since the epoch when the entry was written.
    pub timestamp: i64,
    /// 1 on write, +1 per successful read.
    pub hits: u64,
}

/// One row of the popularity report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularQuery {
    /// `"{language}_{lowercased message}"`.
    pub query: String,
    pub hits: u64,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    /// Sum of `hits` across live entries.
    pub total_hits: u64,
    /// `total_hits / total_entries`, rounded to 2 decimals; 0 when empty.
    pub average_hits: f64,
    /// Top 5 popular queries.
    pub popular_queries: Vec<PopularQuery>,
}

/// Bounded, expiring, popularity-tracking response cache.
pub struct ResponseCache {
    entries: IndexMap<String, CacheEntry>,
    popular: IndexMap<String, u64>,
    max_entries: usize,
    expiry_ms: i64,
    storage: Option<Arc<dyn CacheStorage>>,
}

impl ResponseCache {
    /// Create an empty cache with no storage attached.
    ///
    /// `max_entries` is clamped to a minimum of 1.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: IndexMap::new(),
            popular: IndexMap::new(),
            max_entries: config.max_entries.max(1),
            expiry_ms: config.expiry_ms,
            storage: None,
        }
    }

    /// Attach the durable surface used by save/load.
    pub fn with_storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Look up a cached response. Returns `None` if absent or expired.
    ///
    /// An expired entry is removed on discovery. A hit increments the
    /// entry's hit counter.
    pub fn get_cache(&mut self, message: &str, language: &str) -> Option<String> {
        if message.is_empty() {
            return None;
        }
        let key = generate_cache_key(message, language);
        let now = now_millis();
        let expired = now.saturating_sub(self.entries.get(&key)?.timestamp) > self.expiry_ms;
        if expired {
            debug!(key = %key, "Cache entry expired, removing");
            self.entries.shift_remove(&key);
            return None;
        }
        let entry = self.entries.get_mut(&key)?;
        entry.hits = entry.hits.saturating_add(1);
        Some(entry.response.clone())
    }

    /// Store a response. Empty messages or responses are ignored.
    ///
    /// Overwrites any existing entry for the same key (hit count resets to 1)
    /// and bumps the popularity counter for the raw query.
    pub fn set_cache(&mut self, message: &str, language: &str, response: &str) {
        if message.is_empty() || response.is_empty() {
            return;
        }
        let key = generate_cache_key(message, language);
        self.entries.insert(
            key,
            CacheEntry {
                response: response.to_string(),
                timestamp: now_millis(),
                hits: 1,
            },
        );
        *self
            .popular
            .entry(popularity_key(message, language))
            .or_insert(0) += 1;

        if self.entries.len() > self.max_entries {
            self.cleanup_cache();
        }
    }

    /// Evict the oldest `floor(max_entries * 0.2)` entries by write time
    /// (at least one). Equal timestamps go in table order.
    pub fn cleanup_cache(&mut self) {
        let purge = ((self.max_entries as f64 * EVICTION_RATIO).floor() as usize).max(1);
        let mut by_age: Vec<(&String, i64)> = self
            .entries
            .iter()
            .map(|(k, e)| (k, e.timestamp))
            .collect();
        by_age.sort_by_key(|&(_, ts)| ts);
        let doomed: HashSet<String> = by_age
            .into_iter()
            .take(purge)
            .map(|(k, _)| k.clone())
            .collect();
        if doomed.is_empty() {
            return;
        }
        self.entries.retain(|k, _| !doomed.contains(k));
        debug!(
            evicted = doomed.len(),
            remaining = self.entries.len(),
            "Evicted oldest cache entries"
        );
    }

    /// Popular queries by descending count; ties keep table order.
    pub fn get_popular_queries(&self, limit: usize) -> Vec<PopularQuery> {
        let mut rows: Vec<(&String, u64)> = self.popular.iter().map(|(q, n)| (q, *n)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1));
        rows.into_iter()
            .take(limit)
            .map(|(query, hits)| PopularQuery {
                query: query.clone(),
                hits,
            })
            .collect()
    }

    /// Aggregate statistics over live entries.
    pub fn get_cache_stats(&self) -> CacheStats {
        let total_entries = self.entries.len();
        let total_hits: u64 = self.entries.values().map(|e| e.hits).sum();
        let average_hits = if total_entries == 0 {
            0.0
        } else {
            (total_hits as f64 / total_entries as f64 * 100.0).round() / 100.0
        };
        CacheStats {
            total_entries,
            total_hits,
            average_hits,
            popular_queries: self.get_popular_queries(STATS_POPULAR_LIMIT),
        }
    }

    /// Empty both the entry table and the popularity table.
    pub fn clear_cache(&mut self) {
        self.entries.clear();
        self.popular.clear();
    }

    /// Number of entries currently in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the entry table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Popularity count for `(message, language)`, 0 if never written.
    pub fn popularity(&self, message: &str, language: &str) -> u64 {
        self.popular
            .get(&popularity_key(message, language))
            .copied()
            .unwrap_or(0)
    }

    /// Image of both tables stamped with the current time.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cache: self
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect(),
            popular_queries: self.popular.iter().map(|(k, n)| (k.clone(), *n)).collect(),
            timestamp: now_millis(),
        }
    }

    /// Persist the snapshot to the attached storage.
    ///
    /// Skips silently without storage. An oversized snapshot triggers one
    /// eviction sweep before writing. A quota failure clears the in-memory
    /// cache; any other failure is logged.
    pub fn save_to_storage(&mut self) {
        let Some(storage) = self.storage.clone() else {
            debug!("No cache storage attached, skipping save");
            return;
        };

        let Some(mut payload) = self.encode_snapshot() else {
            return;
        };
        if payload.len() > MAX_SNAPSHOT_BYTES {
            warn!(
                bytes = payload.len(),
                limit = MAX_SNAPSHOT_BYTES,
                "Cache snapshot too large, evicting before save"
            );
            self.cleanup_cache();
            let Some(retry) = self.encode_snapshot() else {
                return;
            };
            payload = retry;
        }

        match storage.set_item(STORAGE_KEY, &payload) {
            Ok(()) => debug!(
                storage = storage.name(),
                entries = self.entries.len(),
                bytes = payload.len(),
                "Saved cache snapshot"
            ),
            Err(e) if e.is_quota_exceeded() => {
                warn!(storage = storage.name(), error = %e, "Cache storage full, clearing cache");
                self.clear_cache();
            }
            Err(e) => warn!(storage = storage.name(), error = %e, "Failed to save cache snapshot"),
        }
    }

    /// Rehydrate both tables from the attached storage.
    ///
    /// Missing, invalid or stale (older than 7 days) snapshots leave the
    /// tables untouched. Stale and corrupt snapshots are removed from storage.
    pub fn load_from_storage(&mut self) {
        let Some(storage) = self.storage.clone() else {
            debug!("No cache storage attached, skipping load");
            return;
        };

        let raw = match storage.get_item(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!(storage = storage.name(), error = %e, "Failed to read cache snapshot");
                return;
            }
        };

        let snap = match snapshot::decode(&raw) {
            Decoded::Valid(snap) => snap,
            Decoded::Invalid(reason) => {
                warn!(reason, "Ignoring malformed cache snapshot");
                return;
            }
            Decoded::Corrupt(e) => {
                warn!(error = %e, "Cache snapshot is corrupt, removing");
                if let Err(e) = storage.remove_item(STORAGE_KEY) {
                    warn!(error = %e, "Failed to remove corrupt cache snapshot");
                }
                return;
            }
        };

        let age_ms = now_millis().saturating_sub(snap.timestamp);
        if age_ms > SNAPSHOT_MAX_AGE_MS {
            info!(age_ms, "Cache snapshot is stale, discarding");
            if let Err(e) = storage.remove_item(STORAGE_KEY) {
                warn!(error = %e, "Failed to remove stale cache snapshot");
            }
            return;
        }

        self.entries = snap.cache.into_iter().collect();
        self.popular = snap.popular_queries.into_iter().collect();
        info!(
            entries = self.entries.len(),
            queries = self.popular.len(),
            "Loaded cache snapshot"
        );
    }

    fn encode_snapshot(&self) -> Option<String> {
        match serde_json::to_string(&self.snapshot()) {
            Ok(payload) => Some(payload),
            Err(e) => {
                warn!(error = %e, "Failed to serialize cache snapshot");
                None
            }
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
