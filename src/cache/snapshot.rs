//! Persisted image of the response cache.
//!
//! Wire shape (JSON):
//!
//! ```json
//! {
//!   "cache": [["ru_1n1e4y", {"response": "...", "timestamp": 1700000000000, "hits": 3}]],
//!   "popularQueries": [["ru_hello", 2]],
//!   "timestamp": 1700000000000
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::response_cache::CacheEntry;

/// Full serializable image of both cache tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub cache: Vec<(String, CacheEntry)>,
    pub popular_queries: Vec<(String, u64)>,
    /// Milliseconds since the epoch at save time.
    pub timestamp: i64,
}

/// Outcome of decoding a stored payload.
#[derive(Debug)]
pub enum Decoded {
    Valid(Snapshot),
    /// Parsed as JSON but not shaped like a snapshot.
    Invalid(&'static str),
    /// Not JSON at all.
    Corrupt(serde_json::Error),
}

/// Decode a stored payload.
///
/// A non-numeric or out-of-range `timestamp`, or a `cache`/`popularQueries`
/// field that is not an array, makes the payload `Invalid`. An array whose
/// items do not parse decodes as an empty table.
pub fn decode(raw: &str) -> Decoded {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => return Decoded::Corrupt(e),
    };
    let Some(obj) = value.as_object() else {
        return Decoded::Invalid("payload is not an object");
    };
    let Some(timestamp) = obj.get("timestamp").and_then(epoch_millis) else {
        return Decoded::Invalid("timestamp is missing, not a number or out of range");
    };
    let Some(cache) = obj.get("cache").filter(|v| v.is_array()) else {
        return Decoded::Invalid("cache is not an array");
    };
    let Some(popular) = obj.get("popularQueries").filter(|v| v.is_array()) else {
        return Decoded::Invalid("popularQueries is not an array");
    };

    let cache = Vec::<(String, CacheEntry)>::deserialize(cache).unwrap_or_else(|e| {
        warn!(error = %e, "Snapshot cache list is malformed, using an empty table");
        Vec::new()
    });
    let popular_queries = Vec::<(String, u64)>::deserialize(popular).unwrap_or_else(|e| {
        warn!(error = %e, "Snapshot popularQueries list is malformed, using an empty table");
        Vec::new()
    });

    Decoded::Valid(Snapshot {
        cache,
        popular_queries,
        timestamp,
    })
}

/// Integral or finite in-range float milliseconds; anything else is rejected.
fn epoch_millis(value: &Value) -> Option<i64> {
    if let Some(ms) = value.as_i64() {
        return Some(ms);
    }
    let ms = value.as_f64()?;
    (ms.is_finite() && ms >= i64::MIN as f64 && ms < i64::MAX as f64).then_some(ms as i64)
}
