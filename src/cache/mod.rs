//! Response caching with lazy TTL expiry, bulk eviction, popularity tracking
//! and JSON snapshot persistence.

pub mod autosave;
pub mod key;
pub mod response_cache;
pub mod snapshot;
pub mod storage;

pub use autosave::{spawn_autosave, SharedCache};
pub use key::generate_cache_key;
pub use response_cache::{
    CacheEntry, CacheStats, PopularQuery, ResponseCache, DEFAULT_POPULAR_LIMIT, STORAGE_KEY,
};
pub use snapshot::Snapshot;
pub use storage::{CacheStorage, FileStorage, MemoryStorage};
