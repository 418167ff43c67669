//! aitap: the response cache behind the AI-TAP personal assistant.
//!
//! Repeated questions are answered from a bounded, expiring cache instead of
//! another completion round-trip, and the cache survives restarts through a
//! JSON snapshot on a pluggable storage surface.
//!
//! ```rust
//! use std::sync::Arc;
//! use aitap::cache::{MemoryStorage, ResponseCache};
//! use aitap::config::CacheConfig;
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let mut cache = ResponseCache::new(&CacheConfig::default()).with_storage(storage.clone());
//! cache.set_cache("What is Rust?", "en", "A systems programming language.");
//! assert_eq!(
//!     cache.get_cache("what is rust?", "en").as_deref(),
//!     Some("A systems programming language.")
//! );
//! cache.save_to_storage();
//!
//! let mut restored = ResponseCache::new(&CacheConfig::default()).with_storage(storage);
//! restored.load_from_storage();
//! assert_eq!(restored.len(), 1);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod providers;

pub use cache::{ResponseCache, SharedCache};
pub use config::{CacheConfig, Config};
pub use error::{Result, TapError};
pub use providers::{CachedGenerator, Generator};
