//! Caching decorator for [`Generator`]s.
//!
//! `CachedGenerator` answers from the shared [`ResponseCache`] when it can and
//! only forwards misses to the inner generator. Successful responses are
//! written back; failures pass through untouched and are never cached.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Generator;
use crate::cache::SharedCache;
use crate::error::Result;

/// A [`Generator`] that consults a shared response cache first.
pub struct CachedGenerator<G> {
    inner: G,
    cache: SharedCache,
}

impl<G: Generator> CachedGenerator<G> {
    pub fn new(inner: G, cache: SharedCache) -> Self {
        Self { inner, cache }
    }

    /// The shared cache, e.g. for stats or autosave.
    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    fn lookup(&self, message: &str, language: &str) -> Option<String> {
        match self.cache.lock() {
            Ok(mut cache) => cache.get_cache(message, language),
            Err(_) => {
                warn!("Cache lock poisoned, bypassing cache");
                None
            }
        }
    }

    fn store(&self, message: &str, language: &str, response: &str) {
        match self.cache.lock() {
            Ok(mut cache) => cache.set_cache(message, language, response),
            Err(_) => warn!("Cache lock poisoned, response not cached"),
        }
    }
}

impl<G> std::fmt::Debug for CachedGenerator<G>
where
    G: Generator,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedGenerator")
            .field("inner", &self.inner.name())
            .finish()
    }
}

#[async_trait]
impl<G: Generator> Generator for CachedGenerator<G> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, message: &str, language: &str) -> Result<String> {
        // The lock is released before awaiting the inner generator.
        if let Some(hit) = self.lookup(message, language) {
            debug!(provider = self.inner.name(), language, "Response cache hit");
            return Ok(hit);
        }
        let response = self.inner.generate(message, language).await?;
        self.store(message, language, &response);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::config::CacheConfig;
    use crate::error::TapError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Counts calls and echoes the message, or fails when `fail` is set.
    struct CountingGenerator {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Generator for CountingGenerator {
        fn name(&self) -> &str {
            "counting"
        }

        async fn generate(&self, message: &str, language: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TapError::Provider("upstream unavailable".into()));
            }
            Ok(format!("[{language}] {message}"))
        }
    }

    fn setup(fail: bool) -> (CachedGenerator<CountingGenerator>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(Mutex::new(ResponseCache::new(&CacheConfig::default())));
        let generator = CachedGenerator::new(
            CountingGenerator {
                calls: calls.clone(),
                fail,
            },
            cache,
        );
        (generator, calls)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (generator, calls) = setup(false);
        let first = generator.generate("Hello", "en").await.unwrap();
        let second = generator.generate("  hello", "en").await.unwrap();
        assert_eq!(first, "[en] Hello");
        assert_eq!(second, first, "normalized repeat is served from cache");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(generator.cache().lock().unwrap().get_cache_stats().total_hits, 2);
    }

    #[tokio::test]
    async fn test_language_is_part_of_key() {
        let (generator, calls) = setup(false);
        generator.generate("hello", "en").await.unwrap();
        generator.generate("hello", "ru").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let (generator, calls) = setup(true);
        let err = generator.generate("hello", "en").await.unwrap_err();
        assert!(matches!(err, TapError::Provider(_)));
        assert!(generator.generate("hello", "en").await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(generator.cache().lock().unwrap().is_empty());
    }

    #[test]
    fn test_debug_shows_inner_name() {
        let (generator, _) = setup(false);
        assert!(format!("{generator:?}").contains("counting"));
    }
}
