//! File-backed persistence of the response cache across instances.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use aitap::cache::{
    spawn_autosave, CacheStorage, FileStorage, ResponseCache, Snapshot, STORAGE_KEY,
};
use aitap::config::CacheConfig;
use tempfile::TempDir;

fn config() -> CacheConfig {
    CacheConfig {
        max_entries: 50,
        ..CacheConfig::default()
    }
}

fn file_cache(dir: &TempDir) -> ResponseCache {
    ResponseCache::new(&config()).with_storage(Arc::new(FileStorage::new(dir.path())))
}

#[test]
fn test_roundtrip_through_file_storage() {
    let dir = TempDir::new().unwrap();
    let mut cache = file_cache(&dir);
    cache.set_cache("Как дела?", "ru", "Отлично!");
    cache.set_cache("How are you?", "en", "Great!");
    cache.set_cache("How are you?", "en", "Great!");
    let _ = cache.get_cache("как дела?", "ru");
    let before = cache.snapshot();
    cache.save_to_storage();

    let mut restored = file_cache(&dir);
    restored.load_from_storage();
    let after = restored.snapshot();
    assert_eq!(after.cache, before.cache);
    assert_eq!(after.popular_queries, before.popular_queries);
    assert_eq!(restored.popularity("How are you?", "en"), 2);
    assert_eq!(restored.get_cache("КАК ДЕЛА?", "ru").as_deref(), Some("Отлично!"));
}

#[test]
fn test_week_old_snapshot_is_not_rehydrated() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path());
    let mut source = ResponseCache::new(&config());
    source.set_cache("old", "en", "news");
    let mut snap: Snapshot = source.snapshot();
    snap.timestamp -= 8 * 24 * 60 * 60 * 1000;
    storage
        .set_item(STORAGE_KEY, &serde_json::to_string(&snap).unwrap())
        .unwrap();

    let mut cache = file_cache(&dir);
    cache.load_from_storage();
    assert!(cache.is_empty());
    assert_eq!(storage.get_item(STORAGE_KEY).unwrap(), None);
}

#[test]
fn test_garbage_file_leaves_cache_empty() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("ai-tap-cache.json"), b"\x00\x01garbage").unwrap();
    let mut cache = file_cache(&dir);
    cache.load_from_storage();
    assert!(cache.is_empty());
    assert!(!dir.path().join("ai-tap-cache.json").exists());
}

#[test]
fn test_empty_cache_stats() {
    let stats = file_cache(&TempDir::new().unwrap()).get_cache_stats();
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.total_hits, 0);
    assert_eq!(stats.average_hits, 0.0);
}

#[tokio::test]
async fn test_autosave_writes_file_on_shutdown() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(Mutex::new(file_cache(&dir)));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handle = spawn_autosave(cache.clone(), Duration::from_secs(3600), shutdown_rx);

    cache.lock().unwrap().set_cache("bye", "en", "see you");
    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();

    let mut restored = file_cache(&dir);
    restored.load_from_storage();
    assert_eq!(restored.get_cache("bye", "en").as_deref(), Some("see you"));
}
