//! Periodic snapshotting of a shared cache.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ResponseCache;

/// A cache shared between request handlers and the autosave task.
///
/// One mutex guards both tables; never hold it across an `.await`.
pub type SharedCache = Arc<Mutex<ResponseCache>>;

/// Spawn a task that saves `cache` every `interval`, and once more when
/// `shutdown_rx` flips to `true`.
pub fn spawn_autosave(
    cache: SharedCache,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    // `interval` panics on a zero period.
    let interval = interval.max(Duration::from_millis(10));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; nothing has changed yet.
        ticker.tick().await;
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Cache autosave shutting down, writing final snapshot");
                        save(&cache);
                        return;
                    }
                }
                _ = ticker.tick() => {
                    debug!("Cache autosave tick");
                    save(&cache);
                }
            }
        }
    })
}

fn save(cache: &SharedCache) {
    match cache.lock() {
        Ok(mut guard) => guard.save_to_storage(),
        Err(_) => warn!("Cache lock poisoned, skipping autosave"),
    }
}
