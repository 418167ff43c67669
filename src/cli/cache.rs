//! Response cache command handler.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;

use aitap::cache::{FileStorage, ResponseCache, STORAGE_KEY};
use aitap::config::CacheConfig;

use super::CacheAction;

/// Handle `aitap cache` subcommands against the file-backed snapshot.
pub(crate) fn cmd_cache(action: CacheAction, config: &CacheConfig) -> Result<()> {
    let storage = FileStorage::new(config.storage_dir());

    if let CacheAction::Path = action {
        println!("{}", storage.item_path(STORAGE_KEY)?.display());
        return Ok(());
    }

    let mut cache = ResponseCache::new(config).with_storage(Arc::new(storage));
    cache.load_from_storage();

    let mutated = execute(action, &mut cache, &mut std::io::stdout().lock())?;

    // Reads bump hit counters and may drop expired entries, so `get` saves too.
    if mutated {
        cache.save_to_storage();
    }
    Ok(())
}

/// Run `action` on a loaded cache, writing its report to `out`. Returns
/// whether the cache changed.
fn execute(
    action: CacheAction,
    cache: &mut ResponseCache,
    out: &mut impl Write,
) -> Result<bool> {
    let mutated = match action {
        CacheAction::Stats => {
            let stats = cache.get_cache_stats();
            writeln!(out, "Entries:      {}", stats.total_entries)?;
            writeln!(out, "Total hits:   {}", stats.total_hits)?;
            writeln!(out, "Average hits: {:.2}", stats.average_hits)?;
            if !stats.popular_queries.is_empty() {
                writeln!(out, "Top queries:")?;
                for row in &stats.popular_queries {
                    writeln!(out, "  {:>5}  {}", row.hits, row.query)?;
                }
            }
            false
        }
        CacheAction::Popular { limit } => {
            let rows = cache.get_popular_queries(limit);
            if rows.is_empty() {
                writeln!(out, "No queries recorded.")?;
            } else {
                writeln!(out, "{:<8} {}", "Count", "Query")?;
                writeln!(out, "{}", "-".repeat(40))?;
                for row in rows {
                    writeln!(out, "{:<8} {}", row.hits, row.query)?;
                }
            }
            false
        }
        CacheAction::Get { message, language } => {
            match cache.get_cache(&message, &language) {
                Some(response) => writeln!(out, "{}", response)?,
                None => writeln!(out, "No cached response.")?,
            }
            true
        }
        CacheAction::Put {
            message,
            response,
            language,
        } => {
            if message.is_empty() || response.is_empty() {
                writeln!(out, "Message and response must not be empty.")?;
                false
            } else {
                cache.set_cache(&message, &language, &response);
                writeln!(out, "Cached ({} entries).", cache.len())?;
                true
            }
        }
        CacheAction::Clear => {
            cache.clear_cache();
            writeln!(out, "Cache cleared.")?;
            true
        }
        CacheAction::Path => false,
    };
    Ok(mutated)
}
