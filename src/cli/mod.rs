//! Command-line interface definitions.

pub(crate) mod cache;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aitap", version, about = "AI-TAP response cache tools")]
pub(crate) struct Cli {
    /// Path to config.json (defaults to ~/.aitap/config.json)
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Inspect or edit the persisted response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Show entry count, hit totals and top queries
    Stats,
    /// List the most frequently cached queries
    Popular {
        /// Maximum rows to show
        #[arg(long, default_value_t = aitap::cache::DEFAULT_POPULAR_LIMIT)]
        limit: usize,
    },
    /// Look up a cached response
    Get {
        message: String,
        #[arg(long, default_value = "ru")]
        language: String,
    },
    /// Store a response
    Put {
        message: String,
        response: String,
        #[arg(long, default_value = "ru")]
        language: String,
    },
    /// Remove every entry and popularity counter
    Clear,
    /// Print the snapshot file location
    Path,
}
