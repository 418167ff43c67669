//! aitap command-line entry point.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aitap::config::Config;

use cli::{Cli, Command};

fn main() -> Result<()> {
    // A missing .env is the common case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let path = cli.config.clone().unwrap_or_else(Config::path);
    let config = Config::load_with(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    init_tracing(&config);
    tracing::debug!(app = %config.app_name, "Starting");

    match cli.command {
        Command::Cache { action } => cli::cache::cmd_cache(action, &config.cache),
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("error"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
