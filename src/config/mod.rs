//! Configuration for aitap.
//!
//! Loaded from `~/.aitap/config.json` when present, then overridden by
//! `AITAP_*` environment variables (a `.env` file is honored by the binary).
//! Every field has a default, so a missing or partial file is fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TapError};

/// Default entry-table capacity.
pub const DEFAULT_MAX_ENTRIES: usize = 100;
/// Default entry time-to-live: 24 hours.
pub const DEFAULT_EXPIRY_MS: i64 = 24 * 60 * 60 * 1000;
/// Default autosave cadence: 5 minutes.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 5 * 60;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name used in log output.
    pub app_name: String,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// `"pretty"` (default) or `"json"`.
    pub log_format: String,
    /// Response cache settings.
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "AI-TAP".to_string(),
            log_level: "error".to_string(),
            log_format: "pretty".to_string(),
            cache: CacheConfig::default(),
        }
    }
}

/// Response cache knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry-table capacity. Exceeding it triggers an eviction sweep.
    pub max_entries: usize,
    /// Entry time-to-live in milliseconds.
    pub expiry_ms: i64,
    /// How often the autosave task snapshots the cache.
    pub autosave_interval_secs: u64,
    /// Directory for the file-backed snapshot. `None` means `~/.aitap/cache`.
    pub storage_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            expiry_ms: DEFAULT_EXPIRY_MS,
            autosave_interval_secs: DEFAULT_AUTOSAVE_INTERVAL_SECS,
            storage_dir: None,
        }
    }
}

impl CacheConfig {
    /// Resolved snapshot directory.
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| Config::dir().join("cache"))
    }

    fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(TapError::Config(
                "cache.max_entries must be greater than 0".into(),
            ));
        }
        if self.expiry_ms < 0 {
            return Err(TapError::Config(
                "cache.expiry_ms must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Base directory: `~/.aitap`.
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".aitap")
    }

    /// Default config file path: `~/.aitap/config.json`.
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from the default path and apply environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_with(&Self::path())
    }

    /// Load from `path`, apply environment overrides, then validate the result.
    pub fn load_with(path: &Path) -> Result<Self> {
        Self::load_with_env(path, |name| std::env::var(name).ok())
    }

    fn load_with_env<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load_from_path(path)?;
        config.apply_env_overrides_from(lookup)?;
        config.cache.validate()?;
        Ok(config)
    }

    /// Load from an explicit file. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(TapError::Config(format!(
                    "Failed to read config at {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let config: Config = serde_json::from_str(&data).map_err(|e| {
            TapError::Config(format!(
                "Failed to parse config at {}: {}",
                path.display(),
                e
            ))
        })?;
        config.cache.validate()?;
        Ok(config)
    }

    /// Apply `AITAP_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AITAP_CACHE_SIZE") {
            self.cache.max_entries = parse_env("AITAP_CACHE_SIZE", &v)?;
        }
        if let Some(v) = lookup("AITAP_CACHE_EXPIRY_MS") {
            self.cache.expiry_ms = parse_env("AITAP_CACHE_EXPIRY_MS", &v)?;
        }
        if let Some(v) = lookup("AITAP_AUTOSAVE_INTERVAL_SECS") {
            self.cache.autosave_interval_secs = parse_env("AITAP_AUTOSAVE_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("AITAP_CACHE_DIR") {
            if !v.trim().is_empty() {
                self.cache.storage_dir = Some(PathBuf::from(v.trim()));
            }
        }
        if let Some(v) = lookup("AITAP_LOG_LEVEL") {
            if !v.trim().is_empty() {
                self.log_level = v.trim().to_string();
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TapError::Config(format!("{} has invalid value '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_cache_config_defaults() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.max_entries, 100);
        assert_eq!(cfg.expiry_ms, 86_400_000);
        assert_eq!(cfg.autosave_interval_secs, 300);
        assert!(cfg.storage_dir.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = Config::load_from_path(&tmp.path().join("nope.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"cache":{"max_entries":25}}"#).unwrap();
        let cfg = Config::load_from_path(&path).unwrap();
        assert_eq!(cfg.cache.max_entries, 25);
        assert_eq!(cfg.cache.expiry_ms, DEFAULT_EXPIRY_MS);
        assert_eq!(cfg.log_level, "error");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"cache":{"max_entries":0}}"#).unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, TapError::Config(_)));
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(TapError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("AITAP_CACHE_SIZE", "42"),
            ("AITAP_CACHE_EXPIRY_MS", "1000"),
            ("AITAP_CACHE_DIR", "/tmp/aitap-cache"),
            ("AITAP_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.apply_env_overrides_from(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.cache.max_entries, 42);
        assert_eq!(cfg.cache.expiry_ms, 1000);
        assert_eq!(cfg.cache.storage_dir(), PathBuf::from("/tmp/aitap-cache"));
        assert_eq!(cfg.log_level, "debug");
    }

    #[test]
    fn test_env_override_is_validated_after_file_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"cache":{"max_entries":25}}"#).unwrap();

        let err = Config::load_with_env(&path, |k| {
            (k == "AITAP_CACHE_SIZE").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, TapError::Config(_)));

        let err = Config::load_with_env(&path, |k| {
            (k == "AITAP_CACHE_EXPIRY_MS").then(|| "-5".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("expiry_ms"));

        let cfg = Config::load_with_env(&path, |_| None).unwrap();
        assert_eq!(cfg.cache.max_entries, 25);
    }

    #[test]
    fn test_env_override_invalid_number() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env_overrides_from(|k| (k == "AITAP_CACHE_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("AITAP_CACHE_SIZE"));
    }
}
