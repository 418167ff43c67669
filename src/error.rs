//! Error types for aitap.

use thiserror::Error;

/// Errors produced by aitap's fallible collaborators: config loading,
/// storage adapters and generators.
///
/// The response cache itself never returns these; it logs them and degrades.
#[derive(Debug, Error)]
pub enum TapError {
    /// Invalid or unreadable configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// The storage surface failed to read, write or remove an item.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The storage surface refused a write because it is out of capacity.
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// A completion generator failed.
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TapError {
    /// Returns `true` for capacity failures reported by a storage surface.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            TapError::QuotaExceeded(_) => true,
            // ENOSPC surfaces as StorageFull on recent toolchains; match the raw code too.
            TapError::Io(e) => e.raw_os_error() == Some(28),
            _ => false,
        }
    }
}

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, TapError>;
