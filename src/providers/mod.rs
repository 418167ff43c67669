//! Completion generators and the caching decorator around them.

pub mod cached;

pub use cached::CachedGenerator;

use async_trait::async_trait;

use crate::error::Result;

/// A completion backend: turns a user message into a response text.
///
/// Implementations own request formatting, history and transport.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider name for log output.
    fn name(&self) -> &str;

    /// Generate a response to `message` in `language`.
    async fn generate(&self, message: &str, language: &str) -> Result<String>;
}
