//! Generation provider trait for producing answer text from a prompt.

use async_trait::async_trait;

use crate::error::Result;

/// A generative model that completes a prompt.
///
/// The output is returned unchanged. Failures are returned as
/// [`RagError::GenerationError`](crate::RagError::GenerationError); whether they become
/// a fallback answer is decided by the pipeline, never by the provider.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Provider name used in logs and error messages.
    fn name(&self) -> &str {
        "generation"
    }
}
