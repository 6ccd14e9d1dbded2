//! Embedding provider trait for turning text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// Implementations wrap a specific embedding backend behind a unified async
/// interface. Transport errors and malformed payloads must be returned as
/// [`RagError::EmbeddingError`](crate::RagError::EmbeddingError); a made-up vector would
/// silently corrupt retrieval.
///
/// # Example
///
/// ```rust,ignore
/// use rag_answer::EmbeddingProvider;
///
/// let provider = MyEmbeddingProvider::new();
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Provider name used in logs and error messages.
    fn name(&self) -> &str {
        "embedding"
    }
}
