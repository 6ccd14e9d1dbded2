//! Error types for the `rag-answer` crate.

use thiserror::Error;

/// Faults that abort an [`ask`](crate::AskPipeline::ask) run.
///
/// The two expected early exits (no relevant context, no source found) are
/// not errors; they are reported through [`AnswerResult`](crate::AnswerResult).
#[derive(Debug, Error)]
pub enum RagError {
    /// The embedding provider was unreachable, timed out, or returned a
    /// malformed payload.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index could not be queried or updated.
    #[error("Vector index error ({backend}): {message}")]
    VectorIndexError {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The document graph could not be traversed or updated.
    #[error("Document graph error ({backend}): {message}")]
    DocumentGraphError {
        /// The graph backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation provider was unreachable, timed out, or refused to answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RagError {
    pub(crate) fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingError { provider: provider.into(), message: message.into() }
    }

    pub(crate) fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GenerationError { provider: provider.into(), message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
