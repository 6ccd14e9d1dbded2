//! Nearest-neighbour retrieval over a vector index of fragments.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::document::RetrievalHit;
use crate::error::{RagError, Result};

/// Number of hits the retriever returns when no limit is given.
pub const DEFAULT_LIMIT: usize = 1;

/// A persisted index of fragment embeddings answering similarity queries.
///
/// Construction and population of the index happen elsewhere; this crate
/// only queries it.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `k` fragments most similar to `embedding`.
    ///
    /// Results are ordered by descending score, with ties broken in an
    /// order fixed by the index. An empty index, or one where no entry
    /// clears the index's own threshold, yields an empty vector.
    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievalHit>>;

    /// Backend name used in logs and error messages.
    fn name(&self) -> &str {
        "vector-index"
    }
}

/// Queries a [`VectorIndex`] and enforces the retrieval contract.
#[derive(Clone)]
pub struct VectorRetriever {
    index: Arc<dyn VectorIndex>,
}

impl VectorRetriever {
    /// Create a retriever over `index`.
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Name of the underlying index.
    pub fn backend(&self) -> &str {
        self.index.name()
    }

    /// Return at most `limit` hits ordered by descending similarity.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `limit` is zero, or whatever the index
    /// returns when the query itself fails.
    pub async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<RetrievalHit>> {
        if limit == 0 {
            return Err(RagError::ConfigError("retrieval limit must be at least 1".to_string()));
        }

        let mut hits = self.index.query_nearest(query, limit).await?;
        hits.truncate(limit);
        debug!(backend = self.index.name(), limit, hit_count = hits.len(), "vector search");
        Ok(hits)
    }

    /// Return the single best hit, if any.
    pub async fn search_best(&self, query: &[f32]) -> Result<Option<RetrievalHit>> {
        Ok(self.search(query, DEFAULT_LIMIT).await?.into_iter().next())
    }
}
