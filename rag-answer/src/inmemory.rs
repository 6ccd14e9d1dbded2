//! In-memory knowledge base using cosine similarity.
//!
//! This module provides [`InMemoryKnowledgeBase`], a document graph and vector
//! index in one, backed by maps protected by a `tokio::sync::RwLock`. It is
//! suitable for development, testing, and small corpora.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Document, Fragment, RetrievalHit, SourceRef};
use crate::error::{RagError, Result};
use crate::source::DocumentGraph;
use crate::vectorindex::VectorIndex;

const BACKEND: &str = "InMemory";

#[derive(Debug, Default)]
struct Graph {
    documents: HashMap<String, Document>,
    /// Ordered by fragment ID so equal scores come back in a stable order.
    fragments: BTreeMap<String, Fragment>,
    /// Fragment ID → owning document ID.
    owners: HashMap<String, String>,
    dimensions: Option<usize>,
}

/// Documents, their fragments, and a fragment → document back-index.
///
/// Every stored fragment has exactly one owning document and all embeddings
/// share one dimensionality; both are checked on insert. Searching compares
/// the query against every fragment (exact nearest neighbour).
///
/// # Example
///
/// ```rust,ignore
/// use rag_answer::{Document, Fragment, InMemoryKnowledgeBase};
///
/// let kb = InMemoryKnowledgeBase::new();
/// let doc = Document::new("Bone Loss in Orbit").with_link("http://example.org/bone");
/// let doc_id = kb.add_document(doc).await;
/// kb.add_fragment(&doc_id, Fragment::new("Microgravity reduces bone density", vec)).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeBase {
    graph: RwLock<Graph>,
    min_score: Option<f32>,
}

impl InMemoryKnowledgeBase {
    /// Create a new empty knowledge base.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop hits scoring below `min_score` from query results.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Store or replace a document, returning its ID.
    pub async fn add_document(&self, document: Document) -> String {
        let id = document.id.clone();
        self.graph.write().await.documents.insert(id.clone(), document);
        id
    }

    /// Store a fragment under `document_id`.
    ///
    /// Re-adding a fragment ID moves it to the new owner.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentGraphError`] if the document does not exist and
    /// [`RagError::VectorIndexError`] if the embedding is empty, holds a NaN or
    /// infinite value, or its length differs from the other fragments stored.
    pub async fn add_fragment(&self, document_id: &str, fragment: Fragment) -> Result<()> {
        let mut graph = self.graph.write().await;
        if !graph.documents.contains_key(document_id) {
            return Err(RagError::DocumentGraphError {
                backend: BACKEND.to_string(),
                message: format!("document '{document_id}' does not exist"),
            });
        }

        let dims = fragment.embedding.len();
        if dims == 0 {
            return Err(RagError::VectorIndexError {
                backend: BACKEND.to_string(),
                message: format!("fragment '{}' has an empty embedding", fragment.id),
            });
        }
        if !fragment.embedding.iter().all(|x| x.is_finite()) {
            return Err(RagError::VectorIndexError {
                backend: BACKEND.to_string(),
                message: format!("fragment '{}' has a non-finite embedding value", fragment.id),
            });
        }

        // Replacing the only stored fragment may change the dimensionality.
        let replaces_only =
            graph.fragments.len() == 1 && graph.fragments.contains_key(&fragment.id);
        if replaces_only {
            graph.dimensions = None;
        }
        match graph.dimensions {
            Some(expected) if expected != dims => {
                return Err(RagError::VectorIndexError {
                    backend: BACKEND.to_string(),
                    message: format!(
                        "fragment '{}' has {dims} dimensions, index expects {expected}",
                        fragment.id
                    ),
                });
            }
            Some(_) => {}
            None => graph.dimensions = Some(dims),
        }

        graph.owners.insert(fragment.id.clone(), document_id.to_string());
        graph.fragments.insert(fragment.id.clone(), fragment);
        Ok(())
    }

    /// Remove a document and every fragment it owns.
    ///
    /// Returns the removed document, if it existed.
    pub async fn remove_document(&self, document_id: &str) -> Option<Document> {
        let mut graph = self.graph.write().await;
        let document = graph.documents.remove(document_id)?;

        let owned: Vec<String> = graph
            .owners
            .iter()
            .filter(|(_, owner)| owner.as_str() == document_id)
            .map(|(fragment_id, _)| fragment_id.clone())
            .collect();
        for fragment_id in &owned {
            graph.owners.remove(fragment_id);
            graph.fragments.remove(fragment_id);
        }
        if graph.fragments.is_empty() {
            graph.dimensions = None;
        }

        debug!(document.id = document_id, fragment_count = owned.len(), "removed document");
        Some(document)
    }

    /// Remove a single fragment, returning it if it existed.
    pub async fn remove_fragment(&self, fragment_id: &str) -> Option<Fragment> {
        let mut graph = self.graph.write().await;
        graph.owners.remove(fragment_id);
        let fragment = graph.fragments.remove(fragment_id);
        if graph.fragments.is_empty() {
            graph.dimensions = None;
        }
        fragment
    }

    /// Look up a document by ID.
    pub async fn document(&self, document_id: &str) -> Option<Document> {
        self.graph.read().await.documents.get(document_id).cloned()
    }

    /// The fragments owned by `document_id`, ordered by fragment ID.
    pub async fn fragments_of(&self, document_id: &str) -> Vec<Fragment> {
        let graph = self.graph.read().await;
        graph
            .fragments
            .values()
            .filter(|f| graph.owners.get(&f.id).is_some_and(|owner| owner == document_id))
            .cloned()
            .collect()
    }

    /// Number of stored documents.
    pub async fn document_count(&self) -> usize {
        self.graph.read().await.documents.len()
    }

    /// Number of stored fragments.
    pub async fn fragment_count(&self) -> usize {
        self.graph.read().await.fragments.len()
    }

    /// Embedding dimensionality of the stored fragments, once known.
    pub async fn dimensions(&self) -> Option<usize> {
        self.graph.read().await.dimensions
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndex for InMemoryKnowledgeBase {
    async fn query_nearest(&self, embedding: &[f32], k: usize) -> Result<Vec<RetrievalHit>> {
        let graph = self.graph.read().await;
        if let Some(expected) = graph.dimensions.filter(|&d| d != embedding.len()) {
            return Err(RagError::VectorIndexError {
                backend: BACKEND.to_string(),
                message: format!(
                    "query has {} dimensions, index expects {expected}",
                    embedding.len()
                ),
            });
        }
        if !embedding.iter().all(|x| x.is_finite()) {
            return Err(RagError::VectorIndexError {
                backend: BACKEND.to_string(),
                message: "query has a non-finite value".to_string(),
            });
        }

        let mut scored: Vec<RetrievalHit> = graph
            .fragments
            .values()
            .map(|fragment| RetrievalHit {
                fragment_id: fragment.id.clone(),
                text: fragment.text.clone(),
                score: cosine_similarity(&fragment.embedding, embedding),
            })
            .filter(|hit| hit.score.is_finite())
            .filter(|hit| self.min_score.is_none_or(|min| hit.score >= min))
            .collect();

        // Stable sort keeps fragment-ID order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    fn name(&self) -> &str {
        BACKEND
    }
}

#[async_trait]
impl DocumentGraph for InMemoryKnowledgeBase {
    async fn find_owning_document(&self, fragment_id: &str) -> Result<Option<SourceRef>> {
        let graph = self.graph.read().await;
        Ok(graph
            .owners
            .get(fragment_id)
            .and_then(|document_id| graph.documents.get(document_id))
            .map(Document::source_ref))
    }

    fn name(&self) -> &str {
        BACKEND
    }
}
