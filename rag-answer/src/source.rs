//! Fragment → document source resolution.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::document::SourceRef;
use crate::error::Result;

/// The graph relating documents to the fragments they own.
#[async_trait]
pub trait DocumentGraph: Send + Sync {
    /// Follow the ownership edge back from a fragment to its document.
    ///
    /// Returns `Ok(None)` when the fragment has no owner; an `Err` is
    /// reserved for failures to reach the graph.
    async fn find_owning_document(&self, fragment_id: &str) -> Result<Option<SourceRef>>;

    /// Backend name used in logs and error messages.
    fn name(&self) -> &str {
        "document-graph"
    }
}

/// Resolves the citation for a retrieved fragment.
#[derive(Clone)]
pub struct SourceResolver {
    graph: Arc<dyn DocumentGraph>,
}

impl SourceResolver {
    /// Create a resolver over `graph`.
    pub fn new(graph: Arc<dyn DocumentGraph>) -> Self {
        Self { graph }
    }

    /// Name of the underlying graph.
    pub fn backend(&self) -> &str {
        self.graph.name()
    }

    /// Return the owning document of `fragment_id`, or `None` if it is detached.
    pub async fn resolve_source(&self, fragment_id: &str) -> Result<Option<SourceRef>> {
        let source = self.graph.find_owning_document(fragment_id).await?;
        debug!(
            backend = self.graph.name(),
            fragment.id = fragment_id,
            found = source.is_some(),
            "source lookup"
        );
        Ok(source)
    }
}
