//! Question-answering pipeline orchestrator.
//!
//! The [`AskPipeline`] answers a question by composing an
//! [`EmbeddingProvider`], a [`VectorIndex`], a [`DocumentGraph`], and a
//! [`GenerationProvider`]:
//!
//! ```text
//! START ──embed──▶ EMBEDDED ──search──▶ RETRIEVED ──resolve──▶ SOURCED ──generate──▶ ANSWERED
//!                               │                      │
//!                               ▼                      ▼
//!                          NO_CONTEXT              NO_SOURCE
//! ```
//!
//! Each stage waits for the previous one. Only the single best fragment is
//! used as context, and nothing is retried.
//!
//! # Example
//!
//! ```rust,ignore
//! use rag_answer::{AskConfig, AskPipeline, InMemoryKnowledgeBase};
//!
//! let kb = Arc::new(InMemoryKnowledgeBase::new());
//! let pipeline = AskPipeline::builder()
//!     .config(AskConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .vector_index(kb.clone())
//!     .document_graph(kb)
//!     .generation_provider(Arc::new(my_model))
//!     .build()?;
//!
//! let result = pipeline.ask("What happens to bones in space?").await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::answer::{AnswerError, AnswerResult};
use crate::config::AskConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::prompt::build_prompt;
use crate::source::{DocumentGraph, SourceResolver};
use crate::vectorindex::{VectorIndex, VectorRetriever};

/// Where an [`ask`](AskPipeline::ask) run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AskStage {
    /// Nothing has run yet.
    Start,
    /// The question has been embedded.
    Embedded,
    /// The best fragment has been retrieved.
    Retrieved,
    /// The fragment's document has been resolved.
    Sourced,
    /// The model has answered.
    Answered,
    /// Stopped: the index returned nothing.
    NoContext,
    /// Stopped: the fragment has no owning document.
    NoSource,
}

impl std::fmt::Display for AskStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Start => "START",
            Self::Embedded => "EMBEDDED",
            Self::Retrieved => "RETRIEVED",
            Self::Sourced => "SOURCED",
            Self::Answered => "ANSWERED",
            Self::NoContext => "NO_CONTEXT",
            Self::NoSource => "NO_SOURCE",
        })
    }
}

/// The question-answering pipeline.
///
/// Holds no per-request state, so one pipeline can serve concurrent
/// questions. Construct one via [`AskPipeline::builder()`].
pub struct AskPipeline {
    config: AskConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    retriever: VectorRetriever,
    resolver: SourceResolver,
    generation_provider: Arc<dyn GenerationProvider>,
}

impl AskPipeline {
    /// Create a new [`AskPipelineBuilder`].
    pub fn builder() -> AskPipelineBuilder {
        AskPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &AskConfig {
        &self.config
    }

    /// Answer `question` from the single most relevant fragment.
    ///
    /// Returns [`AnswerResult::Unanswered`] for the two expected early exits
    /// and [`AnswerResult::Degraded`] when generation fails and a fallback
    /// message is configured.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingError`] if the question cannot be embedded.
    /// - [`RagError::VectorIndexError`] / [`RagError::DocumentGraphError`] if a store
    ///   cannot be queried.
    /// - [`RagError::GenerationError`] if generation fails and no fallback is set.
    ///
    /// A stage that exceeds the configured deadline fails with that stage's error.
    #[instrument(
        name = "ask",
        skip_all,
        fields(request.id = %Uuid::new_v4(), question_len = question.len())
    )]
    pub async fn ask(&self, question: &str) -> Result<AnswerResult> {
        // START → EMBEDDED
        let query = self
            .within(AskStage::Embedded, self.embedding_provider.embed(question))
            .await
            .inspect_err(|e| error!(stage = %AskStage::Start, error = %e, "embedding failed"))?;
        self.check_query_vector(&query)?;

        // EMBEDDED → RETRIEVED | NO_CONTEXT
        let hit = self
            .within(AskStage::Retrieved, self.retriever.search_best(&query))
            .await
            .inspect_err(|e| error!(stage = %AskStage::Embedded, error = %e, "retrieval failed"))?;
        let Some(hit) = hit else {
            info!(stage = %AskStage::NoContext, "no relevant context");
            return Ok(AnswerResult::Unanswered(AnswerError::NoRelevantContext));
        };

        // RETRIEVED → SOURCED | NO_SOURCE
        let source = self
            .within(AskStage::Sourced, self.resolver.resolve_source(&hit.fragment_id))
            .await
            .inspect_err(
                |e| error!(stage = %AskStage::Retrieved, error = %e, "source lookup failed"),
            )?;
        let Some(source) = source else {
            warn!(
                stage = %AskStage::NoSource,
                fragment.id = %hit.fragment_id,
                "retrieved fragment has no owning document"
            );
            return Ok(AnswerResult::Unanswered(AnswerError::NoSourceFound));
        };

        // SOURCED → ANSWERED
        let prompt = build_prompt(question, &hit.text, &source);
        match self.within(AskStage::Answered, self.generation_provider.generate(&prompt)).await {
            Ok(answer) => {
                info!(
                    stage = %AskStage::Answered,
                    fragment.id = %hit.fragment_id,
                    document.id = %source.id,
                    score = hit.score,
                    "answered"
                );
                Ok(AnswerResult::Answered { answer, source })
            }
            Err(e @ RagError::GenerationError { .. }) => match &self.config.generation_fallback {
                Some(fallback) => {
                    warn!(
                        stage = %AskStage::Sourced,
                        error = %e,
                        "generation failed, answering with fallback"
                    );
                    Ok(AnswerResult::Degraded {
                        answer: fallback.clone(),
                        source,
                        reason: e.to_string(),
                    })
                }
                None => {
                    error!(stage = %AskStage::Sourced, error = %e, "generation failed");
                    Err(e)
                }
            },
            Err(e) => {
                error!(stage = %AskStage::Sourced, error = %e, "generation failed");
                Err(e)
            }
        }
    }

    /// Reject query vectors that cannot be compared with the index.
    fn check_query_vector(&self, query: &[f32]) -> Result<()> {
        let expected = self.embedding_provider.dimensions();
        if query.is_empty() || query.len() != expected {
            error!(
                stage = %AskStage::Start,
                got = query.len(),
                expected,
                "embedding has the wrong dimensionality"
            );
            return Err(RagError::embedding(
                self.embedding_provider.name(),
                format!("embedding has {} dimensions, expected {expected}", query.len()),
            ));
        }
        if !query.iter().all(|x| x.is_finite()) {
            error!(stage = %AskStage::Start, "embedding has a non-finite value");
            return Err(RagError::embedding(
                self.embedding_provider.name(),
                "embedding has a non-finite value",
            ));
        }
        Ok(())
    }

    /// Run `call`, the step that leads to `target`, under the stage deadline.
    async fn within<T>(
        &self,
        target: AskStage,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let Some(timeout) = self.config.stage_timeout() else {
            return call.await;
        };
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                let message = format!("timed out after {}ms", timeout.as_millis());
                Err(match target {
                    AskStage::Embedded => {
                        RagError::embedding(self.embedding_provider.name(), message)
                    }
                    AskStage::Retrieved => RagError::VectorIndexError {
                        backend: self.retriever.backend().to_string(),
                        message,
                    },
                    AskStage::Sourced => RagError::DocumentGraphError {
                        backend: self.resolver.backend().to_string(),
                        message,
                    },
                    _ => RagError::generation(self.generation_provider.name(), message),
                })
            }
        }
    }
}

/// Builder for constructing an [`AskPipeline`].
///
/// All providers are required; the config defaults to [`AskConfig::default()`].
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = AskPipeline::builder()
///     .embedding_provider(Arc::new(embedder))
///     .vector_index(index)
///     .document_graph(graph)
///     .generation_provider(Arc::new(model))
///     .build()?;
/// ```
#[derive(Default)]
pub struct AskPipelineBuilder {
    config: Option<AskConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    document_graph: Option<Arc<dyn DocumentGraph>>,
    generation_provider: Option<Arc<dyn GenerationProvider>>,
}

impl AskPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: AskConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector index searched for context.
    pub fn vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    /// Set the document graph used to resolve citations.
    pub fn document_graph(mut self, graph: Arc<dyn DocumentGraph>) -> Self {
        self.document_graph = Some(graph);
        self
    }

    /// Set the generation provider.
    pub fn generation_provider(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation_provider = Some(provider);
        self
    }

    /// Build the [`AskPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any provider is missing.
    pub fn build(self) -> Result<AskPipeline> {
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let vector_index = self
            .vector_index
            .ok_or_else(|| RagError::ConfigError("vector_index is required".to_string()))?;
        let document_graph = self
            .document_graph
            .ok_or_else(|| RagError::ConfigError("document_graph is required".to_string()))?;
        let generation_provider = self
            .generation_provider
            .ok_or_else(|| RagError::ConfigError("generation_provider is required".to_string()))?;

        Ok(AskPipeline {
            config: self.config.unwrap_or_default(),
            embedding_provider,
            retriever: VectorRetriever::new(vector_index),
            resolver: SourceResolver::new(document_graph),
            generation_provider,
        })
    }
}
