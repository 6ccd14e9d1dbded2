//! # rag-answer
//!
//! Grounded question answering: retrieve the most relevant fragment, find the
//! document it came from, and have a generative model answer from that
//! fragment alone, citing the document.
//!
//! ## Overview
//!
//! - [`EmbeddingProvider`] turns the question into a vector.
//! - [`VectorIndex`] / [`VectorRetriever`] find the nearest fragment.
//! - [`DocumentGraph`] / [`SourceResolver`] map a fragment to its document.
//! - [`build_prompt`] assembles the grounded instruction prompt.
//! - [`GenerationProvider`] produces the answer text.
//! - [`AskPipeline`] sequences the stages and returns an [`AnswerResult`].
//!
//! [`InMemoryKnowledgeBase`] implements both stores for development and
//! tests. With the `gemini` feature, [`gemini::GeminiClient`] implements both
//! providers against the Gemini API.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rag_answer::{AskPipeline, GeminiConfig, InMemoryKnowledgeBase, gemini::GeminiClient};
//!
//! let gemini = Arc::new(GeminiClient::new(GeminiConfig::from_env()?)?);
//! let kb = Arc::new(InMemoryKnowledgeBase::new());
//!
//! let pipeline = AskPipeline::builder()
//!     .embedding_provider(gemini.clone())
//!     .vector_index(kb.clone())
//!     .document_graph(kb)
//!     .generation_provider(gemini)
//!     .build()?;
//!
//! match pipeline.ask("What happens to bones in space?").await? {
//!     AnswerResult::Answered { answer, .. } => println!("{answer}"),
//!     other => println!("{}", serde_json::to_string(&other)?),
//! }
//! ```
//!
//! ## Features
//!
//! - `gemini` – Gemini embedding and generation over REST (`reqwest`)

pub mod answer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod generation;
pub mod inmemory;
pub mod pipeline;
pub mod prompt;
pub mod source;
pub mod telemetry;
pub mod vectorindex;

pub use answer::{AnswerError, AnswerResult};
pub use config::{AskConfig, AskConfigBuilder, GeminiConfig};
pub use document::{Document, Fragment, RetrievalHit, SourceRef};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::GenerationProvider;
pub use inmemory::InMemoryKnowledgeBase;
pub use pipeline::{AskPipeline, AskPipelineBuilder, AskStage};
pub use prompt::{build_prompt, citation_line};
pub use source::{DocumentGraph, SourceResolver};
pub use telemetry::{LogFormat, init_tracing};
pub use vectorindex::{DEFAULT_LIMIT, VectorIndex, VectorRetriever};
