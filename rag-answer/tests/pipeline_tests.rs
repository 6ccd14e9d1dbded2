//! End-to-end tests for the ask pipeline with mock providers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rag_answer::{
    AnswerError, AnswerResult, AskConfig, AskPipeline, Document, DocumentGraph, EmbeddingProvider,
    Fragment, GenerationProvider, InMemoryKnowledgeBase, RagError, RetrievalHit, SourceRef,
    VectorIndex,
};

// ---------------------------------------------------------------------------
// Mock providers
// ---------------------------------------------------------------------------

const VOCABULARY: [&str; 7] = ["bone", "space", "orbit", "rust", "memory", "ocean", "salt"];
const DIMS: usize = VOCABULARY.len() + 1;

/// Deterministic bag-of-words embeddings over a tiny vocabulary.
#[derive(Default)]
struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let text = text.to_lowercase();
        let mut v: Vec<f32> =
            VOCABULARY.iter().map(|w| text.matches(w).count() as f32).collect();
        // Bias term keeps every vector non-zero.
        v.push(0.1);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> rag_answer::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> rag_answer::Result<Vec<f32>> {
        Err(RagError::EmbeddingError {
            provider: "mock".into(),
            message: "connection refused".into(),
        })
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Returns vectors one element shorter than it advertises.
struct TruncatingEmbedder;

#[async_trait]
impl EmbeddingProvider for TruncatingEmbedder {
    async fn embed(&self, text: &str) -> rag_answer::Result<Vec<f32>> {
        let mut v = KeywordEmbedder::vector(text);
        v.pop();
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

/// Returns a vector of the right size holding a NaN.
struct NanEmbedder;

#[async_trait]
impl EmbeddingProvider for NanEmbedder {
    async fn embed(&self, text: &str) -> rag_answer::Result<Vec<f32>> {
        let mut v = KeywordEmbedder::vector(text);
        v[0] = f32::NAN;
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIMS
    }
}

struct SlowEmbedder;

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, _text: &str) -> rag_answer::Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![0.0; DIMS])
    }

    fn dimensions(&self) -> usize {
        DIMS
    }

    fn name(&self) -> &str {
        "slow-embedder"
    }
}

/// Answers like a well-behaved model: one sentence plus the requested citation.
#[derive(Default)]
struct CitingGenerator {
    prompts: std::sync::Mutex<Vec<String>>,
}

impl CitingGenerator {
    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationProvider for CitingGenerator {
    async fn generate(&self, prompt: &str) -> rag_answer::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let citation = prompt
            .rsplit_once("citation line: \"")
            .map(|(_, rest)| rest.trim_end().trim_end_matches('"').to_string())
            .unwrap_or_default();
        Ok(format!("In space, bones lose density.\n{citation}"))
    }
}

#[derive(Default)]
struct FailingGenerator {
    calls: AtomicUsize,
}

#[async_trait]
impl GenerationProvider for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> rag_answer::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::GenerationError {
            provider: "mock".into(),
            message: "503 overloaded".into(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

struct SlowGenerator;

#[async_trait]
impl GenerationProvider for SlowGenerator {
    async fn generate(&self, _prompt: &str) -> rag_answer::Result<String> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok("too late".into())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Counts calls before delegating to an inner index.
struct CountingIndex {
    inner: Arc<dyn VectorIndex>,
    calls: AtomicUsize,
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn query_nearest(&self, e: &[f32], k: usize) -> rag_answer::Result<Vec<RetrievalHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.query_nearest(e, k).await
    }
}

/// Counts calls before delegating to an inner graph.
struct CountingGraph {
    inner: Arc<dyn DocumentGraph>,
    calls: AtomicUsize,
}

#[async_trait]
impl DocumentGraph for CountingGraph {
    async fn find_owning_document(&self, id: &str) -> rag_answer::Result<Option<SourceRef>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_owning_document(id).await
    }
}

struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn query_nearest(&self, _e: &[f32], _k: usize) -> rag_answer::Result<Vec<RetrievalHit>> {
        Err(RagError::VectorIndexError {
            backend: "broken-index".into(),
            message: "connection reset".into(),
        })
    }

    fn name(&self) -> &str {
        "broken-index"
    }
}

struct SlowIndex;

#[async_trait]
impl VectorIndex for SlowIndex {
    async fn query_nearest(&self, _e: &[f32], _k: usize) -> rag_answer::Result<Vec<RetrievalHit>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "slow-index"
    }
}

struct FailingGraph;

#[async_trait]
impl DocumentGraph for FailingGraph {
    async fn find_owning_document(&self, _id: &str) -> rag_answer::Result<Option<SourceRef>> {
        Err(RagError::DocumentGraphError {
            backend: "broken-graph".into(),
            message: "session expired".into(),
        })
    }

    fn name(&self) -> &str {
        "broken-graph"
    }
}

struct SlowGraph;

#[async_trait]
impl DocumentGraph for SlowGraph {
    async fn find_owning_document(&self, _id: &str) -> rag_answer::Result<Option<SourceRef>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    fn name(&self) -> &str {
        "slow-graph"
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const BONE_TEXT: &str = "Microgravity reduces bone density";

async fn bone_knowledge_base() -> Arc<InMemoryKnowledgeBase> {
    let kb = Arc::new(InMemoryKnowledgeBase::new());
    let doc = Document::new("Bone Loss in Orbit")
        .with_id("doc-bone")
        .with_link("http://example.org/bone");
    let doc_id = kb.add_document(doc).await;
    kb.add_fragment(
        &doc_id,
        Fragment::new(BONE_TEXT, KeywordEmbedder::vector(BONE_TEXT)).with_id("frag-bone"),
    )
    .await
    .unwrap();
    kb
}

fn pipeline(
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    graph: Arc<dyn DocumentGraph>,
    generator: Arc<dyn GenerationProvider>,
    config: AskConfig,
) -> AskPipeline {
    AskPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_index(index)
        .document_graph(graph)
        .generation_provider(generator)
        .build()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn answers_from_fragment_and_cites_document() {
    let kb = bone_knowledge_base().await;
    let generator = Arc::new(CitingGenerator::default());
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb.clone(),
        kb,
        generator.clone(),
        AskConfig::default(),
    );

    let result = pipeline.ask("What happens to bones in space?").await.unwrap();

    let answer = result.answer().expect("answer should be present");
    assert!(answer.contains("Bone Loss in Orbit"), "{answer}");
    assert!(answer.contains("http://example.org/bone"), "{answer}");
    assert!(result.is_answered());

    let source = result.source().unwrap();
    assert_eq!(source.id, "doc-bone");
    assert_eq!(source.title, "Bone Loss in Orbit");

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(BONE_TEXT));
    assert!(prompts[0].contains("What happens to bones in space?"));
}

#[tokio::test]
async fn empty_index_yields_no_relevant_context_without_later_stages() {
    let kb = Arc::new(InMemoryKnowledgeBase::new());
    let graph = Arc::new(CountingGraph { inner: kb.clone(), calls: AtomicUsize::new(0) });
    let generator = Arc::new(CitingGenerator::default());
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb,
        graph.clone(),
        generator.clone(),
        AskConfig::default(),
    );

    let result = pipeline.ask("What happens to bones in space?").await.unwrap();

    assert_eq!(result, AnswerResult::Unanswered(AnswerError::NoRelevantContext));
    assert_eq!(result.answer(), None);
    assert_eq!(graph.calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn fragment_without_document_yields_no_source_found() {
    // The index knows the fragment; the graph has no edge for it.
    let index = bone_knowledge_base().await;
    let graph = Arc::new(CountingGraph {
        inner: Arc::new(InMemoryKnowledgeBase::new()),
        calls: AtomicUsize::new(0),
    });
    let generator = Arc::new(CitingGenerator::default());
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        index,
        graph.clone(),
        generator.clone(),
        AskConfig::default(),
    );

    let result = pipeline.ask("What happens to bones in space?").await.unwrap();

    assert_eq!(result.error(), Some(AnswerError::NoSourceFound));
    assert_eq!(result.answer(), None);
    assert_eq!(graph.calls.load(Ordering::SeqCst), 1);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn generation_failure_propagates_without_fallback() {
    let kb = bone_knowledge_base().await;
    let generator = Arc::new(FailingGenerator::default());
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb.clone(),
        kb,
        generator.clone(),
        AskConfig::default(),
    );

    let err = pipeline.ask("What happens to bones in space?").await.unwrap_err();

    assert!(matches!(err, RagError::GenerationError { .. }), "{err}");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn generation_failure_with_fallback_is_degraded_not_answered() {
    let kb = bone_knowledge_base().await;
    let config = AskConfig::builder()
        .generation_fallback("Sorry, I can't answer right now.")
        .build()
        .unwrap();
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb.clone(),
        kb,
        Arc::new(FailingGenerator::default()),
        config,
    );

    let result = pipeline.ask("What happens to bones in space?").await.unwrap();

    assert!(result.is_degraded());
    assert!(!result.is_answered());
    assert_eq!(result.answer(), Some("Sorry, I can't answer right now."));
    match &result {
        AnswerResult::Degraded { reason, source, .. } => {
            assert!(reason.contains("503 overloaded"));
            assert_eq!(source.title, "Bone Loss in Orbit");
        }
        other => panic!("expected degraded result, got {other:?}"),
    }
    let wire = serde_json::to_value(&result).unwrap();
    assert_eq!(wire["degraded"], serde_json::json!(true));
}

#[tokio::test]
async fn embedding_failure_propagates_before_retrieval() {
    let kb = bone_knowledge_base().await;
    let index = Arc::new(CountingIndex { inner: kb.clone(), calls: AtomicUsize::new(0) });
    let pipeline = pipeline(
        Arc::new(FailingEmbedder),
        index.clone(),
        kb,
        Arc::new(CitingGenerator::default()),
        AskConfig::default(),
    );

    let err = pipeline.ask("anything").await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { .. }), "{err}");
    assert_eq!(index.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_sized_embedding_is_an_embedding_failure() {
    let kb = bone_knowledge_base().await;
    let index = Arc::new(CountingIndex { inner: kb.clone(), calls: AtomicUsize::new(0) });
    let pipeline = pipeline(
        Arc::new(TruncatingEmbedder),
        index.clone(),
        kb,
        Arc::new(CitingGenerator::default()),
        AskConfig::default(),
    );

    let err = pipeline.ask("bones").await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { .. }), "{err}");
    assert_eq!(index.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_finite_embedding_is_an_embedding_failure() {
    let kb = bone_knowledge_base().await;
    let index = Arc::new(CountingIndex { inner: kb.clone(), calls: AtomicUsize::new(0) });
    let pipeline = pipeline(
        Arc::new(NanEmbedder),
        index.clone(),
        kb,
        Arc::new(CitingGenerator::default()),
        AskConfig::default(),
    );

    let err = pipeline.ask("bones").await.unwrap_err();

    assert!(matches!(err, RagError::EmbeddingError { .. }), "{err}");
    assert_eq!(index.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn index_failure_propagates_before_source_lookup() {
    let kb = bone_knowledge_base().await;
    let graph = Arc::new(CountingGraph { inner: kb, calls: AtomicUsize::new(0) });
    let generator = Arc::new(CitingGenerator::default());
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        Arc::new(FailingIndex),
        graph.clone(),
        generator.clone(),
        AskConfig::default(),
    );

    let err = pipeline.ask("What happens to bones in space?").await.unwrap_err();

    match err {
        RagError::VectorIndexError { backend, message } => {
            assert_eq!(backend, "broken-index");
            assert!(message.contains("connection reset"), "{message}");
        }
        other => panic!("expected vector index error, got {other}"),
    }
    assert_eq!(graph.calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn graph_failure_propagates_before_generation() {
    let kb = bone_knowledge_base().await;
    let generator = Arc::new(CitingGenerator::default());
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb,
        Arc::new(FailingGraph),
        generator.clone(),
        AskConfig::default(),
    );

    let err = pipeline.ask("What happens to bones in space?").await.unwrap_err();

    match err {
        RagError::DocumentGraphError { backend, message } => {
            assert_eq!(backend, "broken-graph");
            assert!(message.contains("session expired"), "{message}");
        }
        other => panic!("expected document graph error, got {other}"),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn picks_the_single_most_similar_fragment() {
    let kb = bone_knowledge_base().await;
    let ocean = kb.add_document(Document::new("Ocean Chemistry").with_id("doc-ocean")).await;
    let ocean_text = "The ocean holds dissolved salt";
    kb.add_fragment(&ocean, Fragment::new(ocean_text, KeywordEmbedder::vector(ocean_text)))
        .await
        .unwrap();
    let generator = Arc::new(CitingGenerator::default());
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb.clone(),
        kb,
        generator.clone(),
        AskConfig::default(),
    );

    let result = pipeline.ask("Why is the ocean salty?").await.unwrap();

    assert_eq!(result.source().unwrap().id, "doc-ocean");
    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains(ocean_text));
    assert!(!prompts[0].contains(BONE_TEXT));
}

#[tokio::test]
async fn index_threshold_turns_weak_matches_into_no_context() {
    let kb = Arc::new(InMemoryKnowledgeBase::new().with_min_score(0.9));
    let doc = kb.add_document(Document::new("Bone Loss in Orbit")).await;
    kb.add_fragment(&doc, Fragment::new(BONE_TEXT, KeywordEmbedder::vector(BONE_TEXT)))
        .await
        .unwrap();
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb.clone(),
        kb,
        Arc::new(CitingGenerator::default()),
        AskConfig::default(),
    );

    let result = pipeline.ask("Is rust memory safe?").await.unwrap();

    assert_eq!(result.error(), Some(AnswerError::NoRelevantContext));
}

#[tokio::test(start_paused = true)]
async fn slow_generation_times_out_as_generation_failure() {
    let kb = bone_knowledge_base().await;
    let config = AskConfig::builder().stage_timeout(Duration::from_secs(5)).build().unwrap();
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb.clone(),
        kb,
        Arc::new(SlowGenerator),
        config,
    );

    let err = pipeline.ask("What happens to bones in space?").await.unwrap_err();

    match err {
        RagError::GenerationError { provider, message } => {
            assert_eq!(provider, "slow");
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected generation timeout, got {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn slow_embedding_times_out_as_embedding_failure() {
    let kb = bone_knowledge_base().await;
    let index = Arc::new(CountingIndex { inner: kb.clone(), calls: AtomicUsize::new(0) });
    let config = AskConfig::builder().stage_timeout(Duration::from_secs(5)).build().unwrap();
    let pipeline = pipeline(
        Arc::new(SlowEmbedder),
        index.clone(),
        kb,
        Arc::new(CitingGenerator::default()),
        config,
    );

    let err = pipeline.ask("What happens to bones in space?").await.unwrap_err();

    match err {
        RagError::EmbeddingError { provider, message } => {
            assert_eq!(provider, "slow-embedder");
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected embedding timeout, got {other}"),
    }
    assert_eq!(index.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_index_times_out_as_vector_index_failure() {
    let kb = bone_knowledge_base().await;
    let generator = Arc::new(CitingGenerator::default());
    let config = AskConfig::builder().stage_timeout(Duration::from_secs(5)).build().unwrap();
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        Arc::new(SlowIndex),
        kb,
        generator.clone(),
        config,
    );

    let err = pipeline.ask("What happens to bones in space?").await.unwrap_err();

    match err {
        RagError::VectorIndexError { backend, message } => {
            assert_eq!(backend, "slow-index");
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected vector index timeout, got {other}"),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_graph_times_out_as_document_graph_failure() {
    let kb = bone_knowledge_base().await;
    let generator = Arc::new(CitingGenerator::default());
    let config = AskConfig::builder().stage_timeout(Duration::from_secs(5)).build().unwrap();
    let pipeline = pipeline(
        Arc::new(KeywordEmbedder::default()),
        kb,
        Arc::new(SlowGraph),
        generator.clone(),
        config,
    );

    let err = pipeline.ask("What happens to bones in space?").await.unwrap_err();

    match err {
        RagError::DocumentGraphError { backend, message } => {
            assert_eq!(backend, "slow-graph");
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected document graph timeout, got {other}"),
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn concurrent_questions_run_independently() {
    let kb = bone_knowledge_base().await;
    let embedder = Arc::new(KeywordEmbedder::default());
    let pipeline = Arc::new(pipeline(
        embedder.clone(),
        kb.clone(),
        kb,
        Arc::new(CitingGenerator::default()),
        AskConfig::default(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.ask(&format!("bones in orbit #{i}")).await })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert!(result.is_answered());
    }
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 8);
}
