//! # Ask Basic Example
//!
//! Demonstrates the ask pipeline end to end: store a few documents, then ask
//! questions against them.
//!
//! Uses `InMemoryKnowledgeBase`, a deterministic `MockEmbeddingProvider`, and
//! an `ExtractiveModel` that quotes the context, so it runs with **zero API keys**.
//!
//! Run: `cargo run -p rag-answer --example ask_basic`

use std::sync::Arc;

use rag_answer::{
    AnswerResult, AskConfig, AskPipeline, Document, EmbeddingProvider, Fragment,
    GenerationProvider, InMemoryKnowledgeBase, LogFormat, init_tracing,
};

// ---------------------------------------------------------------------------
// MockEmbeddingProvider: character-trigram embeddings for demos
// ---------------------------------------------------------------------------

struct MockEmbeddingProvider {
    dimensions: usize,
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> rag_answer::Result<Vec<f32>> {
        // Hash each lowercase trigram into a bucket so texts sharing words
        // point in similar directions.
        let lower: Vec<char> = text.to_lowercase().chars().collect();
        let mut emb = vec![0.0f32; self.dimensions];
        for window in lower.windows(3) {
            let hash =
                window.iter().fold(0u64, |acc, c| acc.wrapping_mul(31).wrapping_add(*c as u64));
            emb[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        // L2-normalise so cosine similarity is just the dot product.
        let norm: f32 = emb.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            emb.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(emb)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "mock-trigram"
    }
}

// ---------------------------------------------------------------------------
// ExtractiveModel: "answers" by quoting the context and the citation line
// ---------------------------------------------------------------------------

struct ExtractiveModel;

#[async_trait::async_trait]
impl GenerationProvider for ExtractiveModel {
    async fn generate(&self, prompt: &str) -> rag_answer::Result<String> {
        let context = prompt.split("---\n").nth(1).map(str::trim).unwrap_or_default();
        let citation = prompt
            .rsplit_once("citation line: \"")
            .map(|(_, rest)| rest.trim_end().trim_end_matches('"'))
            .unwrap_or_default();
        Ok(format!("{context}.\n{citation}"))
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info", LogFormat::Pretty)?;

    let embedder = Arc::new(MockEmbeddingProvider { dimensions: 128 });
    let kb = Arc::new(InMemoryKnowledgeBase::new().with_min_score(0.2));

    // -- 1. Store documents and their fragments ---------------------------
    let corpus = [
        (
            "Bone Loss in Orbit",
            Some("http://example.org/bone"),
            vec![
                "Microgravity reduces bone density by one to two percent per month",
                "Resistance exercise on the station slows bone loss",
            ],
        ),
        (
            "Ocean Chemistry Basics",
            Some("http://example.org/ocean"),
            vec!["Seawater is salty because rivers carry dissolved minerals into the ocean"],
        ),
        ("Untitled field notes", None, vec!["Tidal pools host anemones and small crabs"]),
    ];

    for (title, link, texts) in corpus {
        let mut document = Document::new(title);
        if let Some(link) = link {
            document = document.with_link(link);
        }
        let document_id = kb.add_document(document).await;
        for text in texts {
            let embedding = embedder.embed(text).await?;
            kb.add_fragment(&document_id, Fragment::new(text, embedding)).await?;
        }
    }
    println!(
        "Stored {} documents / {} fragments",
        kb.document_count().await,
        kb.fragment_count().await
    );

    // -- 2. Build the pipeline --------------------------------------------
    let config = AskConfig::builder()
        .generation_fallback("The answer service is busy, please try again.")
        .build()?;
    let pipeline = AskPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .vector_index(kb.clone())
        .document_graph(kb)
        .generation_provider(Arc::new(ExtractiveModel))
        .build()?;

    // -- 3. Ask -----------------------------------------------------------
    let questions = [
        "What happens to bone density in microgravity?",
        "Why is seawater salty?",
        "Who won the 1998 world cup?",
    ];

    for question in questions {
        println!("\nQ: {question}");
        match pipeline.ask(question).await? {
            AnswerResult::Answered { answer, .. } => println!("A: {answer}"),
            AnswerResult::Degraded { answer, .. } => println!("A (degraded): {answer}"),
            AnswerResult::Unanswered(reason) => {
                println!("A: {} [{}]", reason.user_message(), reason.code())
            }
        }
    }

    Ok(())
}
