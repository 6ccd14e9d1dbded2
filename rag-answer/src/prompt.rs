//! Prompt assembly for grounded answers.

use crate::document::SourceRef;

/// Build the instruction prompt sent to the generation provider.
///
/// The prompt confines the model to `context`, embeds the context and the
/// question verbatim, and requires a closing citation line naming the
/// source title and link. The output depends only on the arguments.
///
/// # Example
///
/// ```rust
/// use rag_answer::{SourceRef, build_prompt};
///
/// let source = SourceRef {
///     id: "doc-1".into(),
///     title: "Bone Loss in Orbit".into(),
///     link: Some("http://example.org/bone".into()),
/// };
/// let prompt = build_prompt("Why?", "Microgravity reduces bone density", &source);
/// assert!(prompt.contains("Source: Bone Loss in Orbit (http://example.org/bone)"));
/// ```
pub fn build_prompt(question: &str, context: &str, source: &SourceRef) -> String {
    let citation = citation_line(source);
    format!(
        "You are an expert assistant. Answer the user's question using only the context below.\n\
         \n\
         Context:\n\
         ---\n\
         {context}\n\
         ---\n\
         Question: \"{question}\"\n\
         \n\
         Instructions:\n\
         1. Answer clearly and concisely.\n\
         2. Base your answer only on the context. Do not add outside knowledge.\n\
         3. End your answer with this exact citation line: \"{citation}\"\n"
    )
}

/// The citation line the model is told to end with.
pub fn citation_line(source: &SourceRef) -> String {
    match &source.link {
        Some(link) => format!("Source: {} ({link})", source.title),
        None => format!("Source: {}", source.title),
    }
}
