//! Gemini embedding and generation providers using the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use crate::config::GeminiConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;

const PROVIDER: &str = "Gemini";

/// An [`EmbeddingProvider`] and [`GenerationProvider`] backed by Gemini.
///
/// Uses `reqwest` to call `:embedContent` and `:generateContent` directly.
///
/// # Example
///
/// ```rust,ignore
/// use rag_answer::{GeminiConfig, gemini::GeminiClient};
///
/// let client = GeminiClient::new(GeminiConfig::from_env()?)?;
/// let embedding = client.embed("hello world").await?;
/// ```
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
    embed_url: Url,
    generate_url: Url,
}

impl GeminiClient {
    /// Create a client from a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the config is invalid or the model
    /// names do not form valid endpoint URLs.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        config.validate()?;
        let embed_url = endpoint(&config.base_url, &config.embedding_model, "embedContent")?;
        let generate_url =
            endpoint(&config.base_url, &config.generation_model, "generateContent")?;
        Ok(Self { client: reqwest::Client::new(), config, embed_url, generate_url })
    }

    /// Create a client from the `GEMINI_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// The config this client was built from.
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// POST `body` to `url`, returning the response body on success.
    ///
    /// Failures are logged and turned into errors with `to_error`.
    async fn post(
        &self,
        url: &Url,
        body: &serde_json::Value,
        to_error: impl Fn(String) -> RagError + Send + Sync,
    ) -> Result<String> {
        let response = self
            .client
            .post(url.clone())
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                to_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to read response");
            to_error(format!("failed to read response: {e}"))
        })?;
        check_status(status, text, to_error)
    }
}

/// Pass a successful body through; map an error body to its API message.
fn check_status(
    status: reqwest::StatusCode,
    text: String,
    to_error: impl Fn(String) -> RagError,
) -> Result<String> {
    if status.is_success() {
        return Ok(text);
    }
    let detail =
        serde_json::from_str::<ErrorResponse>(&text).map(|e| e.error.message).unwrap_or(text);
    error!(provider = PROVIDER, %status, "API error");
    Err(to_error(format!("API returned {status}: {detail}")))
}

/// Add the `models/` prefix to a bare model name.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

/// Build `{base}{model}:{method}`.
fn endpoint(base_url: &str, model: &str, method: &str) -> Result<Url> {
    let model = model_path(model);
    let base = Url::parse(base_url)
        .map_err(|e| RagError::ConfigError(format!("invalid Gemini base URL '{base_url}': {e}")))?;
    base.join(&format!("{model}:{method}"))
        .map_err(|e| RagError::ConfigError(format!("invalid Gemini model name '{model}': {e}")))
}

// ── Gemini API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Extract the embedding vector from an `:embedContent` response body.
fn parse_embedding(body: &str) -> Result<Vec<f32>> {
    let response: EmbedContentResponse = serde_json::from_str(body)
        .map_err(|e| RagError::embedding(PROVIDER, format!("failed to parse response: {e}")))?;
    let values = response
        .embedding
        .map(|e| e.values)
        .ok_or_else(|| RagError::embedding(PROVIDER, "response has no embedding field"))?;
    if values.is_empty() {
        return Err(RagError::embedding(PROVIDER, "response embedding is empty"));
    }
    Ok(values)
}

/// Extract the answer text from a `:generateContent` response body.
fn parse_generation(body: &str) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| RagError::generation(PROVIDER, format!("failed to parse response: {e}")))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(RagError::generation(PROVIDER, format!("prompt rejected: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".to_string());
        return Err(RagError::generation(
            PROVIDER,
            format!("candidate has no text (finish reason {reason})"),
        ));
    }
    Ok(text)
}

// ── Provider implementations ───────────────────────────────────────

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(
            provider = PROVIDER,
            model = %self.config.embedding_model,
            text_len = text.len(),
            "embedding text"
        );

        let body = json!({
            "model": model_path(&self.config.embedding_model),
            "content": { "parts": [{ "text": text }] },
        });
        let response = self
            .post(&self.embed_url, &body, |message| RagError::embedding(PROVIDER, message))
            .await?;

        parse_embedding(&response)
    }

    fn dimensions(&self) -> usize {
        self.config.embedding_dimensions
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

#[async_trait]
impl GenerationProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            provider = PROVIDER,
            model = %self.config.generation_model,
            prompt_len = prompt.len(),
            "generating answer"
        );

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        let response = self
            .post(&self.generate_url, &body, |message| RagError::generation(PROVIDER, message))
            .await?;

        parse_generation(&response)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
