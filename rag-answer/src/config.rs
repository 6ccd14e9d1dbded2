//! Configuration for the ask pipeline and its providers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for [`AskPipeline`](crate::AskPipeline).
///
/// Every field is optional; the default pipeline waits on providers
/// indefinitely and propagates generation failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AskConfig {
    /// Deadline in milliseconds applied to each external call
    /// (embedding, index query, graph lookup, generation).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_timeout_ms: Option<u64>,
    /// When set, a generation failure is answered with this message and
    /// reported as [`AnswerResult::Degraded`](crate::AnswerResult::Degraded)
    /// instead of an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_fallback: Option<String>,
}

impl AskConfig {
    /// Create a new builder for constructing an [`AskConfig`].
    pub fn builder() -> AskConfigBuilder {
        AskConfigBuilder::default()
    }

    /// The per-stage deadline, if one is configured.
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }
}

/// Builder for constructing a validated [`AskConfig`].
#[derive(Debug, Clone, Default)]
pub struct AskConfigBuilder {
    config: AskConfig,
}

impl AskConfigBuilder {
    /// Bound every external call by `timeout`, rounded up to whole milliseconds.
    pub fn stage_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.config.stage_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    /// Answer with `message` when the generation provider fails.
    pub fn generation_fallback(mut self, message: impl Into<String>) -> Self {
        self.config.generation_fallback = Some(message.into());
        self
    }

    /// Build the [`AskConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - the stage timeout is zero
    /// - the generation fallback is blank
    pub fn build(self) -> Result<AskConfig> {
        if self.config.stage_timeout_ms == Some(0) {
            return Err(RagError::ConfigError(
                "stage timeout must be greater than zero".to_string(),
            ));
        }
        if self.config.generation_fallback.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(RagError::ConfigError("generation fallback must not be blank".to_string()));
        }
        Ok(self.config)
    }
}

/// Default Generative Language API endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// Default embedding model.
pub const GEMINI_EMBEDDING_MODEL: &str = "models/text-embedding-004";

/// Default generation model.
pub const GEMINI_GENERATION_MODEL: &str = "models/gemini-2.5-flash";

/// Output size of `text-embedding-004`.
pub const GEMINI_EMBEDDING_DIMENSIONS: usize = 768;

/// Connection settings for the Gemini embedding and generation models.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Embedding model name, e.g. `models/text-embedding-004`.
    pub embedding_model: String,
    /// Generation model name, e.g. `models/gemini-2.5-flash`.
    pub generation_model: String,
    /// API base URL; must end with a slash.
    pub base_url: String,
    /// Length of the vectors produced by `embedding_model`.
    pub embedding_dimensions: usize,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("embedding_model", &self.embedding_model)
            .field("generation_model", &self.generation_model)
            .field("base_url", &self.base_url)
            .field("embedding_dimensions", &self.embedding_dimensions)
            .finish()
    }
}

impl GeminiConfig {
    /// Create a config with the default models and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            embedding_model: GEMINI_EMBEDDING_MODEL.to_string(),
            generation_model: GEMINI_GENERATION_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
            embedding_dimensions: GEMINI_EMBEDDING_DIMENSIONS,
        }
    }

    /// Load the config from the environment.
    ///
    /// `GEMINI_API_KEY` is required; `GEMINI_EMBEDDING_MODEL`,
    /// `GEMINI_GENERATION_MODEL`, `GEMINI_BASE_URL` and
    /// `GEMINI_EMBEDDING_DIMENSIONS` override the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the API key is missing or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("GEMINI_API_KEY")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RagError::ConfigError("GEMINI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Some(model) = lookup("GEMINI_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Some(model) = lookup("GEMINI_GENERATION_MODEL") {
            config.generation_model = model;
        }
        if let Some(url) = lookup("GEMINI_BASE_URL") {
            config.base_url = url;
        }
        if let Some(dims) = lookup("GEMINI_EMBEDDING_DIMENSIONS") {
            config.embedding_dimensions = dims.parse().map_err(|_| {
                RagError::ConfigError(format!(
                    "GEMINI_EMBEDDING_DIMENSIONS is not a number: '{dims}'"
                ))
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the config can be used to build a client.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the API key or a model name is empty,
    /// the base URL lacks a trailing slash, or the dimension is zero.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".to_string()));
        }
        if self.embedding_model.is_empty() || self.generation_model.is_empty() {
            return Err(RagError::ConfigError("Gemini model names must not be empty".to_string()));
        }
        if !self.base_url.ends_with('/') {
            return Err(RagError::ConfigError(format!(
                "Gemini base URL must end with '/': '{}'",
                self.base_url
            )));
        }
        if self.embedding_dimensions == 0 {
            return Err(RagError::ConfigError(
                "embedding dimensions must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
