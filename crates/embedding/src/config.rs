use serde::{Deserialize, Serialize};

use crate::error::EmbedError;
use crate::retry::RetryConfig;

/// Runtime configuration describing which embedding model to use and how to
/// post-process vectors.
///
/// Swapping `model_name` (or the endpoint behind `api_url`) changes the
/// vector space and invalidates any index built with the previous model;
/// the [`Embedder`](crate::Embedder) enforces only dimensional consistency
/// within one process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Inference mode selector: `"api"` (remote HTTP) or `"stub"`
    /// (deterministic, offline).
    pub mode: String,
    /// Model identifier, surfaced on every [`TextEmbedding`](crate::TextEmbedding)
    /// and sent to OpenAI-shaped endpoints.
    pub model_name: String,
    /// Inference endpoint when [`mode`](Self::mode) is `"api"`.
    pub api_url: Option<String>,
    /// Authorization header value (e.g., `"Bearer hf_xxx"`).
    pub api_auth_header: Option<String>,
    /// Remote provider hint: `"hf"`, `"openai"`, or `"custom"` (default).
    pub api_provider: Option<String>,
    /// Overall per-request timeout in seconds.
    pub api_timeout_secs: u64,
    /// Normalize vectors to unit length (recommended for cosine similarity).
    pub normalize: bool,
    /// Vector dimension used by stub mode. API mode discovers the dimension
    /// from the first response instead.
    pub dimension: usize,
    /// Embedding LRU cache capacity in entries; `0` disables caching.
    pub cache_size: usize,
    /// Retry policy for API calls; `None` uses the default policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: "api".into(),
            model_name: "sentence-transformers/all-mpnet-base-v2".into(),
            api_url: None,
            api_auth_header: None,
            api_provider: None,
            api_timeout_secs: 30,
            normalize: true,
            dimension: 768,
            cache_size: 1024,
            retry: None,
        }
    }
}

impl EmbeddingConfig {
    /// Offline deterministic configuration for tests and air-gapped runs.
    pub fn stub(dimension: usize) -> Self {
        Self {
            mode: "stub".into(),
            model_name: "stub".into(),
            dimension,
            cache_size: 0,
            ..Default::default()
        }
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), EmbedError> {
        match self.mode.as_str() {
            "stub" => {
                if self.dimension == 0 {
                    return Err(EmbedError::InvalidConfig(
                        "stub mode requires a non-zero dimension".into(),
                    ));
                }
            }
            "api" => {
                if self.api_url.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(EmbedError::InvalidConfig(
                        "api mode requires api_url".into(),
                    ));
                }
            }
            other => {
                return Err(EmbedError::InvalidConfig(format!(
                    "unknown embedding mode `{other}` (expected `api` or `stub`)"
                )));
            }
        }
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        Ok(())
    }
}
