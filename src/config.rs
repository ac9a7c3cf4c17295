//! Composite configuration for the ClinCode engine.
//!
//! One YAML file configures every stage. Environment variables override the
//! secrets and endpoints that differ between deployments, so the file itself
//! can stay free of credentials.
//!
//! ## Example YAML configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "icd10 production"
//!
//! embedding:
//!   mode: "api"
//!   model_name: "sentence-transformers/all-mpnet-base-v2"
//!   api_url: "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-mpnet-base-v2/pipeline/feature-extraction"
//!   api_provider: "hf"
//!   api_timeout_secs: 30
//!   normalize: true
//!   dimension: 768
//!   cache_size: 1024
//!
//! index:
//!   backend: "qdrant"
//!   url: "http://localhost:6334"
//!   timeout_secs: 10
//!
//! decompose:
//!   api_url: null          # unset disables LLM refinement
//!   model: "gemini-2.0-flash"
//!   timeout_secs: 20
//!
//! suggest:
//!   collection: "icd_mpnet_basev2"
//!   default_limit: 5
//! ```
//!
//! ## Environment overrides
//!
//! | Variable | Effect |
//! |---|---|
//! | `CLINCODE_EMBEDDING_API_URL` | embedding endpoint |
//! | `CLINCODE_EMBEDDING_API_TOKEN` | bearer token for the embedding endpoint |
//! | `CLINCODE_QDRANT_URL` | qdrant endpoint |
//! | `CLINCODE_QDRANT_API_KEY` | qdrant api key |
//! | `CLINCODE_LLM_API_URL` | chat endpoint; setting it enables refinement |
//! | `CLINCODE_LLM_API_KEY` | bearer token for the chat endpoint |
//! | `CLINCODE_COLLECTION` | index collection name |

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use decompose::DecomposeConfig;
use embedding::EmbeddingConfig;
use index::IndexBackendConfig;
use suggest::SuggestConfig;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration covering every stage of the suggestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ClincodeConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional deployment label.
    #[serde(default)]
    pub name: Option<String>,

    /// Embedding generator configuration.
    #[serde(default = "ClincodeConfig::default_embedding")]
    pub embedding: EmbeddingConfig,

    /// Vector index backend configuration.
    #[serde(default)]
    pub index: IndexBackendConfig,

    /// Query decomposition configuration.
    #[serde(default)]
    pub decompose: DecomposeConfig,

    /// Suggestion engine configuration.
    #[serde(default)]
    pub suggest: SuggestConfig,
}

impl Default for ClincodeConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            embedding: Self::default_embedding(),
            index: IndexBackendConfig::default(),
            decompose: DecomposeConfig::default(),
            suggest: SuggestConfig::default(),
        }
    }
}

impl ClincodeConfig {
    /// Default embedding section: the mpnet sentence model behind the
    /// Hugging Face inference router, matching the model the default
    /// collection was embedded with.
    fn default_embedding() -> EmbeddingConfig {
        EmbeddingConfig {
            api_url: Some(
                "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-mpnet-base-v2/pipeline/feature-extraction"
                    .into(),
            ),
            api_provider: Some("hf".into()),
            ..Default::default()
        }
    }

    /// Fully-offline configuration: stub embeddings and an in-memory index.
    /// Used by tests and benches; also handy for demos.
    pub fn offline(dimension: usize) -> Self {
        Self {
            embedding: EmbeddingConfig::stub(dimension),
            index: IndexBackendConfig::in_memory(),
            ..Default::default()
        }
    }

    /// Load configuration: the given file (or defaults when `None`), then
    /// environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                serde_yaml::from_str::<ClincodeConfig>(&content)?
            }
            None => ClincodeConfig::default(),
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse configuration from a YAML string and validate it. No
    /// environment overrides are applied.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: ClincodeConfig = serde_yaml::from_str(yaml)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `CLINCODE_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("CLINCODE_EMBEDDING_API_URL") {
            self.embedding.api_url = Some(url);
        }
        if let Ok(token) = env::var("CLINCODE_EMBEDDING_API_TOKEN") {
            self.embedding.api_auth_header = Some(format!("Bearer {token}"));
        }
        if let Ok(url) = env::var("CLINCODE_QDRANT_URL") {
            self.index = match self.index.clone() {
                IndexBackendConfig::Qdrant {
                    api_key,
                    timeout_secs,
                    ..
                } => IndexBackendConfig::Qdrant {
                    url,
                    api_key,
                    timeout_secs,
                },
                IndexBackendConfig::InMemory => IndexBackendConfig::qdrant(url),
            };
        }
        if let Ok(key) = env::var("CLINCODE_QDRANT_API_KEY") {
            if let IndexBackendConfig::Qdrant { api_key, .. } = &mut self.index {
                *api_key = Some(key);
            }
        }
        if let Ok(url) = env::var("CLINCODE_LLM_API_URL") {
            self.decompose.api_url = Some(url);
        }
        if let Ok(key) = env::var("CLINCODE_LLM_API_KEY") {
            self.decompose.api_key = Some(key);
        }
        if let Ok(collection) = env::var("CLINCODE_COLLECTION") {
            self.suggest.collection = collection;
        }
    }

    /// Validate the configuration as a whole.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.version.as_str() {
            "1" | "1.0" => {}
            other => return Err(ConfigError::UnsupportedVersion(other.to_string())),
        }

        self.embedding
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        // The decompose section only needs to be coherent when enabled;
        // absence of an LLM must never fail startup.
        if self.decompose.enabled() {
            self.decompose
                .validate()
                .map_err(|e| ConfigError::Validation(e.to_string()))?;
        }

        self.suggest
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(())
    }
}
