//! Umbrella crate for ClinCode, a semantic diagnosis-code suggestion engine.
//!
//! Callers submit free-text clinical narrative and get back a ranked,
//! deduplicated list of standardized diagnosis codes with confidence scores.
//! The work is split across four focused crates, re-exported here:
//!
//! - [`embedding`]: text → fixed-dimension dense vector, over a remote
//!   inference endpoint (or a deterministic stub for tests).
//! - [`index`]: top-k similarity search over a fixed vocabulary of coded
//!   concepts, backed by Qdrant or an in-memory full scan.
//! - [`decompose`]: optional LLM-backed splitting of multi-condition text
//!   into separate searchable phrases, with an identity fallback.
//! - [`suggest`]: the engine that ties the above into `suggest_codes`.
//!
//! This crate adds the composite configuration (YAML + environment
//! overrides) and the wiring that turns a [`ClincodeConfig`] into a ready
//! [`SuggestionEngine`].
//!
//! ```no_run
//! use clincode::{build_engine, ClincodeConfig};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let cfg = ClincodeConfig::load(None).unwrap();
//! let engine = build_engine(&cfg).unwrap();
//! let suggestions = engine
//!     .suggest_codes("persistent dry cough, mild fever", 5, false)
//!     .await
//!     .unwrap();
//! # });
//! ```

pub mod config;

pub use crate::config::{ClincodeConfig, ConfigError};

pub use decompose::{
    DecomposeConfig, IdentityDecomposer, LlmDecomposer, QueryDecomposer, MAX_SUB_QUERIES,
};
pub use embedding::{Embedder, EmbeddingConfig, TextEmbedding};
pub use index::{
    CodeCandidate, CodeIndex, InMemoryIndex, IndexBackendConfig, IndexError, QdrantIndex,
    DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
pub use suggest::{
    merge_candidates, ClinicalQuery, DetailedSuggestions, ErrorDetail, SuggestConfig,
    SuggestEnvelope, SuggestError, SuggestionEngine, SuggestionResult,
};

use std::sync::Arc;

/// Wire a [`SuggestionEngine`] from a composite configuration.
///
/// The decomposer is capability-checked here: with no LLM endpoint
/// configured (or an unusable one) the engine gets the identity strategy,
/// and construction never fails on account of the optional enhancement.
pub fn build_engine(cfg: &ClincodeConfig) -> Result<SuggestionEngine, ConfigError> {
    let embedder = Arc::new(
        Embedder::new(cfg.embedding.clone())
            .map_err(|e| ConfigError::Validation(e.to_string()))?,
    );

    let index = cfg
        .index
        .build()
        .map_err(|e| ConfigError::Validation(e.to_string()))?;

    let decomposer: Arc<dyn QueryDecomposer> = if cfg.decompose.enabled() {
        match LlmDecomposer::new(cfg.decompose.clone()) {
            Ok(llm) => Arc::new(llm),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "LLM decomposer unavailable; falling back to identity strategy"
                );
                Arc::new(IdentityDecomposer)
            }
        }
    } else {
        Arc::new(IdentityDecomposer)
    };

    SuggestionEngine::new(embedder, index, decomposer, cfg.suggest.clone())
        .map_err(|e| ConfigError::Validation(e.to_string()))
}
