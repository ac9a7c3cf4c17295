//! ClinCode Suggestion Engine
//!
//! The layer that ties decomposition, embedding, and index search into the
//! one operation callers actually want: free-text clinical narrative in,
//! ranked deduplicated diagnosis-code suggestions out.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use decompose::IdentityDecomposer;
//! use embedding::{Embedder, EmbeddingConfig};
//! use index::IndexBackendConfig;
//! use suggest::{SuggestConfig, SuggestionEngine};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let embedder = Arc::new(Embedder::new(EmbeddingConfig::default()).unwrap());
//! let idx = IndexBackendConfig::qdrant("http://localhost:6334").build().unwrap();
//! let engine = SuggestionEngine::new(
//!     embedder,
//!     idx,
//!     Arc::new(IdentityDecomposer),
//!     SuggestConfig::default(),
//! )
//! .unwrap();
//!
//! let suggestions = engine
//!     .suggest_codes("persistent dry cough and mild fever", 5, false)
//!     .await
//!     .unwrap();
//! for s in suggestions {
//!     println!("{} {} ({:.2})", s.code, s.description, s.score);
//! }
//! # });
//! ```
//!
//! Design points worth knowing:
//!
//! - Sub-queries are embedded and searched concurrently; one sub-query's
//!   failure is logged and treated as an empty candidate list as long as a
//!   sibling succeeds. Clinical text often mixes one well-phrased condition
//!   with one the model chokes on, and the caller should still get the good
//!   half.
//! - An empty suggestion list is a successful answer. Errors are reserved
//!   for requests the engine could not complete, and carry machine-readable
//!   kinds so "index not configured" never masquerades as "no matches".
//! - Per-invocation telemetry logs counts and timings only, never the
//!   clinical text.

pub mod engine;
pub mod error;
pub mod merge;
pub mod types;

pub use crate::engine::SuggestionEngine;
pub use crate::error::SuggestError;
pub use crate::merge::merge_candidates;
pub use crate::types::{
    ClinicalQuery, DetailedSuggestions, ErrorDetail, QueryBreakdown, SuggestConfig,
    SuggestEnvelope, SuggestionResult,
};
