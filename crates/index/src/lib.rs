//! # ClinCode Index Client
//!
//! Backend-agnostic client for top-k similarity search over a fixed
//! vocabulary of coded clinical concepts (e.g., an ICD-10 code set), where
//! each indexed point is one code plus its human-readable descriptions.
//!
//! ## Core features
//!
//! - **Pluggable backends** behind the [`CodeIndex`] trait:
//!   - [`QdrantIndex`]: a remote Qdrant collection reached over gRPC. This is
//!     the production backend; building the collection (bulk upsert of
//!     embedded code descriptions) happens out-of-band.
//!   - [`InMemoryIndex`]: a full-scan cosine index for tests, benches, and
//!     ephemeral deployments.
//! - **Distinguishable failure**: a missing collection or unreachable index
//!   surfaces as a typed [`IndexError`], never as an empty result. "No
//!   matches" and "not configured" are different answers, and the second is
//!   the single most common operator mistake.
//! - **Bounded responses**: `limit` defaults to [`DEFAULT_SEARCH_LIMIT`] and
//!   is clamped to [`MAX_SEARCH_LIMIT`]; zero is rejected as an invalid
//!   request.
//!
//! Searches are read-only network round trips: idempotent and safe to retry.
//!
//! ## Example
//!
//! ```
//! use index::{CodeIndex, InMemoryIndex};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let idx = InMemoryIndex::new();
//! idx.insert_point("icd10", vec![1.0, 0.0], "R05", "Cough", "Cough");
//!
//! let hits = idx.search("icd10", &[1.0, 0.0], 5).await.unwrap();
//! assert_eq!(hits[0].code, "R05");
//! # });
//! ```

mod backend;
mod memory;
mod qdrant;

pub use backend::{CodeIndex, IndexBackendConfig};
pub use memory::InMemoryIndex;
pub use qdrant::QdrantIndex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of neighbors returned per search.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Hard ceiling on neighbors per search, bounding response size and latency.
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Cap `limit` at [`MAX_SEARCH_LIMIT`]. Oversized limits are clamped, not
/// rejected; zero is the caller's problem (see [`CodeIndex::search`]).
pub fn clamp_limit(limit: usize) -> usize {
    limit.min(MAX_SEARCH_LIMIT)
}

/// One retrieved neighbor: a coded concept with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeCandidate {
    /// Standardized code (e.g., `R05`).
    pub code: String,
    /// Short human-readable description stored with the point.
    pub short_description: String,
    /// Long-form description stored with the point; empty when the payload
    /// carries none.
    pub long_description: String,
    /// Similarity score, higher is more similar.
    pub score: f32,
}

/// Errors produced by the index client.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    /// The named collection does not exist on the backend.
    #[error("collection `{0}` does not exist")]
    CollectionMissing(String),
    /// The backend could not be reached at all.
    #[error("vector index unreachable: {0}")]
    Unreachable(String),
    /// The backend answered with an error.
    #[error("index backend error: {0}")]
    Backend(String),
    /// The request was malformed (e.g., zero limit, empty vector).
    #[error("invalid search request: {0}")]
    InvalidRequest(String),
}
