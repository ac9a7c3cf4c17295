use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{CodeCandidate, InMemoryIndex, IndexError, QdrantIndex};

/// A searchable index of coded concepts.
///
/// Implementations must order results by descending similarity score and
/// respect the crate-wide limit clamp. `search` must fail with
/// [`IndexError::CollectionMissing`] when the named collection does not
/// exist rather than returning an empty list.
#[async_trait]
pub trait CodeIndex: Send + Sync {
    /// Return up to `limit` nearest neighbors of `vector` in `collection`.
    ///
    /// `limit` must be positive; values above the clamp are capped.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<CodeCandidate>, IndexError>;

    /// Whether the named collection exists on the backend.
    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError>;
}

/// Configuration for selecting and building an index backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum IndexBackendConfig {
    /// Remote Qdrant instance.
    Qdrant {
        /// gRPC endpoint, e.g. `http://localhost:6334`.
        url: String,
        /// Optional API key.
        #[serde(default)]
        api_key: Option<String>,
        /// Per-call timeout in seconds.
        #[serde(default = "IndexBackendConfig::default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Process-local full-scan index, for tests and ephemeral use.
    InMemory,
}

impl IndexBackendConfig {
    fn default_timeout_secs() -> u64 {
        10
    }

    /// Qdrant backend at the given endpoint.
    pub fn qdrant<U: Into<String>>(url: U) -> Self {
        IndexBackendConfig::Qdrant {
            url: url.into(),
            api_key: None,
            timeout_secs: Self::default_timeout_secs(),
        }
    }

    /// In-memory backend.
    pub fn in_memory() -> Self {
        IndexBackendConfig::InMemory
    }

    /// Build the configured backend.
    pub fn build(&self) -> Result<Arc<dyn CodeIndex>, IndexError> {
        match self {
            IndexBackendConfig::InMemory => Ok(Arc::new(InMemoryIndex::new())),
            IndexBackendConfig::Qdrant {
                url,
                api_key,
                timeout_secs,
            } => {
                let index = QdrantIndex::new(
                    url,
                    api_key.as_deref(),
                    Duration::from_secs(*timeout_secs),
                )?;
                Ok(Arc::new(index))
            }
        }
    }
}

impl Default for IndexBackendConfig {
    fn default() -> Self {
        IndexBackendConfig::qdrant("http://localhost:6334")
    }
}
