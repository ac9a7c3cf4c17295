//! ClinCode Query Decomposition
//!
//! Clinical narrative routinely bundles several concerns into one sentence
//! ("persistent dry cough, mild fever, and shortness of breath"). Retrieval
//! works better when each concern is searched separately, so this crate
//! splits free text into short, independently searchable diagnostic phrases.
//!
//! The split is a strategy chosen at construction time:
//!
//! - [`LlmDecomposer`] asks a chat-completion endpoint to extract one
//!   diagnostic phrase per distinct condition. Any failure on that path
//!   degrades to the whole text as a single query; code suggestion must
//!   keep working without the optional enhancement, so `decompose` never
//!   returns an error.
//! - [`IdentityDecomposer`] is the always-available fallback: the trimmed
//!   input as a single query.
//!
//! Both implementations uphold the same output invariant: every returned
//! query is non-empty after trimming, duplicates are dropped
//! case-insensitively, and at most [`MAX_SUB_QUERIES`] queries are kept in
//! their original order.

pub mod config;

mod llm;

pub use crate::config::DecomposeConfig;
pub use crate::llm::LlmDecomposer;

use async_trait::async_trait;
use thiserror::Error;

/// Cap on sub-queries per invocation, bounding downstream fan-out cost.
pub const MAX_SUB_QUERIES: usize = 5;

/// Strategy interface for splitting clinical text into search queries.
#[async_trait]
pub trait QueryDecomposer: Send + Sync {
    /// Split `text` into 0..=[`MAX_SUB_QUERIES`] trimmed, non-empty,
    /// deduplicated queries. Infallible by contract: implementations absorb
    /// their own failures and fall back to the identity split.
    async fn decompose(&self, text: &str) -> Vec<String>;

    /// Short label for observability.
    fn strategy(&self) -> &'static str;
}

/// Errors raised while constructing or driving the LLM path. These never
/// escape [`QueryDecomposer::decompose`]; they surface only from
/// constructors and in logs.
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("invalid decompose config: {0}")]
    InvalidConfig(String),
    #[error("completion request failed: {0}")]
    Request(String),
    #[error("unusable completion response: {0}")]
    Response(String),
}

/// The no-op strategy: the whole text as one query.
pub struct IdentityDecomposer;

#[async_trait]
impl QueryDecomposer for IdentityDecomposer {
    async fn decompose(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    }

    fn strategy(&self) -> &'static str {
        "identity"
    }
}

/// Enforce the shared output invariant: trim, drop empties, case-insensitive
/// dedup, cap at [`MAX_SUB_QUERIES`] keeping the original order.
pub(crate) fn normalize_queries<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut queries = Vec::new();
    for query in raw {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            continue;
        }
        let lowered = trimmed.to_lowercase();
        if seen.contains(&lowered) {
            continue;
        }
        seen.push(lowered);
        queries.push(trimmed.to_string());
        if queries.len() == MAX_SUB_QUERIES {
            break;
        }
    }
    queries
}
