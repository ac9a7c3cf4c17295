use index::CodeCandidate;
use serde::{Deserialize, Serialize};

use crate::error::SuggestError;

/// A validated invocation: the raw narrative plus the sub-queries actually
/// searched. Holds exactly one sub-query unless decomposition ran and
/// produced more; every sub-query is non-empty after trimming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalQuery {
    /// The caller's narrative, trimmed.
    pub raw_text: String,
    /// The queries searched against the index, in decomposition order.
    pub sub_queries: Vec<String>,
}

impl ClinicalQuery {
    /// The undecomposed form: the whole text as the single sub-query.
    pub fn single(raw_text: &str) -> Self {
        let trimmed = raw_text.trim().to_string();
        Self {
            sub_queries: vec![trimmed.clone()],
            raw_text: trimmed,
        }
    }
}

/// One ranked suggestion in the final answer, unique by `code`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionResult {
    /// Standardized diagnosis code (e.g., `R05`).
    pub code: String,
    /// Human-readable description of the code.
    pub description: String,
    /// Similarity score of the best-matching sub-query.
    pub score: f32,
    /// The sub-query that produced the kept score.
    pub matched_query: String,
}

/// Engine-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestConfig {
    /// Index collection holding the embedded code vocabulary.
    pub collection: String,
    /// Limit applied when the caller passes none of their own.
    pub default_limit: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            collection: "icd_mpnet_basev2".into(),
            default_limit: index::DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SuggestConfig {
    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<(), SuggestError> {
        if self.collection.trim().is_empty() {
            return Err(SuggestError::InvalidInput(
                "collection must not be empty".into(),
            ));
        }
        if self.default_limit == 0 {
            return Err(SuggestError::InvalidInput(
                "default_limit must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Per-sub-query breakdown produced by
/// [`suggest_codes_detailed`](crate::SuggestionEngine::suggest_codes_detailed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryBreakdown {
    /// The sub-query that was searched.
    pub query: String,
    /// Raw candidates for this sub-query, pre-merge.
    pub candidates: Vec<CodeCandidate>,
    /// Failure message when this sub-query could not be searched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detailed response: what each sub-query retrieved plus the merged answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailedSuggestions {
    /// The sub-queries that were searched, in decomposition order.
    pub queries: Vec<String>,
    /// Per-sub-query results and failures.
    pub by_query: Vec<QueryBreakdown>,
    /// The merged, deduplicated, ranked answer.
    pub merged: Vec<SuggestionResult>,
}

/// Machine-readable error descriptor for the response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDetail {
    /// Stable error kind (e.g., `INDEX_UNAVAILABLE`).
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

/// Success/error envelope for callers that speak JSON: exactly one of the
/// two arms is ever populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SuggestEnvelope {
    Success { suggestions: Vec<SuggestionResult> },
    Error { error: ErrorDetail },
}

impl SuggestEnvelope {
    pub fn from_result(result: Result<Vec<SuggestionResult>, SuggestError>) -> Self {
        match result {
            Ok(suggestions) => SuggestEnvelope::Success { suggestions },
            Err(err) => SuggestEnvelope::Error {
                error: ErrorDetail {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                },
            },
        }
    }
}
