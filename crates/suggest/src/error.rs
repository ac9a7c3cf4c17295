use embedding::EmbedError;
use index::IndexError;
use thiserror::Error;

/// Errors surfaced by the suggestion engine.
///
/// Failures local to one sub-query are absorbed and logged as long as a
/// sibling succeeds; what reaches callers is either an input problem, the
/// typed cause of a single-path failure, or the aggregate when every
/// sub-query failed for unrelated reasons.
#[derive(Debug, Error)]
pub enum SuggestError {
    /// The request itself is malformed; retrying without changing the input
    /// will not help.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The embedding model was unavailable or failed to encode.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbedError),
    /// The vector index or its collection is missing or unreachable — an
    /// operator configuration issue, deliberately distinct from "no matches".
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    /// Every sub-query failed; carries each cause for diagnosis.
    #[error("all {} sub-queries failed; first cause: {}", .causes.len(), .causes.first().map(String::as_str).unwrap_or("unknown"))]
    AllSubQueriesFailed { causes: Vec<String> },
}

impl SuggestError {
    /// Stable machine-readable kind for the response envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            SuggestError::InvalidInput(_) => "INVALID_INPUT",
            SuggestError::Embedding(_) => "EMBEDDING_ERROR",
            SuggestError::Index(_) => "INDEX_UNAVAILABLE",
            SuggestError::AllSubQueriesFailed { .. } => "SUGGESTION_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            SuggestError::InvalidInput("x".into()).kind(),
            "INVALID_INPUT"
        );
        assert_eq!(
            SuggestError::Embedding(EmbedError::EmptyInput).kind(),
            "EMBEDDING_ERROR"
        );
        assert_eq!(
            SuggestError::Index(IndexError::CollectionMissing("c".into())).kind(),
            "INDEX_UNAVAILABLE"
        );
        assert_eq!(
            SuggestError::AllSubQueriesFailed { causes: vec![] }.kind(),
            "SUGGESTION_FAILED"
        );
    }

    #[test]
    fn aggregate_names_first_cause() {
        let err = SuggestError::AllSubQueriesFailed {
            causes: vec!["embedding error: boom".into(), "index error: down".into()],
        };
        let message = err.to_string();
        assert!(message.contains("2 sub-queries"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn index_errors_convert_transparently() {
        let err: SuggestError = IndexError::Unreachable("refused".into()).into();
        assert_eq!(err.kind(), "INDEX_UNAVAILABLE");
        assert!(err.to_string().contains("refused"));
    }
}
