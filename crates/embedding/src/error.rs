use thiserror::Error;

/// Errors surfaced by the embedding generator.
#[derive(Debug, Clone, Error)]
pub enum EmbedError {
    /// The input text is empty after trimming.
    #[error("input text is empty")]
    EmptyInput,
    /// Configuration is inconsistent (e.g., api mode without an endpoint).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
    /// Transport-level failure reaching the inference endpoint.
    #[error("embedding request failed: {0}")]
    Request(String),
    /// The endpoint answered but the response was unusable.
    #[error("embedding inference failed: {0}")]
    Inference(String),
    /// The endpoint returned a vector of a different length than the one
    /// pinned on first use.
    #[error("embedding dimension changed: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
