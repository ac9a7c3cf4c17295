use serde::{Deserialize, Serialize};

/// A computed embedding plus the metadata needed to interpret it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextEmbedding {
    /// Dense vector values.
    pub vector: Vec<f32>,
    /// Model that produced the vector.
    pub model_name: String,
    /// Length of [`vector`](Self::vector).
    pub dimension: usize,
    /// Whether the vector was L2-normalized.
    pub normalized: bool,
}
