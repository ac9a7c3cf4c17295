//! ClinCode Embedding Generation
//!
//! This crate turns clinical text into dense vectors for similarity search
//! over a coded-concept index. The model itself is a black box selected by a
//! model identifier; we talk to it over HTTP.
//!
//! Two modes:
//!
//! - **API mode** - Call a remote inference endpoint (Hugging Face router,
//!   OpenAI-compatible servers, or a custom shape).
//! - **Stub mode** - Deterministic hash-derived vectors. No network, no model
//!   files. This is what the test suites run on.
//!
//! A failed embedding here is an error, never a silent stub: a made-up
//! vector would retrieve made-up diagnosis codes. Callers decide what to do
//! with the failure.
//!
//! The embedder pins the model's output dimension on the first successful
//! call and rejects any later vector of a different length, so a partially
//! re-configured endpoint can't quietly mix vector spaces.
//!
//! ## Quick example
//!
//! ```no_run
//! use embedding::{Embedder, EmbeddingConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = EmbeddingConfig {
//!         mode: "api".into(),
//!         api_url: Some("https://router.huggingface.co/hf-inference/models/sentence-transformers/all-mpnet-base-v2/pipeline/feature-extraction".into()),
//!         api_auth_header: Some("Bearer YOUR_HF_TOKEN".into()),
//!         ..Default::default()
//!     };
//!
//!     let embedder = Embedder::new(cfg).unwrap();
//!     let embedding = embedder.embed("persistent dry cough").await.unwrap();
//!     assert_eq!(embedding.vector.len(), embedding.dimension);
//! }
//! ```

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

mod api;
mod cache;
mod stub;

pub use crate::config::EmbeddingConfig;
pub use crate::error::EmbedError;
pub use crate::types::TextEmbedding;

use tokio::sync::OnceCell;

use crate::cache::EmbeddingCache;

/// Handle to a configured embedding model.
///
/// Construct once per process and share by reference (or `Arc`); the HTTP
/// client pools connections and the pinned dimension plus the vector cache
/// are shared across all callers. All methods take `&self` and are safe to
/// call concurrently.
pub struct Embedder {
    cfg: EmbeddingConfig,
    http: reqwest::Client,
    /// Output dimension, pinned by the first successful call.
    dimension: OnceCell<usize>,
    cache: Option<EmbeddingCache>,
}

impl Embedder {
    /// Build an embedder from the given configuration.
    ///
    /// This only constructs the HTTP client; no network traffic happens until
    /// the first [`embed`](Self::embed) call.
    pub fn new(cfg: EmbeddingConfig) -> Result<Self, EmbedError> {
        cfg.validate()?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.api_timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| EmbedError::InvalidConfig(format!("http client: {e}")))?;

        let cache = EmbeddingCache::with_capacity(cfg.cache_size);

        Ok(Self {
            cfg,
            http,
            dimension: OnceCell::new(),
            cache,
        })
    }

    /// The model name this embedder was configured with.
    pub fn model_name(&self) -> &str {
        &self.cfg.model_name
    }

    /// Output dimension, if at least one embedding has been produced.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get().copied()
    }

    /// Embed a single text.
    ///
    /// Fails with [`EmbedError::EmptyInput`] when `text` is empty after
    /// trimming. The vector is computed atomically: on any failure nothing is
    /// cached and no partial vector escapes.
    pub async fn embed(&self, text: &str) -> Result<TextEmbedding, EmbedError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EmbedError::EmptyInput);
        }

        if let Some(cache) = &self.cache {
            if let Some(vector) = cache.get(text) {
                return Ok(self.finish(vector));
            }
        }

        let mut vector = match self.cfg.mode.as_str() {
            "stub" => stub::make_stub_vector(text, self.cfg.dimension),
            _ => {
                let texts = [text.to_string()];
                let mut vectors = api::fetch_embeddings(&self.http, &self.cfg, &texts).await?;
                vectors
                    .pop()
                    .ok_or_else(|| EmbedError::Inference("endpoint returned no embedding".into()))?
            }
        };

        if self.cfg.normalize {
            l2_normalize_in_place(&mut vector);
        }
        self.check_dimension(vector.len()).await?;

        if let Some(cache) = &self.cache {
            cache.put(text, &vector);
        }

        Ok(self.finish(vector))
    }

    /// Embed several texts, preserving input order.
    ///
    /// API mode sends one batched request; stub mode computes locally. Either
    /// the whole batch succeeds or the call fails — per-text partial results
    /// are the caller's concern (issue separate [`embed`](Self::embed) calls
    /// for that).
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<TextEmbedding>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let trimmed: Vec<String> = texts.iter().map(|t| t.trim().to_string()).collect();
        if trimmed.iter().any(|t| t.is_empty()) {
            return Err(EmbedError::EmptyInput);
        }

        let vectors = match self.cfg.mode.as_str() {
            "stub" => trimmed
                .iter()
                .map(|t| stub::make_stub_vector(t, self.cfg.dimension))
                .collect(),
            _ => api::fetch_embeddings(&self.http, &self.cfg, &trimmed).await?,
        };

        if vectors.len() != trimmed.len() {
            return Err(EmbedError::Inference(format!(
                "endpoint returned {} embeddings for {} inputs",
                vectors.len(),
                trimmed.len()
            )));
        }

        let mut results = Vec::with_capacity(vectors.len());
        for (text, mut vector) in trimmed.into_iter().zip(vectors) {
            if self.cfg.normalize {
                l2_normalize_in_place(&mut vector);
            }
            self.check_dimension(vector.len()).await?;
            if let Some(cache) = &self.cache {
                cache.put(&text, &vector);
            }
            results.push(self.finish(vector));
        }
        Ok(results)
    }

    /// Pin the model dimension on first use; reject mismatches afterwards.
    /// Safe under concurrent first-call races: `OnceCell` admits one writer.
    async fn check_dimension(&self, got: usize) -> Result<(), EmbedError> {
        let expected = *self.dimension.get_or_init(|| async move { got }).await;
        if expected != got {
            return Err(EmbedError::DimensionMismatch { expected, got });
        }
        Ok(())
    }

    fn finish(&self, vector: Vec<f32>) -> TextEmbedding {
        let dimension = vector.len();
        TextEmbedding {
            vector,
            model_name: self.cfg.model_name.clone(),
            dimension,
            normalized: self.cfg.normalize,
        }
    }
}

/// In-place L2 normalization. Zero vectors are left untouched.
fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_embedder(dim: usize) -> Embedder {
        Embedder::new(EmbeddingConfig::stub(dim)).unwrap()
    }

    #[tokio::test]
    async fn stub_embedding_is_deterministic() {
        let embedder = stub_embedder(384);
        let a = embedder.embed("renal colic").await.unwrap();
        let b = embedder.embed("renal colic").await.unwrap();
        assert_eq!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn different_texts_differ() {
        let embedder = stub_embedder(384);
        let a = embedder.embed("cough").await.unwrap();
        let b = embedder.embed("fever").await.unwrap();
        assert_ne!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let embedder = stub_embedder(384);
        assert!(matches!(
            embedder.embed("   ").await,
            Err(EmbedError::EmptyInput)
        ));
        assert!(matches!(
            embedder.embed("").await,
            Err(EmbedError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn leading_whitespace_does_not_change_vector() {
        let embedder = stub_embedder(256);
        let a = embedder.embed("acute bronchitis").await.unwrap();
        let b = embedder.embed("  acute bronchitis  ").await.unwrap();
        assert_eq!(a.vector, b.vector);
    }

    #[tokio::test]
    async fn dimension_is_pinned_after_first_call() {
        let embedder = stub_embedder(512);
        assert_eq!(embedder.dimension(), None);
        embedder.embed("pneumonia").await.unwrap();
        assert_eq!(embedder.dimension(), Some(512));
    }

    #[tokio::test]
    async fn vectors_are_unit_length_when_normalized() {
        let embedder = stub_embedder(768);
        let e = embedder.embed("shortness of breath").await.unwrap();
        assert!(e.normalized);
        let norm: f32 = e.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_matches_single_calls() {
        let embedder = stub_embedder(384);
        let texts = vec!["cough".to_string(), "fever".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);

        let single = embedder.embed("fever").await.unwrap();
        assert_eq!(batch[1].vector, single.vector);
    }

    #[tokio::test]
    async fn batch_rejects_blank_member() {
        let embedder = stub_embedder(384);
        let texts = vec!["cough".to_string(), "  ".to_string()];
        assert!(matches!(
            embedder.embed_batch(&texts).await,
            Err(EmbedError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn batch_empty_is_empty() {
        let embedder = stub_embedder(384);
        let out = embedder.embed_batch(&[]).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn api_mode_without_url_fails_at_construction() {
        let cfg = EmbeddingConfig {
            mode: "api".into(),
            api_url: None,
            ..Default::default()
        };
        assert!(matches!(
            Embedder::new(cfg),
            Err(EmbedError::InvalidConfig(_))
        ));
    }

    #[test]
    fn l2_normalize_simple_vector() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize_in_place(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_zero_vector_untouched() {
        let mut v = vec![0.0f32, 0.0, 0.0];
        l2_normalize_in_place(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }
}
