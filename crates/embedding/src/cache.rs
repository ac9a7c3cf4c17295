use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Bounded text → vector cache.
///
/// Embeddings are deterministic for a fixed model, so caching is transparent
/// to callers. Keyed by the trimmed input text; one cache per [`Embedder`]
/// (and therefore per model), so keys never cross vector spaces.
///
/// [`Embedder`]: crate::Embedder
pub(crate) struct EmbeddingCache {
    inner: Mutex<LruCache<String, Vec<f32>>>,
}

impl EmbeddingCache {
    /// Returns `None` when `capacity` is zero (caching disabled).
    pub(crate) fn with_capacity(capacity: usize) -> Option<Self> {
        let capacity = NonZeroUsize::new(capacity)?;
        Some(Self {
            inner: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub(crate) fn get(&self, text: &str) -> Option<Vec<f32>> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.get(text).cloned()
    }

    pub(crate) fn put(&self, text: &str, vector: &[f32]) {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.put(text.to_string(), vector.to_vec());
    }
}
