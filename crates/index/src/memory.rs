use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::{clamp_limit, CodeCandidate, CodeIndex, IndexError};

struct StoredPoint {
    vector: Vec<f32>,
    code: String,
    short_description: String,
    long_description: String,
}

/// Full-scan cosine index over an `RwLock`ed map of collections.
///
/// Fine for the vocabulary sizes tests and demos use; the remote backend is
/// the one that scales.
#[derive(Default)]
pub struct InMemoryIndex {
    collections: RwLock<HashMap<String, Vec<StoredPoint>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection (searching it yields no matches, which is
    /// distinct from searching a collection that does not exist).
    pub fn create_collection(&self, collection: &str) {
        self.collections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(collection.to_string())
            .or_default();
    }

    /// Insert one coded concept, creating the collection if needed.
    pub fn insert_point(
        &self,
        collection: &str,
        vector: Vec<f32>,
        code: &str,
        short_description: &str,
        long_description: &str,
    ) {
        let mut guard = self.collections.write().unwrap_or_else(|e| e.into_inner());
        guard
            .entry(collection.to_string())
            .or_default()
            .push(StoredPoint {
                vector,
                code: code.to_string(),
                short_description: short_description.to_string(),
                long_description: long_description.to_string(),
            });
    }
}

#[async_trait]
impl CodeIndex for InMemoryIndex {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<CodeCandidate>, IndexError> {
        if limit == 0 {
            return Err(IndexError::InvalidRequest(
                "limit must be positive".into(),
            ));
        }
        if vector.is_empty() {
            return Err(IndexError::InvalidRequest(
                "query vector must not be empty".into(),
            ));
        }
        let limit = clamp_limit(limit);

        let guard = self.collections.read().unwrap_or_else(|e| e.into_inner());
        let points = guard
            .get(collection)
            .ok_or_else(|| IndexError::CollectionMissing(collection.to_string()))?;

        let mut hits: Vec<CodeCandidate> = points
            .iter()
            .map(|p| CodeCandidate {
                code: p.code.clone(),
                short_description: p.short_description.clone(),
                long_description: p.long_description.clone(),
                score: cosine_similarity(vector, &p.vector),
            })
            .collect();

        // Score descending, code ascending for a stable order across runs.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.code.cmp(&b.code))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError> {
        let guard = self.collections.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.contains_key(collection))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
