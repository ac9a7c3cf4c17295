use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{ScoredPoint, SearchPointsBuilder, Value as QdrantValue};
use qdrant_client::{Qdrant, QdrantError};

use crate::{clamp_limit, CodeCandidate, CodeIndex, IndexError};

/// Remote Qdrant-backed code index.
///
/// Consumes an existing collection of embedded code descriptions; building
/// and upserting that collection happens out-of-band. Each point's payload
/// carries `code`, `short`, and `long` string fields.
pub struct QdrantIndex {
    client: Qdrant,
}

impl QdrantIndex {
    /// Connect a client to the given endpoint. No traffic happens until the
    /// first search.
    pub fn new(
        url: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, IndexError> {
        let mut builder = Qdrant::from_url(url).timeout(timeout);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder
            .build()
            .map_err(|e| IndexError::Backend(format!("failed to build qdrant client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client.
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }

    /// Decide whether a failed search means "collection missing",
    /// "unreachable", or a plain backend error. The existence probe is only
    /// run on the error path, so the happy path stays one round trip.
    async fn classify_search_error(&self, collection: &str, err: QdrantError) -> IndexError {
        match self.client.collection_exists(collection).await {
            Ok(false) => IndexError::CollectionMissing(collection.to_string()),
            Ok(true) => IndexError::Backend(err.to_string()),
            Err(probe_err) => {
                tracing::debug!(error = %probe_err, "existence probe also failed");
                IndexError::Unreachable(err.to_string())
            }
        }
    }
}

#[async_trait]
impl CodeIndex for QdrantIndex {
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

        let request = SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64)
            .with_payload(true);

        match self.client.search_points(request).await {
            Ok(response) => Ok(response
                .result
                .into_iter()
                .map(candidate_from_point)
                .collect()),
            Err(err) => Err(self.classify_search_error(collection, err).await),
        }
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError> {
        self.client
            .collection_exists(collection)
            .await
            .map_err(|e| IndexError::Unreachable(e.to_string()))
    }
}

fn candidate_from_point(point: ScoredPoint) -> CodeCandidate {
    CodeCandidate {
        code: payload_str(&point.payload, "code"),
        short_description: payload_str(&point.payload, "short"),
        long_description: payload_str(&point.payload, "long"),
        score: point.score,
    }
}

/// Pull a string field out of a point payload; absent or non-string values
/// degrade to an empty string rather than failing the whole search.
fn payload_str(payload: &HashMap<String, QdrantValue>, key: &str) -> String {
    match payload.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        Some(Kind::IntegerValue(i)) => i.to_string(),
        Some(Kind::DoubleValue(f)) => f.to_string(),
        Some(Kind::BoolValue(b)) => b.to_string(),
        _ => String::new(),
    }
}
