use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use decompose::{IdentityDecomposer, QueryDecomposer};
use embedding::{Embedder, EmbeddingConfig};
use index::{CodeCandidate, CodeIndex, InMemoryIndex, IndexError};

use super::*;

const COLLECTION: &str = "icd10-test";
const DIM: usize = 64;

fn stub_embedder() -> Arc<Embedder> {
    Arc::new(Embedder::new(EmbeddingConfig::stub(DIM)).unwrap())
}

fn engine_with(index: Arc<dyn CodeIndex>, embedder: Arc<Embedder>) -> SuggestionEngine {
    SuggestionEngine::new(
        embedder,
        index,
        Arc::new(IdentityDecomposer),
        SuggestConfig {
            collection: COLLECTION.into(),
            ..Default::default()
        },
    )
    .unwrap()
}

/// Seed a code under its description's own stub embedding, so searching for
/// that exact description scores ~1.0.
async fn seed(index: &InMemoryIndex, embedder: &Embedder, code: &str, description: &str) {
    let embedding = embedder.embed(description).await.unwrap();
    index.insert_point(COLLECTION, embedding.vector, code, description, description);
}

async fn seeded_engine() -> (SuggestionEngine, Arc<Embedder>) {
    let embedder = stub_embedder();
    let index = Arc::new(InMemoryIndex::new());
    seed(&index, &embedder, "R05", "Cough").await;
    seed(&index, &embedder, "R50.9", "Fever, unspecified").await;
    seed(&index, &embedder, "R06.02", "Shortness of breath").await;
    seed(&index, &embedder, "N20.0", "Calculus of kidney").await;
    let engine = engine_with(index, embedder.clone());
    (engine, embedder)
}

/// Splits the input on `;` — a deterministic stand-in for the LLM strategy.
struct SemicolonSplitter;

#[async_trait]
impl QueryDecomposer for SemicolonSplitter {
    async fn decompose(&self, text: &str) -> Vec<String> {
        text.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    fn strategy(&self) -> &'static str {
        "semicolon"
    }
}

/// Counts searches; used to prove the zero-limit short circuit.
struct CountingIndex {
    inner: InMemoryIndex,
    searches: AtomicUsize,
}

#[async_trait]
impl CodeIndex for CountingIndex {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<CodeCandidate>, IndexError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(collection, vector, limit).await
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError> {
        self.inner.collection_exists(collection).await
    }
}

/// Fails searches whose query vector equals the poison vector (or all of
/// them), standing in for a backend that chokes on one phrase.
struct PoisonIndex {
    inner: InMemoryIndex,
    poison: Vec<f32>,
    fail_all: bool,
}

#[async_trait]
impl CodeIndex for PoisonIndex {
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<CodeCandidate>, IndexError> {
        if self.fail_all || vector == self.poison.as_slice() {
            return Err(IndexError::Backend("simulated backend failure".into()));
        }
        self.inner.search(collection, vector, limit).await
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, IndexError> {
        self.inner.collection_exists(collection).await
    }
}

#[tokio::test]
async fn returns_ranked_bounded_results() {
    let (engine, _) = seeded_engine().await;
    let results = engine.suggest_codes("Cough", 3, false).await.unwrap();

    assert!(!results.is_empty());
    assert!(results.len() <= 3);
    assert_eq!(results[0].code, "R05");
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn default_variant_uses_the_configured_limit() {
    let (engine, _) = seeded_engine().await;
    let results = engine.suggest_codes_default("Cough").await.unwrap();
    assert!(!results.is_empty());
    assert!(results.len() <= engine.config().default_limit);
    assert_eq!(results[0].code, "R05");
}

#[tokio::test]
async fn repeat_calls_are_identical() {
    let (engine, _) = seeded_engine().await;
    let first = engine.suggest_codes("Fever, unspecified", 5, false).await.unwrap();
    for _ in 0..5 {
        let again = engine.suggest_codes("Fever, unspecified", 5, false).await.unwrap();
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn empty_text_is_invalid_input() {
    let (engine, _) = seeded_engine().await;
    let err = engine.suggest_codes("   ", 5, false).await.unwrap_err();
    assert!(matches!(err, SuggestError::InvalidInput(_)));
    assert_eq!(err.kind(), "INVALID_INPUT");
}

#[tokio::test]
async fn zero_limit_short_circuits_without_searching() {
    let embedder = stub_embedder();
    let inner = InMemoryIndex::new();
    inner.create_collection(COLLECTION);
    let counting = Arc::new(CountingIndex {
        inner,
        searches: AtomicUsize::new(0),
    });
    let engine = engine_with(counting.clone(), embedder);

    let results = engine.suggest_codes("cough", 0, false).await.unwrap();
    assert!(results.is_empty());
    assert_eq!(counting.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_limit_is_clamped_not_rejected() {
    let (engine, _) = seeded_engine().await;
    let results = engine.suggest_codes("Cough", 10_000, false).await.unwrap();
    assert!(results.len() <= index::MAX_SEARCH_LIMIT);
}

#[tokio::test]
async fn refinement_dedupes_codes_across_sub_queries() {
    let embedder = stub_embedder();
    let index = Arc::new(InMemoryIndex::new());
    seed(&index, &embedder, "R05", "Cough").await;
    seed(&index, &embedder, "R50.9", "Fever, unspecified").await;

    let engine = SuggestionEngine::new(
        embedder,
        index,
        Arc::new(SemicolonSplitter),
        SuggestConfig {
            collection: COLLECTION.into(),
            ..Default::default()
        },
    )
    .unwrap();

    // Both sub-queries retrieve both codes; the merged answer must carry
    // each code once, at its best score.
    let results = engine
        .suggest_codes("Cough; Fever, unspecified", 5, true)
        .await
        .unwrap();

    let codes: Vec<&str> = results.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes.len(), 2);
    assert!(codes.contains(&"R05"));
    assert!(codes.contains(&"R50.9"));
    // The exact-description sub-query is the best match for each code.
    for result in &results {
        assert!(result.score > 0.99);
    }
}

#[tokio::test]
async fn missing_collection_is_surfaced_distinctly() {
    let embedder = stub_embedder();
    let index = Arc::new(InMemoryIndex::new());
    let engine = SuggestionEngine::new(
        embedder,
        index,
        Arc::new(IdentityDecomposer),
        SuggestConfig {
            collection: "not-configured".into(),
            ..Default::default()
        },
    )
    .unwrap();

    let err = engine.suggest_codes("cough", 5, false).await.unwrap_err();
    assert!(matches!(
        err,
        SuggestError::Index(IndexError::CollectionMissing(ref name)) if name == "not-configured"
    ));
    assert_eq!(err.kind(), "INDEX_UNAVAILABLE");
}

#[tokio::test]
async fn empty_collection_is_a_successful_empty_answer() {
    let embedder = stub_embedder();
    let index = Arc::new(InMemoryIndex::new());
    index.create_collection(COLLECTION);
    let engine = engine_with(index, embedder);

    let results = engine.suggest_codes("cough", 5, false).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn one_failed_sub_query_does_not_abort_the_request() {
    let embedder = stub_embedder();
    let inner = InMemoryIndex::new();
    let good = embedder.embed("Cough").await.unwrap();
    inner.insert_point(COLLECTION, good.vector, "R05", "Cough", "Cough");
    let poison = embedder.embed("unparseable phrase").await.unwrap();

    let index = Arc::new(PoisonIndex {
        inner,
        poison: poison.vector,
        fail_all: false,
    });
    let engine = SuggestionEngine::new(
        embedder,
        index,
        Arc::new(SemicolonSplitter),
        SuggestConfig {
            collection: COLLECTION.into(),
            ..Default::default()
        },
    )
    .unwrap();

    let results = engine
        .suggest_codes("Cough; unparseable phrase", 5, true)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].code, "R05");
}

#[tokio::test]
async fn all_failed_sub_queries_fail_the_request() {
    let embedder = stub_embedder();
    let index = Arc::new(PoisonIndex {
        inner: InMemoryIndex::new(),
        poison: Vec::new(),
        fail_all: true,
    });
    let engine = SuggestionEngine::new(
        embedder,
        index,
        Arc::new(SemicolonSplitter),
        SuggestConfig {
            collection: COLLECTION.into(),
            ..Default::default()
        },
    )
    .unwrap();

    let err = engine
        .suggest_codes("cough; fever", 5, true)
        .await
        .unwrap_err();
    assert!(matches!(err, SuggestError::AllSubQueriesFailed { .. }));
    assert_eq!(err.kind(), "SUGGESTION_FAILED");
}

#[tokio::test]
async fn single_failed_query_keeps_its_typed_cause() {
    let embedder = stub_embedder();
    let index = Arc::new(PoisonIndex {
        inner: InMemoryIndex::new(),
        poison: Vec::new(),
        fail_all: true,
    });
    let engine = engine_with(index, embedder);

    let err = engine.suggest_codes("cough", 5, false).await.unwrap_err();
    assert!(matches!(err, SuggestError::Index(IndexError::Backend(_))));
}

#[tokio::test]
async fn detailed_response_keeps_per_query_breakdown() {
    let embedder = stub_embedder();
    let inner = InMemoryIndex::new();
    let good = embedder.embed("Cough").await.unwrap();
    inner.insert_point(COLLECTION, good.vector, "R05", "Cough", "Cough");
    let poison = embedder.embed("bad phrase").await.unwrap();

    let index = Arc::new(PoisonIndex {
        inner,
        poison: poison.vector,
        fail_all: false,
    });
    let engine = SuggestionEngine::new(
        embedder,
        index,
        Arc::new(SemicolonSplitter),
        SuggestConfig {
            collection: COLLECTION.into(),
            ..Default::default()
        },
    )
    .unwrap();

    let detailed = engine
        .suggest_codes_detailed("Cough; bad phrase", 5, true)
        .await
        .unwrap();

    assert_eq!(detailed.queries, vec!["Cough", "bad phrase"]);
    assert_eq!(detailed.by_query.len(), 2);
    assert!(detailed.by_query[0].error.is_none());
    assert_eq!(detailed.by_query[0].candidates.len(), 1);
    assert!(detailed.by_query[1].error.is_some());
    assert!(detailed.by_query[1].candidates.is_empty());
    assert_eq!(detailed.merged.len(), 1);
    assert_eq!(detailed.merged[0].code, "R05");
}

#[tokio::test]
async fn refinement_off_skips_the_decomposer() {
    // A decomposer that would split — but with use_refinement=false the
    // whole text must go through as a single query.
    let embedder = stub_embedder();
    let index = Arc::new(InMemoryIndex::new());
    seed(&index, &embedder, "R05", "Cough; Fever").await;

    let engine = SuggestionEngine::new(
        embedder,
        index,
        Arc::new(SemicolonSplitter),
        SuggestConfig {
            collection: COLLECTION.into(),
            ..Default::default()
        },
    )
    .unwrap();

    let detailed = engine
        .suggest_codes_detailed("Cough; Fever", 5, false)
        .await
        .unwrap();
    assert_eq!(detailed.queries, vec!["Cough; Fever"]);
}
