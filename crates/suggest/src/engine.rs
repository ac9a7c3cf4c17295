use std::sync::Arc;
use std::time::Instant;

use decompose::QueryDecomposer;
use embedding::Embedder;
use futures::future::join_all;
use index::{clamp_limit, CodeCandidate, CodeIndex, IndexError};

use crate::error::SuggestError;
use crate::merge::merge_candidates;
use crate::types::{
    ClinicalQuery, DetailedSuggestions, QueryBreakdown, SuggestConfig, SuggestionResult,
};

#[cfg(test)]
mod tests;

/// Orchestrates decomposition, embedding, and index search into ranked
/// code suggestions.
///
/// All collaborators are injected as shared handles; the engine itself holds
/// no request state, so one instance serves any number of concurrent
/// invocations.
pub struct SuggestionEngine {
    embedder: Arc<Embedder>,
    index: Arc<dyn CodeIndex>,
    decomposer: Arc<dyn QueryDecomposer>,
    cfg: SuggestConfig,
}

/// Per-sub-query outcome, in decomposition order.
struct SubQueryOutcome {
    query: String,
    result: Result<Vec<CodeCandidate>, SuggestError>,
}

impl SuggestionEngine {
    /// Construct an engine from its collaborators.
    pub fn new(
        embedder: Arc<Embedder>,
        index: Arc<dyn CodeIndex>,
        decomposer: Arc<dyn QueryDecomposer>,
        cfg: SuggestConfig,
    ) -> Result<Self, SuggestError> {
        cfg.validate()?;
        Ok(Self {
            embedder,
            index,
            decomposer,
            cfg,
        })
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.cfg
    }

    /// [`suggest_codes`](Self::suggest_codes) with the configured default
    /// limit and refinement off.
    pub async fn suggest_codes_default(
        &self,
        text: &str,
    ) -> Result<Vec<SuggestionResult>, SuggestError> {
        self.suggest_codes(text, self.cfg.default_limit, false).await
    }

    /// Suggest diagnosis codes for free-text clinical narrative.
    ///
    /// Returns at most `limit` suggestions, unique by code, ordered by
    /// descending score. `limit` is clamped to the index ceiling; zero
    /// short-circuits to an empty answer without touching the embedder or
    /// the index. When `use_refinement` is false the decomposer is skipped
    /// entirely, saving the external call.
    pub async fn suggest_codes(
        &self,
        text: &str,
        limit: usize,
        use_refinement: bool,
    ) -> Result<Vec<SuggestionResult>, SuggestError> {
        let start = Instant::now();
        let trimmed = validate_text(text)?;

        if limit == 0 {
            tracing::debug!("limit of zero requested; returning empty suggestion list");
            return Ok(Vec::new());
        }
        let limit = clamp_limit(limit);

        let (query, outcomes) = self.run_sub_queries(trimmed, limit, use_refinement).await;

        let mut candidate_lists: Vec<(String, Vec<CodeCandidate>)> = Vec::new();
        let mut failures: Vec<SuggestError> = Vec::new();
        let mut raw_candidates = 0usize;

        for (idx, outcome) in outcomes.into_iter().enumerate() {
            match outcome.result {
                Ok(candidates) => {
                    raw_candidates += candidates.len();
                    candidate_lists.push((outcome.query, candidates));
                }
                Err(err) => {
                    tracing::warn!(
                        query_index = idx,
                        error = %err,
                        "sub-query failed; continuing with remaining sub-queries"
                    );
                    failures.push(err);
                }
            }
        }

        if candidate_lists.is_empty() {
            return Err(total_failure(failures));
        }

        let merged = merge_candidates(&candidate_lists, limit);

        tracing::info!(
            input_chars = query.raw_text.chars().count(),
            sub_queries = query.sub_queries.len(),
            failed_sub_queries = failures.len(),
            raw_candidates,
            returned = merged.len(),
            refined = use_refinement,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "code suggestion completed"
        );

        Ok(merged)
    }

    /// Like [`suggest_codes`](Self::suggest_codes), but keeps the
    /// per-sub-query breakdown alongside the merged answer. Sub-query
    /// failures are reported inline as messages rather than aborting the
    /// response.
    pub async fn suggest_codes_detailed(
        &self,
        text: &str,
        limit: usize,
        use_refinement: bool,
    ) -> Result<DetailedSuggestions, SuggestError> {
        let trimmed = validate_text(text)?;

        if limit == 0 {
            return Ok(DetailedSuggestions {
                queries: Vec::new(),
                by_query: Vec::new(),
                merged: Vec::new(),
            });
        }
        let limit = clamp_limit(limit);

        let (query, outcomes) = self.run_sub_queries(trimmed, limit, use_refinement).await;

        let mut by_query = Vec::with_capacity(outcomes.len());
        let mut candidate_lists: Vec<(String, Vec<CodeCandidate>)> = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(candidates) => {
                    candidate_lists.push((outcome.query.clone(), candidates.clone()));
                    by_query.push(QueryBreakdown {
                        query: outcome.query,
                        candidates,
                        error: None,
                    });
                }
                Err(err) => by_query.push(QueryBreakdown {
                    query: outcome.query,
                    candidates: Vec::new(),
                    error: Some(err.to_string()),
                }),
            }
        }

        let merged = merge_candidates(&candidate_lists, limit);
        Ok(DetailedSuggestions {
            queries: query.sub_queries,
            by_query,
            merged,
        })
    }

    /// Decompose (or not) and run the embed+search pipeline for every
    /// sub-query concurrently. A timeout or error on one sub-query is that
    /// sub-query's failure only; siblings are unaffected.
    async fn run_sub_queries(
        &self,
        trimmed: &str,
        limit: usize,
        use_refinement: bool,
    ) -> (ClinicalQuery, Vec<SubQueryOutcome>) {
        let query = if use_refinement {
            let sub_queries = self.decomposer.decompose(trimmed).await;
            if sub_queries.is_empty() {
                ClinicalQuery::single(trimmed)
            } else {
                ClinicalQuery {
                    raw_text: trimmed.to_string(),
                    sub_queries,
                }
            }
        } else {
            ClinicalQuery::single(trimmed)
        };

        let outcomes = join_all(query.sub_queries.iter().map(|sub_query| {
            let sub_query = sub_query.clone();
            async move {
                let result = self.embed_and_search(&sub_query, limit).await;
                SubQueryOutcome {
                    query: sub_query,
                    result,
                }
            }
        }))
        .await;

        (query, outcomes)
    }

    async fn embed_and_search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CodeCandidate>, SuggestError> {
        let embedding = self.embedder.embed(query).await?;
        let candidates = self
            .index
            .search(&self.cfg.collection, &embedding.vector, limit)
            .await?;
        Ok(candidates)
    }
}

fn validate_text(text: &str) -> Result<&str, SuggestError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SuggestError::InvalidInput(
            "clinical text must not be empty".into(),
        ));
    }
    Ok(trimmed)
}

/// Collapse the failures of a fully-failed invocation into one error.
///
/// An index-unavailable cause is surfaced as itself so operators see the
/// configuration problem directly; a lone failure keeps its type; anything
/// else becomes the aggregate.
fn total_failure(mut failures: Vec<SuggestError>) -> SuggestError {
    if let Some(pos) = failures.iter().position(|e| {
        matches!(
            e,
            SuggestError::Index(IndexError::CollectionMissing(_))
                | SuggestError::Index(IndexError::Unreachable(_))
        )
    }) {
        return failures.swap_remove(pos);
    }

    if failures.len() == 1 {
        if let Some(only) = failures.pop() {
            return only;
        }
    }

    SuggestError::AllSubQueriesFailed {
        causes: failures.iter().map(|e| e.to_string()).collect(),
    }
}
