use std::collections::HashMap;

use index::CodeCandidate;

use crate::types::SuggestionResult;

/// Merge per-sub-query candidate lists into one ranked, deduplicated answer.
///
/// Rules, in order:
/// 1. Flatten all candidates, retaining which sub-query produced each.
/// 2. Per code, keep the highest-scoring entry; ties go to the earliest
///    sub-query (the decomposition's first-listed condition). A code that
///    strongly matches any one stated condition is a valid suggestion, and
///    its best match is the representative one.
/// 3. Order by score descending, ties by ascending code, so identical inputs
///    always yield identical output.
/// 4. Truncate to `limit`.
///
/// An empty pool merges to an empty answer; "no matches" is a successful
/// outcome, not an error.
pub fn merge_candidates(
    candidate_lists: &[(String, Vec<CodeCandidate>)],
    limit: usize,
) -> Vec<SuggestionResult> {
    // Keyed by code; iteration in sub-query order makes "first wins on tie"
    // fall out of the strict > comparison.
    let mut best: HashMap<&str, SuggestionResult> = HashMap::new();

    for (query, candidates) in candidate_lists {
        for candidate in candidates {
            let replace = match best.get(candidate.code.as_str()) {
                Some(existing) => candidate.score > existing.score,
                None => true,
            };
            if replace {
                best.insert(
                    candidate.code.as_str(),
                    SuggestionResult {
                        code: candidate.code.clone(),
                        description: description_of(candidate),
                        score: candidate.score,
                        matched_query: query.clone(),
                    },
                );
            }
        }
    }

    let mut merged: Vec<SuggestionResult> = best.into_values().collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.code.cmp(&b.code))
    });
    merged.truncate(limit);
    merged
}

fn description_of(candidate: &CodeCandidate) -> String {
    if candidate.short_description.is_empty() {
        candidate.long_description.clone()
    } else {
        candidate.short_description.clone()
    }
}
