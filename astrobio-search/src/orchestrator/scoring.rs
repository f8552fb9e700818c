//! Query-match boosting and final ranking.
//!
//! Scores arrive from normalisation (explicit score, source prior or
//! [`DEFAULT_RELEVANCE`](crate::normalize::DEFAULT_RELEVANCE)). A result
//! whose title contains the query gets [`TITLE_MATCH_BOOST`] on top, capped
//! at 1.0. Description-only matches are not boosted.

use std::cmp::Ordering;

use crate::types::SearchResult;

/// Added to the score of results whose title contains the query.
pub const TITLE_MATCH_BOOST: f64 = 0.2;

/// Boosted score for one result.
///
/// `needle` must already be trimmed and lowercased.
fn boosted_score(result: &SearchResult, needle: &str) -> f64 {
    if !needle.is_empty() && result.title.to_lowercase().contains(needle) {
        (result.relevance_score + TITLE_MATCH_BOOST).min(1.0)
    } else {
        result.relevance_score
    }
}

/// Apply the title-match boost for `query` to every result.
pub fn apply_query_boost(mut results: Vec<SearchResult>, query: &str) -> Vec<SearchResult> {
    let needle = query.trim().to_lowercase();
    for result in &mut results {
        result.relevance_score = boosted_score(result, &needle);
    }
    results
}

/// Stable sort by relevance, highest first. Equal scores keep input order.
pub fn rank(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    results.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
    });
    results
}
