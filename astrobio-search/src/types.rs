//! Core types for search results, source identification and responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A raw record as returned by a source, before normalisation.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Whether a result came from the local dataset or an external API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The local (primary) dataset. Its failure fails the whole request.
    Local,
    /// A third-party API. Its failure is recorded and tolerated.
    External,
}

impl SourceKind {
    /// Returns the lowercase label used in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::External => "external",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single normalised search result.
///
/// Built once by the normaliser and only read afterwards. The scoring step
/// produces adjusted copies rather than mutating shared results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier, unique within one response.
    pub id: String,
    /// Result title ("Untitled" when the source had none).
    pub title: String,
    /// Abstract or description text.
    pub description: String,
    /// Authors in source order.
    pub authors: Vec<String>,
    /// Publication date as reported by the source, if any.
    pub published_date: Option<String>,
    /// Topical tags, without duplicates, in first-seen order.
    pub tags: Vec<String>,
    /// Display category such as "Research Papers" or "OSDR Data".
    pub result_type: String,
    /// Name of the source that produced this result.
    pub source_name: String,
    /// Local dataset or external API.
    pub source_kind: SourceKind,
    /// Relevance in `[0, 1]`; higher is more relevant.
    pub relevance_score: f64,
    /// Link to the original record.
    pub link: String,
}

impl SearchResult {
    /// Returns `true` if this result came from the local dataset.
    pub fn is_local(&self) -> bool {
        self.source_kind == SourceKind::Local
    }
}

/// A non-fatal per-source failure surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceErrorReport {
    /// Name of the failing source.
    pub source: String,
    /// Human-readable failure description.
    pub message: String,
}

/// The aggregator's answer to one search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Number of entries in `results`.
    pub count: usize,
    /// Deduplicated, ranked results truncated to the requested limit.
    pub results: Vec<SearchResult>,
    /// Number of returned results per source.
    pub source_counts: BTreeMap<String, usize>,
    /// Per-source failures that degraded (but did not fail) the request.
    pub errors: Vec<SourceErrorReport>,
    /// `true` when the results were served from the cache.
    pub cached: bool,
}

impl SearchResponse {
    /// Build a response from final results, deriving `count` and
    /// `source_counts`.
    pub fn from_results(
        results: Vec<SearchResult>,
        errors: Vec<SourceErrorReport>,
        cached: bool,
    ) -> Self {
        let mut source_counts = BTreeMap::new();
        for result in &results {
            *source_counts.entry(result.source_name.clone()).or_insert(0) += 1;
        }
        Self {
            count: results.len(),
            results,
            source_counts,
            errors,
            cached,
        }
    }

    /// An empty, successful response.
    pub fn empty() -> Self {
        Self::from_results(Vec::new(), Vec::new(), false)
    }
}

/// Result of one external connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Error,
}

/// Connectivity report for one external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCheck {
    pub source: String,
    pub status: CheckStatus,
    /// "API accessible" on success, otherwise the failure.
    pub message: String,
    pub elapsed_ms: u64,
}


#[cfg(test)]
mod tests {
    use super::test_support::make_result;
    use super::*;

    #[test]
    fn source_kind_display() {
        assert_eq!(SourceKind::Local.to_string(), "local");
        assert_eq!(SourceKind::External.to_string(), "external");
    }

    #[test]
    fn source_kind_serialises_lowercase() {
        let json = serde_json::to_string(&SourceKind::External).expect("serialize");
        assert_eq!(json, "\"external\"");
    }

    #[test]
    fn is_local_reflects_kind() {
        assert!(make_result("a", "T", SourceKind::Local, 0.5).is_local());
        assert!(!make_result("b", "T", SourceKind::External, 0.5).is_local());
    }

    #[test]
    fn response_counts_results_per_source() {
        let results = vec![
            make_result("a", "One", SourceKind::Local, 0.5),
            make_result("b", "Two", SourceKind::External, 0.6),
            make_result("c", "Three", SourceKind::External, 0.7),
        ];
        let response = SearchResponse::from_results(results, Vec::new(), false);
        assert_eq!(response.count, 3);
        assert_eq!(response.source_counts.get("Local Database"), Some(&1));
        assert_eq!(response.source_counts.get("NASA NTRS"), Some(&2));
    }

    #[test]
    fn empty_response_has_zero_count() {
        let response = SearchResponse::empty();
        assert_eq!(response.count, 0);
        assert!(response.results.is_empty());
        assert!(response.source_counts.is_empty());
        assert!(!response.cached);
    }

    #[test]
    fn response_json_uses_snake_case_fields() {
        let response = SearchResponse::from_results(
            vec![make_result("a", "One", SourceKind::Local, 0.5)],
            vec![SourceErrorReport {
                source: "NASA NTRS".into(),
                message: "source timed out".into(),
            }],
            false,
        );
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["count"], 1);
        assert_eq!(json["results"][0]["source_kind"], "local");
        assert_eq!(json["errors"][0]["source"], "NASA NTRS");
        assert_eq!(json["source_counts"]["Local Database"], 1);
    }
}
