//! The search aggregator: cache, fan-out, normalise, dedup, rank.
//!
//! # Pipeline
//!
//! 1. Validate the limit, normalise the query and look up the cache; a hit
//!    returns immediately
//! 2. Query the local source and (unless disabled or the query is empty)
//!    every enabled external source concurrently
//! 3. Fail the request if the local source failed; record external
//!    failures as error entries
//! 4. Normalise raw records, dropping malformed ones
//! 5. Deduplicate by title, apply the title-match boost, sort by score
//! 6. Truncate to `limit` and, if no source failed, write the cache
//!
//! The normalised query is used for the cache key, every source call and
//! the boost, so a cache hit always matches what a fresh search returns.
//!
//! Each search runs inside an `aggregate` tracing span whose `phase` field
//! tracks [`SearchPhase`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::Instrument;

use crate::cache::{normalize_query, validate_entry, CacheKey, ResultCache};
use crate::config::SearchConfig;
use crate::error::{SearchError, SourceError};
use crate::normalize::normalize;
use crate::source::Source;
use crate::types::{
    CheckStatus, RawRecord, SearchResponse, SearchResult, SourceCheck, SourceErrorReport,
};

use super::dedup::deduplicate;
use super::fanout::{fan_out, query_source, SourceOutcome};
use super::scoring::{apply_query_boost, rank};

/// Query sent to each external source by [`SearchAggregator::check_sources`].
pub const CONNECTIVITY_QUERY: &str = "microgravity";

/// Lifecycle of one search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Querying,
    Merging,
    Ranking,
    Done,
    Failed,
}

impl SearchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Querying => "querying",
            Self::Merging => "merging",
            Self::Ranking => "ranking",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current phase of one search, mirrored into its tracing span.
struct PhaseTracker {
    phase: SearchPhase,
    span: tracing::Span,
}

impl PhaseTracker {
    fn new(span: tracing::Span) -> Self {
        Self {
            phase: SearchPhase::Idle,
            span,
        }
    }

    fn advance(&mut self, next: SearchPhase) {
        tracing::debug!(parent: &self.span, from = %self.phase, to = %next, "search phase");
        self.span.record("phase", next.as_str());
        self.phase = next;
    }

    #[cfg(test)]
    fn phase(&self) -> SearchPhase {
        self.phase
    }
}

/// Aggregates the local dataset and external sources into one ranked list.
///
/// Cheap to share behind an [`Arc`]; concurrent searches share only the
/// cache.
pub struct SearchAggregator {
    local: Arc<dyn Source>,
    externals: Vec<Arc<dyn Source>>,
    cache: Arc<dyn ResultCache>,
    config: SearchConfig,
}

impl SearchAggregator {
    /// Create an aggregator. External sources are queried and merged in the
    /// order given.
    pub fn new(
        local: Arc<dyn Source>,
        externals: Vec<Arc<dyn Source>>,
        cache: Arc<dyn ResultCache>,
        config: SearchConfig,
    ) -> Self {
        Self {
            local,
            externals,
            cache,
            config,
        }
    }

    /// The search configuration in use.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Names of the registered external sources, in registration order.
    pub fn external_source_names(&self) -> Vec<&str> {
        self.externals.iter().map(|s| s.name()).collect()
    }

    fn check_limit(&self, limit: usize) -> Result<(), SearchError> {
        if limit == 0 || limit > self.config.max_limit {
            return Err(SearchError::Config(format!(
                "limit must be between 1 and {}",
                self.config.max_limit
            )));
        }
        Ok(())
    }

    /// Run a full aggregated search.
    ///
    /// An empty query, or `include_external == false`, queries the local
    /// source only.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Config`] when `limit` is 0 or above `max_limit`
    /// - [`SearchError::LocalSourceFailure`] when the local source fails or
    ///   times out; external failures never fail the request
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        include_external: bool,
    ) -> Result<SearchResponse, SearchError> {
        let span = tracing::debug_span!("aggregate", phase = SearchPhase::Idle.as_str());
        let mut phases = PhaseTracker::new(span.clone());
        self.run_search(&mut phases, query, limit, include_external)
            .instrument(span)
            .await
    }

    async fn run_search(
        &self,
        phases: &mut PhaseTracker,
        query: &str,
        limit: usize,
        include_external: bool,
    ) -> Result<SearchResponse, SearchError> {
        if let Err(e) = self.check_limit(limit) {
            phases.advance(SearchPhase::Failed);
            return Err(e);
        }
        let query = normalize_query(query);

        let key = CacheKey::new(&query, limit, include_external);
        if let Some(results) = self.cached(&key).await {
            tracing::debug!(count = results.len(), "cache hit");
            phases.advance(SearchPhase::Done);
            return Ok(SearchResponse::from_results(results, Vec::new(), true));
        }

        phases.advance(SearchPhase::Querying);
        tracing::trace!(query, limit, include_external, "aggregated search");
        let query_external = include_external && !query.is_empty();
        let (local, externals) = if query_external {
            tokio::join!(
                query_source(&self.local, &query, limit),
                fan_out(&self.externals, &query, limit)
            )
        } else {
            (query_source(&self.local, &query, limit).await, Vec::new())
        };

        let local_records = match local.result {
            Ok(records) => records,
            Err(e) => {
                phases.advance(SearchPhase::Failed);
                return Err(SearchError::LocalSourceFailure(e));
            }
        };

        phases.advance(SearchPhase::Merging);
        let mut merged = normalize_all(self.local.as_ref(), &local_records);
        let errors = merge_outcomes(externals, &mut merged);

        phases.advance(SearchPhase::Ranking);
        let results = finalize(merged, &query, limit);

        if errors.is_empty() {
            self.cache.insert(key, results.clone()).await;
        } else {
            tracing::debug!(failed = errors.len(), "degraded response not cached");
        }

        phases.advance(SearchPhase::Done);
        Ok(SearchResponse::from_results(results, errors, false))
    }

    /// Search the local dataset only, bypassing the cache.
    ///
    /// # Errors
    ///
    /// Same as [`search`](Self::search), except that no external source is
    /// ever queried.
    pub async fn search_local(&self, query: &str, limit: usize) -> Result<SearchResponse, SearchError> {
        self.check_limit(limit)?;
        let query = normalize_query(query);
        let outcome = query_source(&self.local, &query, limit).await;
        let records = outcome.result.map_err(SearchError::LocalSourceFailure)?;
        let merged = normalize_all(self.local.as_ref(), &records);
        Ok(SearchResponse::from_results(
            finalize(merged, &query, limit),
            Vec::new(),
            false,
        ))
    }

    /// Search the external sources only, bypassing the cache.
    ///
    /// The local source is never queried, so its failure cannot fail this
    /// call. An empty query returns an empty response.
    ///
    /// # Errors
    ///
    /// [`SearchError::Config`] when `limit` is 0 or above `max_limit`.
    pub async fn search_external(&self, query: &str, limit: usize) -> Result<SearchResponse, SearchError> {
        self.check_limit(limit)?;
        let query = normalize_query(query);
        if query.is_empty() {
            return Ok(SearchResponse::empty());
        }
        tracing::trace!(query, limit, "external-only search");
        let outcomes = fan_out(&self.externals, &query, limit).await;
        let mut merged = Vec::new();
        let errors = merge_outcomes(outcomes, &mut merged);
        Ok(SearchResponse::from_results(
            finalize(merged, &query, limit),
            errors,
            false,
        ))
    }

    /// Send a one-result query to every enabled external source and report
    /// which ones answered.
    pub async fn check_sources(&self) -> Vec<SourceCheck> {
        fan_out(&self.externals, CONNECTIVITY_QUERY, 1)
            .await
            .into_iter()
            .map(|outcome| {
                let (status, message) = match &outcome.result {
                    Ok(_) => (CheckStatus::Success, "API accessible".to_owned()),
                    Err(e) => (CheckStatus::Error, e.to_string()),
                };
                SourceCheck {
                    source: outcome.name().to_owned(),
                    status,
                    message,
                    elapsed_ms: outcome.elapsed_ms,
                }
            })
            .collect()
    }

    async fn cached(&self, key: &CacheKey) -> Option<Vec<SearchResult>> {
        let results = self.cache.get(key).await?;
        match validate_entry(&results) {
            Ok(()) => Some(results),
            Err(reason) => {
                tracing::warn!(%reason, "invalid cache entry discarded");
                self.cache.invalidate(key).await;
                None
            }
        }
    }
}

/// Normalise successful external outcomes into `merged`, in outcome order,
/// and return an error report for each failed source.
fn merge_outcomes(outcomes: Vec<SourceOutcome>, merged: &mut Vec<SearchResult>) -> Vec<SourceErrorReport> {
    let mut errors = Vec::new();
    for outcome in outcomes {
        match &outcome.result {
            Ok(records) => merged.extend(normalize_all(outcome.source.as_ref(), records)),
            Err(e) => errors.push(error_report(outcome.name(), e)),
        }
    }
    errors
}

fn normalize_all(source: &dyn Source, records: &[RawRecord]) -> Vec<SearchResult> {
    let context = source.context();
    let shape = source.shape();
    records
        .iter()
        .enumerate()
        .filter_map(|(position, record)| match normalize(record, shape, context, position) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!(error = %e, "dropping record");
                None
            }
        })
        .collect()
}

fn error_report(name: &str, error: &SourceError) -> SourceErrorReport {
    SourceErrorReport {
        source: name.to_owned(),
        message: error.to_string(),
    }
}

/// Dedup, boost, rank, make ids unique and truncate.
fn finalize(merged: Vec<SearchResult>, query: &str, limit: usize) -> Vec<SearchResult> {
    let deduped = deduplicate(merged);
    let boosted = apply_query_boost(deduped, query);
    let mut ranked = ensure_unique_ids(rank(boosted));
    ranked.truncate(limit);
    ranked
}

/// Suffix repeated ids (`id`, `id~2`, `id~3`, ...) so every id in a response
/// is unique.
fn ensure_unique_ids(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::with_capacity(results.len());
    results
        .into_iter()
        .map(|mut result| {
            if !seen.insert(result.id.clone()) {
                let base = result.id.clone();
                let mut n = 2;
                while !seen.insert(format!("{base}~{n}")) {
                    n += 1;
                }
                result.id = format!("{base}~{n}");
            }
            result
        })
        .collect()
}
