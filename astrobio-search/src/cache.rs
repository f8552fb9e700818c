//! Result cache for aggregated searches.
//!
//! Caches the final deduplicated, ranked and truncated result list keyed by
//! the normalised query, the limit and the include-external flag. The cache
//! is injected into the aggregator as a [`ResultCache`] trait object; the
//! production implementation is [`MokaCache`], an async-friendly cache with
//! TTL expiry and bounded capacity.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::SearchConfig;
use crate::types::SearchResult;

/// Composite cache key: normalised query, limit and include-external flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Trimmed, lowercased, whitespace-collapsed query.
    query: String,
    limit: usize,
    include_external: bool,
}

impl CacheKey {
    /// Build a deterministic key. `"  Bone  LOSS "` and `"bone loss"` map
    /// to the same key.
    pub fn new(query: &str, limit: usize, include_external: bool) -> Self {
        Self {
            query: normalize_query(query),
            limit,
            include_external,
        }
    }

    /// The normalised query part of the key.
    pub fn query(&self) -> &str {
        &self.query
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.query, self.limit, self.include_external)
    }
}

/// Lowercase and collapse runs of whitespace into single spaces.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Storage for ranked result lists.
///
/// Implementations must tolerate concurrent access; concurrent writes to the
/// same key resolve as last-write-wins.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Cached results for `key`, or `None` on a miss.
    async fn get(&self, key: &CacheKey) -> Option<Vec<SearchResult>>;

    /// Store `results` under `key`, replacing any previous entry.
    async fn insert(&self, key: CacheKey, results: Vec<SearchResult>);

    /// Remove the entry for `key`, if any.
    async fn invalidate(&self, key: &CacheKey);
}

/// [`ResultCache`] backed by [`moka::future::Cache`].
///
/// Entries expire after the configured TTL. When the capacity is reached,
/// moka evicts entries by its own frequency/recency policy.
#[derive(Clone)]
pub struct MokaCache {
    inner: Cache<CacheKey, Vec<SearchResult>>,
}

impl MokaCache {
    /// Create a cache holding at most `capacity` result sets for `ttl`.
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl ResultCache for MokaCache {
    async fn get(&self, key: &CacheKey) -> Option<Vec<SearchResult>> {
        self.inner.get(key).await
    }

    async fn insert(&self, key: CacheKey, results: Vec<SearchResult>) {
        self.inner.insert(key, results).await;
    }

    async fn invalidate(&self, key: &CacheKey) {
        self.inner.invalidate(key).await;
    }
}

/// A cache that never stores anything. Used when caching is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

#[async_trait]
impl ResultCache for NoCache {
    async fn get(&self, _key: &CacheKey) -> Option<Vec<SearchResult>> {
        None
    }

    async fn insert(&self, _key: CacheKey, _results: Vec<SearchResult>) {}

    async fn invalidate(&self, _key: &CacheKey) {}
}

/// Build the cache described by `config`: [`NoCache`] when the TTL or the
/// capacity is zero, otherwise a [`MokaCache`].
pub fn from_config(config: &SearchConfig) -> Arc<dyn ResultCache> {
    if config.cache_ttl_seconds == 0 || config.cache_capacity == 0 {
        Arc::new(NoCache)
    } else {
        Arc::new(MokaCache::new(
            Duration::from_secs(config.cache_ttl_seconds),
            config.cache_capacity,
        ))
    }
}

/// Check a cached entry before serving it.
///
/// # Errors
///
/// Returns a description of the first problem found: an empty id, a
/// duplicate id, or a relevance score outside `[0, 1]`.
pub fn validate_entry(results: &[SearchResult]) -> Result<(), String> {
    let mut ids = HashSet::with_capacity(results.len());
    for result in results {
        if result.id.is_empty() {
            return Err("empty result id".into());
        }
        if !ids.insert(result.id.as_str()) {
            return Err(format!("duplicate result id {}", result.id));
        }
        if !(0.0..=1.0).contains(&result.relevance_score) {
            return Err(format!(
                "relevance score {} out of range for {}",
                result.relevance_score, result.id
            ));
        }
    }
    Ok(())
}
