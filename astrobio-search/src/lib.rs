//! # astrobio-search
//!
//! Multi-source space-biology search: the local article and Task Book
//! datasets plus NASA's open-science APIs (OSDR, the Open Data Portal, NTRS
//! and NSLSL), merged into one ranked result list.
//!
//! ## Design
//!
//! - Every source implements [`Source`] and returns raw JSON records
//! - Records are normalised into [`SearchResult`] through declarative field
//!   mappings ([`normalize::RecordShape`])
//! - Sources are queried concurrently, each under its own timeout; external
//!   failures become error entries, a local failure fails the request
//! - Near-duplicate titles are merged, preferring local records
//! - Ranked result lists are cached behind the [`ResultCache`] trait
//!
//! ## Logging
//!
//! Search queries are logged only at trace level.

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod http;
pub mod normalize;
pub mod orchestrator;
pub mod source;
pub mod sources;
pub mod throttle;
pub mod types;

use std::sync::Arc;

pub use cache::{CacheKey, MokaCache, ResultCache};
pub use config::{ApiKind, SearchConfig, SourceConfig};
pub use error::{MalformedRecord, Result, SearchError, SourceError};
pub use graph::{derive_graph, KnowledgeGraph};
pub use orchestrator::SearchAggregator;
pub use source::Source;
pub use sources::{CsvSource, DatasetFile, DatasetLayout, DatasetStats, NasaApiSource};
pub use types::{
    CheckStatus, RawRecord, SearchResponse, SearchResult, SourceCheck, SourceErrorReport, SourceKind,
};

/// Build an aggregator over `local` and one HTTP source per entry of
/// `sources`, with the cache described by `config`.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if the configuration is invalid, or
/// [`SearchError::Http`] if the HTTP client cannot be built.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> astrobio_search::Result<()> {
/// use std::sync::Arc;
/// use astrobio_search::{config, sources, CsvSource, SearchConfig};
///
/// let search = SearchConfig::default();
/// let local = Arc::new(CsvSource::load(&sources::default_datasets(), search.local_timeout_ms).await);
/// let aggregator = astrobio_search::build_aggregator(&search, &config::default_nasa_sources(), local)?;
/// let response = aggregator.search("microgravity bone", 10, true).await?;
/// for result in &response.results {
///     println!("{} ({}): {}", result.title, result.source_name, result.link);
/// }
/// # Ok(())
/// # }
/// ```
pub fn build_aggregator(
    config: &SearchConfig,
    sources: &[SourceConfig],
    local: Arc<dyn Source>,
) -> Result<SearchAggregator> {
    config.validate(sources)?;
    let client = http::build_client(config)?;
    let externals = sources::build_external_sources(sources, config, &client);
    tracing::debug!(externals = externals.len(), "search aggregator configured");
    Ok(SearchAggregator::new(
        local,
        externals,
        cache::from_config(config),
        config.clone(),
    ))
}
