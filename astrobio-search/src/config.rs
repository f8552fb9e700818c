//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls limits, caching and HTTP behaviour;
//! [`SourceConfig`] describes one external NASA API. Both are loaded once
//! at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

use crate::error::SearchError;

/// Placeholder replaced by the URL-encoded query in endpoint templates.
pub const QUERY_PLACEHOLDER: &str = "{query}";
/// Placeholder replaced by the per-source result limit in endpoint templates.
pub const LIMIT_PLACEHOLDER: &str = "{limit}";

/// Response layout of a NASA open-science API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKind {
    /// OSDR study search (`studies` / `results`).
    Osdr,
    /// NASA Open Data Portal, CKAN `package_search` (`result.results`).
    OpenData,
    /// NASA Technical Reports Server (`results` / Elasticsearch `hits.hits`).
    Ntrs,
    /// NASA Space Life Sciences Library (`results` / `documents`).
    Nslsl,
}

impl ApiKind {
    /// Largest page size the API accepts; larger limits are capped.
    pub fn max_page_size(&self) -> usize {
        match self {
            Self::Osdr | Self::Nslsl => 50,
            Self::OpenData | Self::Ntrs => 100,
        }
    }
}

/// Configuration for one external source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Display name, also used for attribution and error reports.
    pub name: String,
    /// Request URL with `{query}` and `{limit}` placeholders.
    pub endpoint_template: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Disabled sources are never queried.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Response layout used to extract and map records.
    pub api: ApiKind,
    /// Prior relevance for records that carry no explicit score.
    #[serde(default)]
    pub base_score: Option<f64>,
    /// Minimum delay between consecutive requests to this source.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,
}

fn default_timeout_ms() -> u64 {
    8_000
}

fn default_enabled() -> bool {
    true
}

fn default_min_request_interval_ms() -> u64 {
    500
}

impl SourceConfig {
    /// Create an enabled source with default timeout and courtesy delay.
    pub fn new(name: impl Into<String>, endpoint_template: impl Into<String>, api: ApiKind) -> Self {
        Self {
            name: name.into(),
            endpoint_template: endpoint_template.into(),
            timeout_ms: default_timeout_ms(),
            enabled: true,
            api,
            base_score: None,
            min_request_interval_ms: default_min_request_interval_ms(),
        }
    }

    /// Render the request URL for `query` and `limit`.
    ///
    /// The query is form-encoded; the limit is capped at the API's
    /// maximum page size.
    pub fn render_endpoint(&self, query: &str, limit: usize) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let limit = limit.min(self.api.max_page_size());
        self.endpoint_template
            .replace(QUERY_PLACEHOLDER, &encoded)
            .replace(LIMIT_PLACEHOLDER, &limit.to_string())
    }

    /// Replace the part of the endpoint template before the query string.
    ///
    /// Used for environment overrides that only know the API base URL.
    pub fn with_endpoint_base(mut self, base: &str) -> Self {
        let query = self
            .endpoint_template
            .split_once('?')
            .map(|(_, q)| q.to_owned());
        self.endpoint_template = match query {
            Some(q) => format!("{}?{q}", base.trim_end_matches('?')),
            None => base.to_owned(),
        };
        self
    }

    /// Validates this source, returning an error if any field is invalid.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.name.trim().is_empty() {
            return Err(SearchError::Config("source name must not be empty".into()));
        }
        if self.timeout_ms == 0 {
            return Err(SearchError::Config(format!(
                "source {}: timeout_ms must be greater than 0",
                self.name
            )));
        }
        if !self.endpoint_template.contains(QUERY_PLACEHOLDER) {
            return Err(SearchError::Config(format!(
                "source {}: endpoint_template must contain {QUERY_PLACEHOLDER}",
                self.name
            )));
        }
        Url::parse(&self.render_endpoint("validate", 1)).map_err(|e| {
            SearchError::Config(format!("source {}: invalid endpoint_template: {e}", self.name))
        })?;
        if let Some(score) = self.base_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(SearchError::Config(format!(
                    "source {}: base_score must be within [0, 1]",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// The NASA open-science APIs queried by default.
pub fn default_nasa_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            base_score: Some(0.8),
            ..SourceConfig::new(
                "NASA OSDR",
                "https://osdr.nasa.gov/bio/repo/search?q={query}&data_source=cgene,alsda,esa&data_type=study&size={limit}&from=0",
                ApiKind::Osdr,
            )
        },
        SourceConfig {
            base_score: Some(0.85),
            ..SourceConfig::new(
                "NASA Open Data Portal",
                "https://data.nasa.gov/api/3/action/package_search?q={query}&rows={limit}&sort=metadata_modified+desc",
                ApiKind::OpenData,
            )
        },
        SourceConfig {
            base_score: Some(0.85),
            ..SourceConfig::new(
                "NASA NTRS",
                "https://ntrs.nasa.gov/api/search?q={query}&size={limit}&highlight=true",
                ApiKind::Ntrs,
            )
        },
        SourceConfig {
            base_score: Some(0.9),
            ..SourceConfig::new(
                "NASA NSLSL",
                "https://public.ksc.nasa.gov/nslsl/api/search?q={query}&format=json&limit={limit}&category=space-life-sciences",
                ApiKind::Nslsl,
            )
        },
    ]
}

/// Configuration for the search aggregator.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Limit applied when a caller does not specify one.
    pub default_limit: usize,
    /// Largest limit a caller may request.
    pub max_limit: usize,
    /// Timeout for the local dataset source in milliseconds.
    pub local_timeout_ms: u64,
    /// How long to cache results in seconds. Set to 0 to disable caching.
    pub cache_ttl_seconds: u64,
    /// Maximum number of cached result sets.
    pub cache_capacity: u64,
    /// Random jitter range in milliseconds `(min, max)` added to each
    /// source's courtesy delay.
    pub request_jitter_ms: (u64, u64),
    /// Custom User-Agent string for API requests.
    pub user_agent: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
            local_timeout_ms: 2_000,
            cache_ttl_seconds: 3_600,
            cache_capacity: 256,
            request_jitter_ms: (0, 100),
            user_agent: None,
        }
    }
}

impl SearchConfig {
    /// Validates this configuration together with the external sources.
    ///
    /// Checks:
    /// - `default_limit` and `max_limit` are greater than 0, default <= max
    /// - `local_timeout_ms` is greater than 0
    /// - `request_jitter_ms.0` <= `request_jitter_ms.1`
    /// - every source is valid and source names are unique
    pub fn validate(&self, sources: &[SourceConfig]) -> Result<(), SearchError> {
        if self.default_limit == 0 || self.max_limit == 0 {
            return Err(SearchError::Config(
                "default_limit and max_limit must be greater than 0".into(),
            ));
        }
        if self.default_limit > self.max_limit {
            return Err(SearchError::Config(
                "default_limit must be <= max_limit".into(),
            ));
        }
        if self.local_timeout_ms == 0 {
            return Err(SearchError::Config(
                "local_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.request_jitter_ms.0 > self.request_jitter_ms.1 {
            return Err(SearchError::Config(
                "request_jitter_ms min must be <= max".into(),
            ));
        }
        let mut names = HashSet::new();
        for source in sources {
            source.validate()?;
            if !names.insert(source.name.as_str()) {
                return Err(SearchError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
        }
        Ok(())
    }
}
