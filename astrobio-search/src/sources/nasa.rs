//! NASA open-science API clients.
//!
//! One [`NasaApiSource`] per configured API. The request URL comes from the
//! source's endpoint template; the response layout and field mapping come
//! from its [`ApiKind`]. Requests to the same API are spaced by a
//! [`CourtesyThrottle`].

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{ApiKind, SourceConfig};
use crate::error::SourceError;
use crate::normalize::{LinkTemplate, RecordShape};
use crate::source::Source;
use crate::throttle::CourtesyThrottle;
use crate::types::{RawRecord, SourceKind};

const OSDR_SHAPE: RecordShape = RecordShape {
    id: &["accession", "id", "study_id"],
    title: &["title", "name"],
    description: &["description", "study_description", "summary"],
    authors: &["principal_investigator", "pi"],
    date: &["date_created", "submission_date", "date"],
    tags: &["factors", "keywords"],
    link: &[],
    score: &["relevance_score"],
    result_type: &[],
    link_template: Some(LinkTemplate {
        pattern: "https://osdr.nasa.gov/bio/repo/data/studies/{}",
        keys: &["accession", "id", "study_id"],
    }),
    default_result_type: "OSDR Data",
};

const OPEN_DATA_SHAPE: RecordShape = RecordShape {
    id: &["id", "name"],
    title: &["title", "name"],
    description: &["notes", "description"],
    authors: &["author", "maintainer"],
    date: &["metadata_modified", "metadata_created"],
    tags: &["tags"],
    link: &[],
    score: &["relevance_score"],
    result_type: &[],
    link_template: Some(LinkTemplate {
        pattern: "https://data.nasa.gov/dataset/{}",
        keys: &["name", "id"],
    }),
    default_result_type: "NASA Dataset",
};

const NTRS_SHAPE: RecordShape = RecordShape {
    id: &["id", "ntrs_id", "recordId"],
    title: &["title", "documentTitle"],
    description: &["abstract", "description", "summary"],
    authors: &["authors", "creator"],
    date: &["publication_date", "publicationDate", "date"],
    tags: &["keywords", "subject_terms", "subjectTerms"],
    link: &[],
    score: &["relevance_score"],
    result_type: &[],
    link_template: Some(LinkTemplate {
        pattern: "https://ntrs.nasa.gov/citations/{}",
        keys: &["id", "ntrs_id", "recordId"],
    }),
    default_result_type: "Research Papers",
};

const NSLSL_SHAPE: RecordShape = RecordShape {
    id: &["experiment_id", "id", "recordId"],
    title: &["title", "experiment_name", "documentTitle"],
    description: &["description", "objective", "abstract"],
    authors: &["principal_investigator", "creator"],
    date: &["start_date", "date", "publicationDate"],
    tags: &["research_areas", "subjectTerms"],
    link: &[],
    score: &["relevance_score"],
    result_type: &[],
    link_template: Some(LinkTemplate {
        pattern: "https://ntrs.nasa.gov/citations/{}",
        keys: &["experiment_id", "id", "recordId"],
    }),
    default_result_type: "Space Life Sciences",
};

/// Field mapping for records returned by `api`.
pub fn shape_for(api: ApiKind) -> &'static RecordShape {
    match api {
        ApiKind::Osdr => &OSDR_SHAPE,
        ApiKind::OpenData => &OPEN_DATA_SHAPE,
        ApiKind::Ntrs => &NTRS_SHAPE,
        ApiKind::Nslsl => &NSLSL_SHAPE,
    }
}

/// Paths (tried in order) at which each API places its record array.
fn record_paths(api: ApiKind) -> &'static [&'static [&'static str]] {
    match api {
        ApiKind::Osdr => &[&["studies"], &["results"], &["hits", "hits"]],
        ApiKind::OpenData => &[&["result", "results"]],
        ApiKind::Ntrs => &[&["results"], &["hits", "hits"]],
        ApiKind::Nslsl => &[&["results"], &["documents"]],
    }
}

/// Extract raw records from a decoded API response body.
///
/// A missing record array yields no records. Elasticsearch-style hits are
/// unwrapped from their `_source` member. Non-object array entries are
/// skipped.
///
/// # Errors
///
/// Returns [`SourceError::MalformedResponse`] when the body is not a JSON
/// object or the record path holds something other than an array.
pub fn extract_records(api: ApiKind, body: Value) -> Result<Vec<RawRecord>, SourceError> {
    let Value::Object(root) = body else {
        return Err(SourceError::MalformedResponse(
            "expected a JSON object at the top level".into(),
        ));
    };

    let located = record_paths(api).iter().find_map(|path| {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(root.get(*first)?, |value, key| value.get(*key))
    });

    let items = match located {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(SourceError::MalformedResponse(
                "record list is not an array".into(),
            ));
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let item = match item {
            Value::Object(map) => match map.get("_source") {
                Some(Value::Object(source)) => source.clone(),
                _ => map.clone(),
            },
            _ => {
                tracing::debug!(?api, "skipping non-object record");
                continue;
            }
        };
        records.push(item);
    }
    Ok(records)
}

/// A NASA open-science API queried over HTTP.
pub struct NasaApiSource {
    config: SourceConfig,
    client: reqwest::Client,
    throttle: CourtesyThrottle,
}

impl NasaApiSource {
    /// Create a source from its configuration and the shared HTTP client.
    pub fn new(config: SourceConfig, client: reqwest::Client, jitter_ms: (u64, u64)) -> Self {
        let throttle = CourtesyThrottle::new(
            Duration::from_millis(config.min_request_interval_ms),
            jitter_ms,
        );
        Self {
            config,
            client,
            throttle,
        }
    }

    /// The configuration this source was built from.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn transport_error(&self, e: &reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(format!("{}: request timed out", self.config.name))
        } else {
            SourceError::Unavailable(format!("{}: request failed: {e}", self.config.name))
        }
    }
}

#[async_trait]
impl Source for NasaApiSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::External
    }

    fn shape(&self) -> &RecordShape {
        shape_for(self.config.api)
    }

    fn base_score(&self) -> Option<f64> {
        self.config.base_score
    }

    fn timeout_ms(&self) -> u64 {
        self.config.timeout_ms
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawRecord>, SourceError> {
        tracing::trace!(source = %self.config.name, query, limit, "NASA API search");

        self.throttle.acquire().await;

        let url = self.config.render_endpoint(query, limit);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(Duration::from_millis(self.config.timeout_ms))
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "{}: HTTP {status}",
                self.config.name
            )));
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(&e))?;
        tracing::trace!(source = %self.config.name, bytes = bytes.len(), "NASA API response received");

        let body: Value = serde_json::from_slice(&bytes).map_err(|e| {
            SourceError::MalformedResponse(format!("{}: invalid JSON: {e}", self.config.name))
        })?;

        let mut records = extract_records(self.config.api, body)?;
        records.truncate(limit);
        Ok(records)
    }
}
