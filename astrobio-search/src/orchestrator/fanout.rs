//! Concurrent multi-source fan-out with per-source timeouts.
//!
//! Every enabled source is queried at once; each call is bounded by that
//! source's own timeout. A failure or timeout is recorded against the source
//! and never affects the others. Outcomes come back in registration order.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SourceError;
use crate::source::Source;
use crate::types::{RawRecord, SourceKind};

/// What one source produced for one query.
#[derive(Clone)]
pub struct SourceOutcome {
    /// The source that was queried.
    pub source: Arc<dyn Source>,
    /// Raw records, or the reason there are none.
    pub result: Result<Vec<RawRecord>, SourceError>,
    /// Wall time spent on the call, including any timeout.
    pub elapsed_ms: u64,
}

impl SourceOutcome {
    /// Source display name.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Local dataset or external API.
    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }
}

impl fmt::Debug for SourceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceOutcome")
            .field("source", &self.name())
            .field("result", &self.result)
            .field("elapsed_ms", &self.elapsed_ms)
            .finish()
    }
}

/// Query one source, bounded by its timeout.
pub async fn query_source(source: &Arc<dyn Source>, query: &str, limit: usize) -> SourceOutcome {
    let timeout_ms = source.timeout_ms();
    let started = tokio::time::Instant::now();
    let result =
        match tokio::time::timeout(Duration::from_millis(timeout_ms), source.fetch(query, limit))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(format!(
                "{} exceeded {timeout_ms}ms",
                source.name()
            ))),
        };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(records) => {
            tracing::debug!(source = source.name(), count = records.len(), elapsed_ms, "source returned records");
        }
        Err(e) => {
            tracing::warn!(source = source.name(), error = %e, elapsed_ms, "source query failed");
        }
    }

    SourceOutcome {
        source: Arc::clone(source),
        result,
        elapsed_ms,
    }
}

/// Query all enabled `sources` concurrently.
///
/// Disabled sources produce no outcome. The returned outcomes follow the
/// order of `sources`, not completion order.
pub async fn fan_out(sources: &[Arc<dyn Source>], query: &str, limit: usize) -> Vec<SourceOutcome> {
    let futures: Vec<_> = sources
        .iter()
        .filter(|source| source.enabled())
        .map(|source| query_source(source, query, limit))
        .collect();

    futures::future::join_all(futures).await
}
