//! Trait definition for pluggable search sources.
//!
//! The local dataset and every NASA API client implement [`Source`] so the
//! fan-out can query them uniformly.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::normalize::{RecordShape, SourceContext};
use crate::types::{RawRecord, SourceKind};

/// A searchable origin of records.
///
/// Implementors return raw records; normalisation into
/// [`SearchResult`](crate::types::SearchResult) happens centrally using the
/// source's [`RecordShape`]. All implementations must be `Send + Sync` so
/// they can be queried concurrently from shared handles.
#[async_trait]
pub trait Source: Send + Sync {
    /// Display name used for attribution and error reports. Unique per
    /// aggregator.
    fn name(&self) -> &str;

    /// Local dataset or external API.
    fn kind(&self) -> SourceKind;

    /// Field mapping for this source's records.
    fn shape(&self) -> &RecordShape;

    /// Prior relevance for records that carry no explicit score.
    fn base_score(&self) -> Option<f64> {
        None
    }

    /// Upper bound for one [`fetch`](Self::fetch) call, in milliseconds.
    fn timeout_ms(&self) -> u64;

    /// Disabled sources are skipped by the fan-out.
    fn enabled(&self) -> bool {
        true
    }

    /// Fetch up to `limit` raw records matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on timeout, transport failure, non-2xx status
    /// or an uninterpretable body.
    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<RawRecord>, SourceError>;

    /// Attribution details passed to the normaliser.
    fn context(&self) -> SourceContext<'_> {
        SourceContext {
            name: self.name(),
            kind: self.kind(),
            base_score: self.base_score(),
        }
    }
}
