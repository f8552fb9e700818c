//! Error types for the astrobio-search crate.
//!
//! Errors carry stable, lowercase messages suitable for display to API
//! callers. Query text never appears in an error message.

/// Failure of a single source call.
///
/// The fan-out treats every variant the same way: the failure is recorded
/// against the source and aggregation continues with the other sources.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// The source did not answer within its configured timeout.
    #[error("source timed out: {0}")]
    Timeout(String),

    /// The source could not be reached or answered with a non-2xx status.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered, but the body could not be interpreted.
    #[error("malformed source response: {0}")]
    MalformedResponse(String),
}

/// A raw record that carries none of the fields its shape maps.
///
/// Recovered locally by the caller: the record is dropped and never
/// surfaced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed record from {source_name}: no mapped fields present")]
pub struct MalformedRecord {
    /// Name of the source the record came from.
    pub source_name: String,
}

/// Request-level errors returned by the aggregator.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The local (primary) source failed; the request cannot be answered.
    #[error("local source failure: {0}")]
    LocalSourceFailure(#[source] SourceError),

    /// Invalid search configuration or request parameters.
    #[error("config error: {0}")]
    Config(String),

    /// The shared HTTP client could not be constructed.
    #[error("HTTP error: {0}")]
    Http(String),
}

/// Convenience type alias for astrobio-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_source_timeout() {
        let err = SourceError::Timeout("NTRS exceeded 8000ms".into());
        assert_eq!(err.to_string(), "source timed out: NTRS exceeded 8000ms");
    }

    #[test]
    fn display_source_unavailable() {
        let err = SourceError::Unavailable("HTTP 503".into());
        assert_eq!(err.to_string(), "source unavailable: HTTP 503");
    }

    #[test]
    fn display_malformed_response() {
        let err = SourceError::MalformedResponse("expected JSON object".into());
        assert_eq!(
            err.to_string(),
            "malformed source response: expected JSON object"
        );
    }

    #[test]
    fn display_malformed_record() {
        let err = MalformedRecord {
            source_name: "NASA OSDR".into(),
        };
        assert_eq!(
            err.to_string(),
            "malformed record from NASA OSDR: no mapped fields present"
        );
    }

    #[test]
    fn display_local_source_failure_wraps_cause() {
        let err = SearchError::LocalSourceFailure(SourceError::Unavailable(
            "no local datasets loaded".into(),
        ));
        assert_eq!(
            err.to_string(),
            "local source failure: source unavailable: no local datasets loaded"
        );
    }

    #[test]
    fn display_config() {
        let err = SearchError::Config("limit must be greater than 0".into());
        assert_eq!(err.to_string(), "config error: limit must be greater than 0");
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
        assert_send_sync::<SourceError>();
        assert_send_sync::<MalformedRecord>();
    }
}
