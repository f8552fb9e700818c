//! Shared HTTP client for NASA API requests.
//!
//! One [`reqwest::Client`] is built at startup and shared by every
//! external source, so connection pools are reused across requests.
//! Per-source timeouts are enforced by the fan-out, not by the client.

use crate::config::SearchConfig;
use crate::error::SearchError;

/// User-Agent sent when the configuration does not override it.
pub const DEFAULT_USER_AGENT: &str = concat!("astrobio-search/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] configured for JSON API requests.
///
/// The client has:
/// - Custom or default User-Agent
/// - Brotli and gzip decompression
/// - A bounded redirect policy
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}
