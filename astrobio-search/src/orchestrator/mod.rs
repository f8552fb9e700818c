//! Search orchestrator: concurrent source queries, dedup, scoring, ranking.
//!
//! This module fans out a query to the local dataset and the NASA APIs
//! concurrently, normalises what comes back, removes near-duplicate titles,
//! boosts title matches and returns a sorted, truncated result set.

pub mod aggregate;
pub mod dedup;
pub mod fanout;
pub mod scoring;

pub use aggregate::{SearchAggregator, SearchPhase, CONNECTIVITY_QUERY};
pub use fanout::SourceOutcome;
