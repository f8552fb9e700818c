//! # astrobio
//!
//! HTTP service for space-biology research search. Combines the local
//! article and Task Book datasets with NASA's open-science APIs through
//! [`astrobio_search::SearchAggregator`] and serves the results as JSON.
//!
//! ## Modules
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`error`]: service error type
//! - [`server`]: axum router and [`server::SearchServer`]

pub mod config;
pub mod error;
pub mod server;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use server::{AppState, SearchServer};
