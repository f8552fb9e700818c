//! Error types for the astrobio service.

use astrobio_search::SearchError;

/// Top-level error type for the HTTP service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration could not be loaded, saved or validated.
    #[error("config error: {0}")]
    Config(String),

    /// Search aggregation failed.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// The HTTP server could not bind or serve.
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
