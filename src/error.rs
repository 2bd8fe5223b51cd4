//! Custom error types for rustarxiv.
//!
//! Only a malformed upstream feed is meant to reach the caller of a search.
//! Everything a translation or text-generation provider can raise is
//! absorbed by the enrichment pipeline as a graceful skip; see
//! [`PipelineError::is_degradable`].

use thiserror::Error;

/// Main error type for rustarxiv operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network/HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The index answered with a document that is not a well-formed feed
    #[error("Feed error: {0}")]
    Feed(String),

    /// External API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message from API
        message: String,
    },

    /// Provider credentials are absent
    #[error("{0} provider is not configured")]
    NotConfigured(&'static str),

    /// A provider call exceeded its deadline
    #[error("{what} timed out after {secs}s")]
    Timeout {
        /// Which call timed out
        what: &'static str,
        /// Deadline in seconds
        secs: u64,
    },

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl PipelineError {
    /// Whether a provider failure of this kind should degrade output
    /// instead of failing the request.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            PipelineError::Network(_)
                | PipelineError::Api { .. }
                | PipelineError::NotConfigured(_)
                | PipelineError::Timeout { .. }
                | PipelineError::Json(_)
        )
    }
}

/// Result type alias using `PipelineError`
pub type Result<T> = std::result::Result<T, PipelineError>;
