//! Error types for the ragkit control plane

use thiserror::Error;

/// Result type alias using ragkit's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ragkit control plane
#[derive(Debug, Error)]
pub enum Error {
    // ============ Input Errors ============
    /// Bad input, malformed metadata, empty filter
    #[error("Validation error: {0}")]
    Validation(String),

    /// A source is already being processed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An exclusive background operation is already running
    #[error("Locked: {0}")]
    Locked(String),

    // ============ Lookup Errors ============
    /// No aliased snapshot, missing document, missing delete target
    #[error("Not found: {0}")]
    NotFound(String),

    /// A feature was invoked without the configuration it needs
    #[error("Unconfigured: {0}")]
    Unconfigured(String),

    // ============ Pipeline Errors ============
    /// A pipeline exceeded its deadline
    #[error("Timeout after {timeout_secs}s")]
    Timeout {
        /// Deadline that was exceeded, in seconds
        timeout_secs: u64,
    },

    /// Content extraction failed
    #[error("Extractor error: {0}")]
    Extractor(String),

    /// Vector database operation failed
    #[error("Vector database error: {0}")]
    VectorDb(String),

    // ============ Network Errors ============
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ============ System Errors ============
    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============ Generic Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a new locked error
    pub fn locked(msg: impl Into<String>) -> Self {
        Self::Locked(msg.into())
    }

    /// Create a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new unconfigured error
    pub fn unconfigured(msg: impl Into<String>) -> Self {
        Self::Unconfigured(msg.into())
    }

    /// Create a new vector database error
    pub fn vector_db(msg: impl Into<String>) -> Self {
        Self::VectorDb(msg.into())
    }

    /// Create a new extractor error
    pub fn extractor(msg: impl Into<String>) -> Self {
        Self::Extractor(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// HTTP status code this error surfaces as
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::Conflict(_) => 409,
            Self::Locked(_) => 423,
            Self::NotFound(_) => 404,
            Self::Unconfigured(_) => 501,
            Self::Timeout { .. } => 504,
            Self::Extractor(_)
            | Self::VectorDb(_)
            | Self::Http(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::Internal(_)
            | Self::Other(_) => 500,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::validation("bad").status_code(), 422);
        assert_eq!(Error::conflict("busy").status_code(), 409);
        assert_eq!(Error::locked("running").status_code(), 423);
        assert_eq!(Error::not_found("gone").status_code(), 404);
        assert_eq!(Error::unconfigured("no spaces").status_code(), 501);
        assert_eq!(Error::internal("boom").status_code(), 500);
    }

    #[test]
    fn test_retryable() {
        assert!(Error::Timeout { timeout_secs: 1 }.is_retryable());
        assert!(!Error::validation("bad").is_retryable());
    }
}
