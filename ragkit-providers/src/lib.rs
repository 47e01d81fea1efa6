//! # Ragkit Providers
//!
//! Reqwest clients for the control plane's remote collaborators: the
//! content extractor service, an OpenAI-compatible embedding endpoint, and
//! an OpenAI-compatible summarizer. Mock implementations for tests live in
//! [`mock`].

#![warn(missing_docs)]

// Re-export core types for convenience
pub use ragkit_core::embed::Embeddings;
pub use ragkit_core::enhance::Summarizer;
pub use ragkit_core::error::{Error, Result};
pub use ragkit_core::extract::Extractor;

pub mod embeddings;
pub mod extractor;
pub mod mock;
pub mod summarizer;

/// HTTP client configuration for the collaborator clients.
///
/// The two request profiles differ by an order of magnitude: extraction
/// crunches whole documents and Confluence spaces in one call, while the
/// inference endpoints (embeddings, summaries) answer per batch.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Overall deadline for one request
    pub request_timeout: std::time::Duration,
    /// Deadline for establishing a connection
    pub connect_timeout: std::time::Duration,
}

impl HttpConfig {
    /// Profile for the extractor service
    pub fn extraction() -> Self {
        Self {
            request_timeout: std::time::Duration::from_secs(900),
            connect_timeout: std::time::Duration::from_secs(10),
        }
    }

    /// Profile for embeddings and summarization endpoints
    pub fn inference() -> Self {
        Self {
            request_timeout: std::time::Duration::from_secs(120),
            connect_timeout: std::time::Duration::from_secs(10),
        }
    }

    /// Build a reqwest client with this profile
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!("ragkit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self::inference()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_profile_is_the_patient_one() {
        assert!(HttpConfig::extraction().request_timeout > HttpConfig::inference().request_timeout);
    }

    #[test]
    fn test_profiles_build_clients() {
        assert!(HttpConfig::extraction().build_client().is_ok());
        assert!(HttpConfig::inference().build_client().is_ok());
    }
}
