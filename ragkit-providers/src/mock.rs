//! Mock collaborators for testing

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use ragkit_core::embed::Embeddings;
use ragkit_core::enhance::Summarizer;
use ragkit_core::error::{Error, Result};
use ragkit_core::extract::{ExtractionRequest, Extractor};
use ragkit_core::piece::InformationPiece;

/// A mock extractor returning predefined pieces
pub struct MockExtractor {
    pieces: Vec<InformationPiece>,
    delay: Option<Duration>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockExtractor {
    /// Create a mock returning `pieces` on every call
    pub fn new(pieces: Vec<InformationPiece>) -> Self {
        Self {
            pieces,
            delay: None,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always returns nothing
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Sleep for `delay` before answering (for timeout tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every call with the given message
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            pieces: Vec::new(),
            delay: None,
            fail_with: Some(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times `extract` was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(&self, _request: ExtractionRequest) -> Result<Vec<InformationPiece>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.fail_with {
            return Err(Error::extractor(message.clone()));
        }
        Ok(self.pieces.clone())
    }
}

/// Deterministic dense embedder hashing terms into a small vector space
pub struct MockEmbeddings {
    dimension: usize,
}

impl MockEmbeddings {
    /// Create a mock embedder with the default dimension
    pub fn new() -> Self {
        Self { dimension: 16 }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for term in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hash: u64 = 5381;
            for b in term.to_lowercase().bytes() {
                hash = hash.wrapping_mul(33).wrapping_add(b as u64);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embeddings for MockEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// A mock summarizer with a recognizable output
pub struct MockSummarizer;

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let prefix: String = text.chars().take(40).collect();
        Ok(format!("summary: {}", prefix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_extractor_counts_calls() {
        let extractor = MockExtractor::empty();
        let request = ExtractionRequest {
            source_type: "web".to_string(),
            document_name: "web:x".to_string(),
            kwargs: vec![],
        };
        extractor.extract(request).await.unwrap();
        assert_eq!(extractor.calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_embeddings_similarity() {
        let embeddings = MockEmbeddings::new();
        let vectors = embeddings
            .embed(&[
                "rust search".to_string(),
                "rust search".to_string(),
                "completely different words".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(vectors[0], vectors[1]);
        assert_ne!(vectors[0], vectors[2]);
    }

    #[tokio::test]
    async fn test_mock_summarizer_marks_output() {
        let summary = MockSummarizer.summarize("page content").await.unwrap();
        assert!(summary.starts_with("summary:"));
    }
}
