//! Embedding interfaces
//!
//! Dense and sparse embedding seams. Implementations live in the provider
//! and vector crates; the pipeline only depends on the traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Interface for dense embedding models
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Generate one embedding vector per input text
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimension of the produced vectors
    fn dimension(&self) -> usize;
}

/// A sparse vector: parallel index/value lists
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SparseVector {
    /// Dimension indices with non-zero weight
    pub indices: Vec<u32>,
    /// Weights matching `indices`
    pub values: Vec<f32>,
}

/// Interface for sparse (keyword-weight) embedding models
#[async_trait]
pub trait SparseEmbeddings: Send + Sync {
    /// Generate one sparse vector per input text
    async fn embed_sparse(&self, texts: &[String]) -> Result<Vec<SparseVector>>;
}
