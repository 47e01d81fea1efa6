//! Hashed sparse embedding
//!
//! Keyword leg of hybrid search without a vocabulary: terms are hashed
//! into a fixed index space and weighted by dampened term frequency.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use ragkit_core::embed::{SparseEmbeddings, SparseVector};
use ragkit_core::error::Result;

/// Size of the hashed index space
const INDEX_SPACE: u64 = 1 << 22;

/// Term-frequency sparse embedder over a hashed index space
pub struct HashedSparseEmbedder;

impl HashedSparseEmbedder {
    /// Create the embedder
    pub fn new() -> Self {
        Self
    }

    fn embed_one(text: &str) -> SparseVector {
        let mut frequencies: HashMap<u32, f32> = HashMap::new();
        for term in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            term.hash(&mut hasher);
            let index = (hasher.finish() % INDEX_SPACE) as u32;
            *frequencies.entry(index).or_insert(0.0) += 1.0;
        }

        let mut entries: Vec<(u32, f32)> = frequencies
            .into_iter()
            .map(|(index, tf)| (index, 1.0 + tf.ln()))
            .collect();
        entries.sort_by_key(|(index, _)| *index);

        SparseVector {
            indices: entries.iter().map(|(i, _)| *i).collect(),
            values: entries.iter().map(|(_, v)| *v).collect(),
        }
    }
}

impl Default for HashedSparseEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SparseEmbeddings for HashedSparseEmbedder {
    async fn embed_sparse(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }
}

/// Lowercased alphanumeric terms
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Dot product of two sparse vectors
pub fn dot_product(a: &SparseVector, b: &SparseVector) -> f64 {
    let weights: HashMap<u32, f32> = a
        .indices
        .iter()
        .copied()
        .zip(a.values.iter().copied())
        .collect();
    b.indices
        .iter()
        .zip(b.values.iter())
        .filter_map(|(index, value)| weights.get(index).map(|w| (*w as f64) * (*value as f64)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_text_same_vector() {
        let embedder = HashedSparseEmbedder::new();
        let vectors = embedder
            .embed_sparse(&["hello world".to_string(), "hello world".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors[0], vectors[1]);
        assert!(!vectors[0].indices.is_empty());
    }

    #[tokio::test]
    async fn test_shared_terms_score_higher() {
        let embedder = HashedSparseEmbedder::new();
        let vectors = embedder
            .embed_sparse(&[
                "rust async runtime".to_string(),
                "the rust async runtime schedules tasks".to_string(),
                "gardening for beginners".to_string(),
            ])
            .await
            .unwrap();

        let query = &vectors[0];
        assert!(dot_product(query, &vectors[1]) > dot_product(query, &vectors[2]));
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        let terms: Vec<String> = tokenize("Hello, World! 42").collect();
        assert_eq!(terms, vec!["hello", "world", "42"]);
    }

    #[test]
    fn test_dot_product_disjoint_is_zero() {
        let a = SparseVector {
            indices: vec![1, 2],
            values: vec![1.0, 1.0],
        };
        let b = SparseVector {
            indices: vec![3, 4],
            values: vec![1.0, 1.0],
        };
        assert_eq!(dot_product(&a, &b), 0.0);
    }
}
