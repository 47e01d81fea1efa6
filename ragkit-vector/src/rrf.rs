//! Reciprocal Rank Fusion
//!
//! Merges the dense and sparse candidate lists of a hybrid search into one
//! ranking. Each list contributes `weight / (k + rank)` per hit; hits found
//! by both lists accumulate both contributions.

use std::collections::HashMap;

/// RRF parameters
#[derive(Debug, Clone)]
pub struct RrfConfig {
    /// Rank dampening constant (typically 60)
    pub k: usize,
    /// Weight of the dense leg
    pub dense_weight: f64,
    /// Weight of the sparse leg
    pub sparse_weight: f64,
}

impl Default for RrfConfig {
    fn default() -> Self {
        Self {
            k: 60,
            dense_weight: 1.0,
            sparse_weight: 1.0,
        }
    }
}

/// One fused hit
#[derive(Debug, Clone)]
pub struct FusedHit {
    /// Point key the hit refers to
    pub key: String,
    /// Combined RRF score
    pub rrf_score: f64,
    /// Original dense score, if the dense leg found it
    pub dense_score: Option<f64>,
    /// Original sparse score, if the sparse leg found it
    pub sparse_score: Option<f64>,
}

/// Reciprocal rank fusion over two ranked candidate lists
pub struct RrfFusion {
    config: RrfConfig,
}

impl RrfFusion {
    /// Create a fusion with default parameters
    pub fn new() -> Self {
        Self::with_config(RrfConfig::default())
    }

    /// Create a fusion with custom parameters
    pub fn with_config(config: RrfConfig) -> Self {
        Self { config }
    }

    /// Fuse two candidate lists ordered best-first.
    ///
    /// Returns hits ordered by combined score, best first.
    pub fn fuse(&self, dense: &[(String, f64)], sparse: &[(String, f64)]) -> Vec<FusedHit> {
        let mut merged: HashMap<String, FusedHit> = HashMap::new();

        for (rank, (key, score)) in dense.iter().enumerate() {
            let contribution = self.config.dense_weight / (self.config.k + rank + 1) as f64;
            let hit = merged.entry(key.clone()).or_insert_with(|| FusedHit {
                key: key.clone(),
                rrf_score: 0.0,
                dense_score: None,
                sparse_score: None,
            });
            hit.rrf_score += contribution;
            hit.dense_score = Some(*score);
        }

        for (rank, (key, score)) in sparse.iter().enumerate() {
            let contribution = self.config.sparse_weight / (self.config.k + rank + 1) as f64;
            let hit = merged.entry(key.clone()).or_insert_with(|| FusedHit {
                key: key.clone(),
                rrf_score: 0.0,
                dense_score: None,
                sparse_score: None,
            });
            hit.rrf_score += contribution;
            hit.sparse_score = Some(*score);
        }

        let mut hits: Vec<FusedHit> = merged.into_values().collect();
        hits.sort_by(|a, b| {
            b.rrf_score
                .partial_cmp(&a.rrf_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.key.cmp(&b.key))
        });
        hits
    }
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[(&str, f64)]) -> Vec<(String, f64)> {
        entries.iter().map(|(k, s)| (k.to_string(), *s)).collect()
    }

    #[test]
    fn test_hit_in_both_lists_wins() {
        let fusion = RrfFusion::new();
        let dense = list(&[("a", 0.9), ("b", 0.8)]);
        let sparse = list(&[("c", 12.0), ("a", 9.0)]);

        let fused = fusion.fuse(&dense, &sparse);
        assert_eq!(fused[0].key, "a");
        assert!(fused[0].dense_score.is_some());
        assert!(fused[0].sparse_score.is_some());
    }

    #[test]
    fn test_single_leg_order_is_preserved() {
        let fusion = RrfFusion::new();
        let dense = list(&[("a", 0.9), ("b", 0.5), ("c", 0.1)]);

        let fused = fusion.fuse(&dense, &[]);
        let keys: Vec<&str> = fused.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_weights_shift_ranking() {
        let fusion = RrfFusion::with_config(RrfConfig {
            k: 60,
            dense_weight: 0.0,
            sparse_weight: 1.0,
        });
        let dense = list(&[("a", 1.0)]);
        let sparse = list(&[("b", 1.0)]);

        let fused = fusion.fuse(&dense, &sparse);
        assert_eq!(fused[0].key, "b");
    }

    #[test]
    fn test_empty_lists() {
        let fusion = RrfFusion::new();
        assert!(fusion.fuse(&[], &[]).is_empty());
    }
}
