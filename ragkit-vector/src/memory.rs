//! In-memory vector database
//!
//! Full implementation of the `VectorDatabase` seam against process
//! memory: timestamped collections, a single alias map, dense/sparse
//! scoring with RRF fusion. Backs the test suites and local runs where a
//! real vector database is too heavy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use ragkit_core::document::ChunkDocument;
use ragkit_core::embed::{Embeddings, SparseEmbeddings, SparseVector};
use ragkit_core::error::{Error, Result};
use ragkit_core::piece::keys;
use ragkit_core::vector::{
    snapshot_name, AliasBinding, Filter, RetrievalMode, SearchArgs, VectorDatabase,
};

use crate::rrf::RrfFusion;
use crate::sparse::dot_product;

struct MemPoint {
    document: ChunkDocument,
    dense: Vec<f32>,
    sparse: SparseVector,
}

struct MemCollection {
    dense_dim: usize,
    points: Vec<MemPoint>,
}

/// In-memory implementation of [`VectorDatabase`]
pub struct MemoryVectorDb {
    alias_name: String,
    retrieval_mode: RetrievalMode,
    dense: Arc<dyn Embeddings>,
    sparse: Arc<dyn SparseEmbeddings>,
    fusion: RrfFusion,
    collections: RwLock<HashMap<String, MemCollection>>,
    aliases: RwLock<HashMap<String, String>>,
}

impl MemoryVectorDb {
    /// Create an empty store for the given production alias
    pub fn new(
        alias_name: impl Into<String>,
        retrieval_mode: RetrievalMode,
        dense: Arc<dyn Embeddings>,
        sparse: Arc<dyn SparseEmbeddings>,
    ) -> Self {
        Self {
            alias_name: alias_name.into(),
            retrieval_mode,
            dense,
            sparse,
            fusion: RrfFusion::new(),
            collections: RwLock::new(HashMap::new()),
            aliases: RwLock::new(HashMap::new()),
        }
    }

    fn aliased_collection(&self) -> Option<String> {
        self.aliases.read().get(&self.alias_name).cloned()
    }

    async fn embed_documents(
        &self,
        documents: &[ChunkDocument],
    ) -> Result<(Vec<Vec<f32>>, Vec<SparseVector>)> {
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let dense = self.dense.embed(&texts).await?;
        let sparse = self.sparse.embed_sparse(&texts).await?;
        if dense.len() != documents.len() || sparse.len() != documents.len() {
            return Err(Error::internal(
                "embedder returned a mismatched number of vectors",
            ));
        }
        Ok((dense, sparse))
    }

    /// Ranked `(point index, score)` candidates for one leg
    fn leg_candidates(
        collection: &MemCollection,
        filter: Option<&Filter>,
        limit: usize,
        threshold: Option<f32>,
        score: impl Fn(&MemPoint) -> f64,
    ) -> Vec<(String, f64)> {
        let mut candidates: Vec<(String, f64)> = collection
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| filter.map_or(true, |f| f.matches(&p.document)))
            .map(|(idx, p)| (idx.to_string(), score(p)))
            .filter(|(_, s)| threshold.map_or(true, |t| *s >= t as f64))
            .collect();
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        candidates.truncate(limit);
        candidates
    }
}

#[async_trait]
impl VectorDatabase for MemoryVectorDb {
    fn alias_name(&self) -> &str {
        &self.alias_name
    }

    async fn upload(
        &self,
        documents: Vec<ChunkDocument>,
        collection_name: Option<&str>,
    ) -> Result<()> {
        let (dense_vectors, sparse_vectors) = self.embed_documents(&documents).await?;
        let dim = self.dense.dimension();

        let target = match collection_name {
            Some(name) => name.to_string(),
            None => match self.aliased_collection() {
                Some(aliased) => aliased,
                None => {
                    // first upload: fresh snapshot, atomically aliased
                    let name = snapshot_name(&self.alias_name, Utc::now());
                    let mut aliases = self.aliases.write();
                    self.collections
                        .write()
                        .entry(name.clone())
                        .or_insert_with(|| MemCollection {
                            dense_dim: dim,
                            points: Vec::new(),
                        });
                    aliases.insert(self.alias_name.clone(), name.clone());
                    name
                }
            },
        };

        let mut collections = self.collections.write();
        let collection = collections.entry(target.clone()).or_insert_with(|| {
            MemCollection {
                dense_dim: dim,
                points: Vec::new(),
            }
        });
        if collection.dense_dim != dim {
            return Err(Error::validation(format!(
                "dense vector dimension mismatch: collection '{}' expects {}, embedder produces {}",
                target, collection.dense_dim, dim
            )));
        }

        debug!(collection = %target, points = documents.len(), "uploading points");
        for ((document, dense), sparse) in documents
            .into_iter()
            .zip(dense_vectors)
            .zip(sparse_vectors)
        {
            collection.points.push(MemPoint {
                document,
                dense,
                sparse,
            });
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        args: &SearchArgs,
        filter: Option<&Filter>,
    ) -> Result<Vec<ChunkDocument>> {
        let aliased = self.aliased_collection().ok_or_else(|| {
            Error::not_found(format!(
                "no collection bears the alias '{}'",
                self.alias_name
            ))
        })?;

        let query_text = [query.to_string()];
        let dense_query = match self.retrieval_mode {
            RetrievalMode::Sparse => None,
            _ => Some(
                self.dense
                    .embed(&query_text)
                    .await?
                    .pop()
                    .ok_or_else(|| Error::internal("embedder returned no query vector"))?,
            ),
        };
        let sparse_query = match self.retrieval_mode {
            RetrievalMode::Dense => None,
            _ => Some(
                self.sparse
                    .embed_sparse(&query_text)
                    .await?
                    .pop()
                    .ok_or_else(|| Error::internal("embedder returned no query vector"))?,
            ),
        };

        let collections = self.collections.read();
        let collection = collections.get(&aliased).ok_or_else(|| {
            Error::not_found(format!("collection '{}' does not exist", aliased))
        })?;

        let candidate_limit = (args.limit * 4).max(50);
        let dense_hits = dense_query
            .map(|q| {
                Self::leg_candidates(collection, filter, candidate_limit, args.score_threshold, |p| {
                    cosine_similarity(&q, &p.dense)
                })
            })
            .unwrap_or_default();
        let sparse_hits = sparse_query
            .map(|q| {
                Self::leg_candidates(collection, filter, candidate_limit, args.score_threshold, |p| {
                    dot_product(&q, &p.sparse)
                })
            })
            .unwrap_or_default();

        let ranked: Vec<String> = match self.retrieval_mode {
            RetrievalMode::Dense => dense_hits.into_iter().map(|(k, _)| k).collect(),
            RetrievalMode::Sparse => sparse_hits.into_iter().map(|(k, _)| k).collect(),
            RetrievalMode::Hybrid => self
                .fusion
                .fuse(&dense_hits, &sparse_hits)
                .into_iter()
                .map(|h| h.key)
                .collect(),
        };

        Ok(ranked
            .into_iter()
            .take(args.limit)
            .filter_map(|key| key.parse::<usize>().ok())
            .filter_map(|idx| collection.points.get(idx))
            .map(|p| p.document.clone())
            .collect())
    }

    async fn get_by_id(&self, document_id: &str) -> Result<Vec<ChunkDocument>> {
        let Some(aliased) = self.aliased_collection() else {
            return Ok(Vec::new());
        };
        let collections = self.collections.read();
        let Some(collection) = collections.get(&aliased) else {
            return Ok(Vec::new());
        };
        Ok(collection
            .points
            .iter()
            .filter(|p| {
                p.document
                    .metadata
                    .get(keys::ID)
                    .and_then(serde_json::Value::as_str)
                    == Some(document_id)
            })
            .map(|p| p.document.clone())
            .collect())
    }

    async fn delete(&self, filter: &Filter, collection_name: Option<&str>) -> Result<()> {
        let target = match collection_name {
            Some(name) => name.to_string(),
            None => self.aliased_collection().ok_or_else(|| {
                Error::not_found(format!(
                    "no collection bears the alias '{}'",
                    self.alias_name
                ))
            })?,
        };

        let mut collections = self.collections.write();
        let collection = collections.get_mut(&target).ok_or_else(|| {
            Error::not_found(format!("collection '{}' does not exist", target))
        })?;
        let before = collection.points.len();
        collection.points.retain(|p| !filter.matches(&p.document));
        debug!(collection = %target, removed = before - collection.points.len(), "deleted points");
        Ok(())
    }

    async fn collections(&self) -> Result<Vec<String>> {
        Ok(self.collections.read().keys().cloned().collect())
    }

    async fn aliases(&self) -> Result<Vec<AliasBinding>> {
        Ok(self
            .aliases
            .read()
            .iter()
            .map(|(alias, collection)| AliasBinding {
                alias_name: alias.clone(),
                collection_name: collection.clone(),
            })
            .collect())
    }

    async fn create_collection_from(&self, source: &str, target: &str) -> Result<()> {
        let mut collections = self.collections.write();
        let source_collection = collections.get(source).ok_or_else(|| {
            Error::not_found(format!("collection '{}' does not exist", source))
        })?;
        if collections.contains_key(target) {
            return Err(Error::conflict(format!(
                "collection '{}' already exists",
                target
            )));
        }

        let copy = MemCollection {
            dense_dim: source_collection.dense_dim,
            points: source_collection
                .points
                .iter()
                .map(|p| MemPoint {
                    document: p.document.clone(),
                    dense: p.dense.clone(),
                    sparse: p.sparse.clone(),
                })
                .collect(),
        };
        collections.insert(target.to_string(), copy);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        if self.collections.write().remove(name).is_none() {
            return Err(Error::not_found(format!(
                "collection '{}' does not exist",
                name
            )));
        }
        Ok(())
    }

    async fn switch_alias(&self, collection_name: &str) -> Result<()> {
        if !self.collections.read().contains_key(collection_name) {
            return Err(Error::not_found(format!(
                "collection '{}' does not exist",
                collection_name
            )));
        }
        // delete + create as one step under the write lock
        let mut aliases = self.aliases.write();
        aliases.remove(&self.alias_name);
        aliases.insert(self.alias_name.clone(), collection_name.to_string());
        Ok(())
    }

    async fn collection_available(&self) -> Result<bool> {
        let Some(aliased) = self.aliased_collection() else {
            return Ok(false);
        };
        Ok(self
            .collections
            .read()
            .get(&aliased)
            .is_some_and(|c| !c.points.is_empty()))
    }
}

/// Cosine similarity of two dense vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    let norms = norm_a.sqrt() * norm_b.sqrt();
    if norms == 0.0 {
        0.0
    } else {
        dot / norms
    }
}
