//! Retrieval
//!
//! A retriever is composed of quarks, one per retrieval strategy. The
//! composite runs all quarks, filters out summaries, deduplicates, and
//! expands each hit by its related neighbours (one hop).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::document::ChunkDocument;
use crate::error::{Error, Result};
use crate::piece::ContentType;
use crate::vector::{Filter, SearchArgs, VectorDatabase};

/// One retrieval strategy
#[async_trait]
pub trait RetrieverQuark: Send + Sync {
    /// Fail unless the quark's backing store can answer queries
    async fn verify_readiness(&self) -> Result<()>;

    /// Run the strategy for a query
    async fn invoke(&self, query: &str, filter: Option<&Filter>) -> Result<Vec<ChunkDocument>>;
}

/// Quark backed by the vector database's hybrid search
pub struct VectorQuark {
    db: Arc<dyn VectorDatabase>,
    args: SearchArgs,
}

impl VectorQuark {
    /// Create a quark with the given search arguments
    pub fn new(db: Arc<dyn VectorDatabase>, args: SearchArgs) -> Self {
        Self { db, args }
    }
}

#[async_trait]
impl RetrieverQuark for VectorQuark {
    async fn verify_readiness(&self) -> Result<()> {
        if self.db.collection_available().await? {
            Ok(())
        } else {
            Err(Error::not_found("no documents available for retrieval"))
        }
    }

    async fn invoke(&self, query: &str, filter: Option<&Filter>) -> Result<Vec<ChunkDocument>> {
        self.db.search(query, &self.args, filter).await
    }
}

/// Runs all quarks and post-processes their results
pub struct CompositeRetriever {
    quarks: Vec<Arc<dyn RetrieverQuark>>,
    db: Arc<dyn VectorDatabase>,
}

impl CompositeRetriever {
    /// Compose a retriever from quarks; `db` answers neighbour lookups
    pub fn new(quarks: Vec<Arc<dyn RetrieverQuark>>, db: Arc<dyn VectorDatabase>) -> Self {
        Self { quarks, db }
    }

    /// Retrieve passages for a prompt.
    ///
    /// Summaries never surface to readers; duplicates are dropped keeping
    /// first-seen order; every remaining hit is expanded by its `related`
    /// neighbours. An empty result is a valid answer.
    pub async fn search(
        &self,
        prompt: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<ChunkDocument>> {
        for quark in &self.quarks {
            quark.verify_readiness().await?;
        }

        let mut results = Vec::new();
        for quark in &self.quarks {
            results.extend(quark.invoke(prompt, filter).await?);
        }
        debug!(hits = results.len(), "retrieval quarks returned");

        results.retain(|d| d.content_type() != Some(ContentType::Summary));
        let results = dedup_by_id(results);

        let mut expanded = Vec::with_capacity(results.len());
        for document in &results {
            expanded.push(document.clone());
            for related_id in document.related() {
                expanded.extend(self.db.get_by_id(&related_id).await?);
            }
        }

        Ok(dedup_by_id(expanded))
    }
}

/// Drop documents whose id was already seen, preserving order.
///
/// Documents without an id cannot be deduplicated and are kept.
fn dedup_by_id(documents: Vec<ChunkDocument>) -> Vec<ChunkDocument> {
    let mut seen: HashSet<String> = HashSet::new();
    documents
        .into_iter()
        .filter(|d| match d.id() {
            Some(id) => seen.insert(id.to_string()),
            None => true,
        })
        .collect()
}
