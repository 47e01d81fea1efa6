//! Content enhancement
//!
//! Enhancers run between chunking and indexing. They may append derived
//! pieces (summaries) but must pass the input chunks through with their
//! `id` and `related` metadata untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;
use uuid::Uuid;

use crate::document::ChunkDocument;
use crate::error::{Error, Result};
use crate::piece::{keys, ContentType};

/// Enriches chunked documents before indexing
#[async_trait]
pub trait InformationEnhancer: Send + Sync {
    /// Enhance the documents; the input documents are always part of the result
    async fn enhance(&self, documents: Vec<ChunkDocument>) -> Result<Vec<ChunkDocument>>;
}

/// Enhancer that returns its input unchanged
pub struct PassthroughEnhancer;

#[async_trait]
impl InformationEnhancer for PassthroughEnhancer {
    async fn enhance(&self, documents: Vec<ChunkDocument>) -> Result<Vec<ChunkDocument>> {
        Ok(documents)
    }
}

/// Produces a short summary of a block of text
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize `text`
    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Appends one SUMMARY piece per page.
///
/// Summarization is the slow, rate-limited part of the pipeline; concurrent
/// summarizer calls are capped by a semaphore.
pub struct PageSummaryEnhancer {
    summarizer: Arc<dyn Summarizer>,
    max_concurrency: usize,
}

impl PageSummaryEnhancer {
    /// Create an enhancer capping concurrent summarizer calls at `max_concurrency`
    pub fn new(summarizer: Arc<dyn Summarizer>, max_concurrency: usize) -> Self {
        Self {
            summarizer,
            max_concurrency: max_concurrency.max(1),
        }
    }
}

#[async_trait]
impl InformationEnhancer for PageSummaryEnhancer {
    async fn enhance(&self, documents: Vec<ChunkDocument>) -> Result<Vec<ChunkDocument>> {
        // page -> (chunk ids, joined content); documents without a page
        // number are indexed as-is but not summarized
        let mut pages: BTreeMap<u64, (Vec<String>, Vec<&str>)> = BTreeMap::new();
        for document in &documents {
            let (Some(page), Some(id)) = (document.page(), document.id()) else {
                continue;
            };
            let entry = pages.entry(page).or_default();
            entry.0.push(id.to_string());
            entry.1.push(document.page_content.as_str());
        }

        let document_name = documents
            .first()
            .and_then(|d| d.document())
            .map(str::to_string);

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut jobs = Vec::new();
        for (page, (ids, contents)) in pages {
            let text = contents.join("\n\n");
            if text.trim().is_empty() {
                continue;
            }
            let summarizer = Arc::clone(&self.summarizer);
            let semaphore = Arc::clone(&semaphore);
            let document_name = document_name.clone();
            jobs.push(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| Error::internal("summary semaphore closed"))?;
                debug!(page, chunks = ids.len(), "summarizing page");
                let summary = summarizer.summarize(&text).await?;
                Ok::<ChunkDocument, Error>(summary_document(summary, page, ids, document_name))
            });
        }

        let summaries = futures::future::try_join_all(jobs).await?;

        let mut result = documents;
        result.extend(summaries);
        Ok(result)
    }
}

fn summary_document(
    summary: String,
    page: u64,
    related: Vec<String>,
    document_name: Option<String>,
) -> ChunkDocument {
    let mut doc = ChunkDocument::new(summary, serde_json::Map::new());
    if let Some(name) = document_name {
        doc.set(keys::DOCUMENT, name);
    }
    doc.set(keys::ID, Uuid::new_v4().to_string());
    doc.set(keys::PAGE, page);
    doc.set(keys::TYPE, ContentType::Summary.as_str());
    doc.set(
        keys::RELATED,
        Value::Array(related.into_iter().map(Value::String).collect()),
    );
    doc
}
