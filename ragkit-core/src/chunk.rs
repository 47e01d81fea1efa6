//! Document chunking
//!
//! Splits pipeline documents into overlapping character windows. Every
//! chunk inherits its parent's metadata, receives a fresh id, and is
//! related to its sibling chunks.

use serde_json::Value;
use uuid::Uuid;

use crate::document::ChunkDocument;
use crate::error::{Error, Result};
use crate::piece::keys;

/// Splits documents into indexable chunks
pub trait Chunker: Send + Sync {
    /// Chunk all documents, preserving input order
    fn chunk(&self, documents: Vec<ChunkDocument>) -> Result<Vec<ChunkDocument>>;
}

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive windows in characters
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 100,
        }
    }
}

/// Sliding-window character chunker
pub struct TextChunker {
    config: ChunkerConfig,
}

impl TextChunker {
    /// Create a chunker with default configuration
    pub fn new() -> Self {
        Self::with_config(ChunkerConfig::default())
    }

    /// Create a chunker with custom configuration
    pub fn with_config(config: ChunkerConfig) -> Self {
        Self { config }
    }

    fn windows(&self, content: &str) -> Result<Vec<String>> {
        let stride = self.config.chunk_size.saturating_sub(self.config.overlap);
        if stride == 0 {
            return Err(Error::validation(
                "chunk size must be greater than overlap",
            ));
        }

        let chars: Vec<char> = content.chars().collect();
        if chars.len() <= self.config.chunk_size {
            return Ok(vec![content.to_string()]);
        }

        let mut windows = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.config.chunk_size).min(chars.len());
            windows.push(chars[start..end].iter().collect());
            if end >= chars.len() {
                break;
            }
            start += stride;
        }
        Ok(windows)
    }

    fn chunk_document(&self, document: &ChunkDocument) -> Result<Vec<ChunkDocument>> {
        let windows = self.windows(&document.page_content)?;
        let ids: Vec<String> = windows
            .iter()
            .map(|_| Uuid::new_v4().to_string())
            .collect();
        let parent_related = document.related();

        let mut chunks = Vec::with_capacity(windows.len());
        for (idx, window) in windows.into_iter().enumerate() {
            let mut chunk = ChunkDocument::new(window, document.metadata.clone());
            chunk.set(keys::ID, ids[idx].clone());
            chunk.set(keys::CHUNK, idx as u64);
            chunk.set(
                keys::CHUNK_LENGTH,
                chunk.page_content.chars().count() as u64,
            );

            let mut related = parent_related.clone();
            for (sibling_idx, sibling_id) in ids.iter().enumerate() {
                if sibling_idx != idx && !related.contains(sibling_id) {
                    related.push(sibling_id.clone());
                }
            }
            related.retain(|r| *r != ids[idx]);
            chunk.set(
                keys::RELATED,
                Value::Array(related.into_iter().map(Value::String).collect()),
            );

            chunks.push(chunk);
        }
        Ok(chunks)
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for TextChunker {
    fn chunk(&self, documents: Vec<ChunkDocument>) -> Result<Vec<ChunkDocument>> {
        let mut chunks = Vec::with_capacity(documents.len());
        for document in &documents {
            chunks.extend(self.chunk_document(document)?);
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(content: &str) -> ChunkDocument {
        let metadata = json!({
            "document": "file:doc.pdf",
            "id": "parent",
            "related": [],
            "type": "TEXT",
            "page": 0,
        });
        let Value::Object(map) = metadata else {
            panic!("metadata must be an object")
        };
        ChunkDocument::new(content, map)
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new();
        let chunks = chunker.chunk(vec![document("hello")]).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].page_content, "hello");
        assert_eq!(chunks[0].metadata.get("chunk"), Some(&json!(0)));
        assert_eq!(chunks[0].metadata.get("chunk_length"), Some(&json!(5)));
        assert!(chunks[0].related().is_empty());
        assert_ne!(chunks[0].id(), Some("parent"));
    }

    #[test]
    fn test_long_text_splits_with_overlap() {
        let chunker = TextChunker::with_config(ChunkerConfig {
            chunk_size: 10,
            overlap: 2,
        });
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = chunker.chunk(vec![document(text)]).unwrap();

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].page_content, "abcdefghij");
        // consecutive windows share the configured overlap
        assert!(chunks[1].page_content.starts_with("ij"));
        // full text is covered
        assert!(chunks.last().unwrap().page_content.ends_with('z'));
    }

    #[test]
    fn test_siblings_related_excluding_self() {
        let chunker = TextChunker::with_config(ChunkerConfig {
            chunk_size: 10,
            overlap: 0,
        });
        let chunks = chunker
            .chunk(vec![document("abcdefghijklmnopqrstuvwxyz")])
            .unwrap();

        let ids: Vec<String> = chunks.iter().map(|c| c.id().unwrap().to_string()).collect();
        for chunk in &chunks {
            let id = chunk.id().unwrap();
            let related = chunk.related();
            assert!(!related.contains(&id.to_string()));
            for other in ids.iter().filter(|i| *i != id) {
                assert!(related.contains(other));
            }
        }
    }

    #[test]
    fn test_parent_related_inherited() {
        let chunker = TextChunker::new();
        let mut doc = document("hello");
        doc.set_related(vec!["neighbour".to_string()]);

        let chunks = chunker.chunk(vec![doc]).unwrap();
        assert_eq!(chunks[0].related(), vec!["neighbour".to_string()]);
    }

    #[test]
    fn test_empty_content_passes_through() {
        let chunker = TextChunker::new();
        let chunks = chunker.chunk(vec![document("")]).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.get("chunk_length"), Some(&json!(0)));
    }

    #[test]
    fn test_zero_stride_rejected() {
        let chunker = TextChunker::with_config(ChunkerConfig {
            chunk_size: 10,
            overlap: 10,
        });
        assert!(chunker
            .chunk(vec![document(&"x".repeat(100))])
            .is_err());
    }

    #[test]
    fn test_fresh_unique_ids() {
        let chunker = TextChunker::with_config(ChunkerConfig {
            chunk_size: 5,
            overlap: 0,
        });
        let chunks = chunker
            .chunk(vec![document("aaaaabbbbbccccc"), document("dddddeeeee")])
            .unwrap();

        let mut ids: Vec<&str> = chunks.iter().filter_map(|c| c.id()).collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }
}
