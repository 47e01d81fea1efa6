//! Internal pipeline document
//!
//! [`ChunkDocument`] is the form content takes between extraction and
//! indexing: decoded metadata, directly addressable by key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::piece::{keys, ContentType};

/// A document flowing through the ingestion pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChunkDocument {
    /// Text content
    pub page_content: String,
    /// Decoded metadata
    pub metadata: Map<String, Value>,
}

impl ChunkDocument {
    /// Create a document from content and metadata
    pub fn new(page_content: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }

    /// Piece id, if present
    pub fn id(&self) -> Option<&str> {
        self.metadata.get(keys::ID).and_then(Value::as_str)
    }

    /// Source name of the owning document, if present
    pub fn document(&self) -> Option<&str> {
        self.metadata.get(keys::DOCUMENT).and_then(Value::as_str)
    }

    /// Page number, if present
    pub fn page(&self) -> Option<u64> {
        self.metadata.get(keys::PAGE).and_then(Value::as_u64)
    }

    /// Content type recorded in the metadata, if present
    pub fn content_type(&self) -> Option<ContentType> {
        self.metadata
            .get(keys::TYPE)
            .and_then(Value::as_str)
            .and_then(ContentType::parse)
    }

    /// Ids of related neighbour pieces
    pub fn related(&self) -> Vec<String> {
        self.metadata
            .get(keys::RELATED)
            .and_then(Value::as_array)
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Set a metadata entry
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Replace the `related` list
    pub fn set_related(&mut self, related: Vec<String>) {
        self.metadata.insert(
            keys::RELATED.to_string(),
            Value::Array(related.into_iter().map(Value::String).collect()),
        );
    }

    /// Drop the document's own id from its `related` list
    pub fn remove_self_related(&mut self) {
        let Some(id) = self.id().map(str::to_string) else {
            return;
        };
        let related: Vec<String> = self.related().into_iter().filter(|r| *r != id).collect();
        self.set_related(related);
    }
}
