//! Wire-level content model
//!
//! An [`InformationPiece`] is the unit of content exchanged with the
//! extractor service and the vector database: a typed payload plus a flat
//! list of JSON-encoded metadata entries.

use serde::{Deserialize, Serialize};

/// Metadata keys used across the pipeline
pub mod keys {
    /// Source name of the document the piece belongs to
    pub const DOCUMENT: &str = "document";
    /// Globally unique piece id
    pub const ID: &str = "id";
    /// Ids of related neighbour pieces
    pub const RELATED: &str = "related";
    /// Mirrors the outer content type
    pub const TYPE: &str = "type";
    /// Zero-based page number
    pub const PAGE: &str = "page";
    /// Zero-based chunk index
    pub const CHUNK: &str = "chunk";
    /// Chunk length in characters
    pub const CHUNK_LENGTH: &str = "chunk_length";
    /// URL under which the original document can be fetched
    pub const DOCUMENT_URL: &str = "document_url";
    /// Base64-encoded image payload
    pub const BASE64_IMAGE: &str = "base64_image";
}

/// Type of an information piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    /// Plain text content
    Text,
    /// Tabular content
    Table,
    /// Image content (payload in `base64_image` metadata)
    Image,
    /// Generated summary of other pieces
    Summary,
}

impl ContentType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Table => "TABLE",
            Self::Image => "IMAGE",
            Self::Summary => "SUMMARY",
        }
    }

    /// Parse a wire name
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TEXT" => Some(Self::Text),
            "TABLE" => Some(Self::Table),
            "IMAGE" => Some(Self::Image),
            "SUMMARY" => Some(Self::Summary),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metadata entry; `value` is a JSON-encoded scalar or list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    /// Metadata key
    pub key: String,
    /// JSON-encoded value
    pub value: String,
}

impl KeyValuePair {
    /// Create a pair from a key and an already JSON-encoded value
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a pair by JSON-encoding a serializable value
    pub fn encode<T: Serialize>(key: impl Into<String>, value: &T) -> crate::Result<Self> {
        Ok(Self {
            key: key.into(),
            value: serde_json::to_string(value)?,
        })
    }
}

/// A typed unit of indexed content with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationPiece {
    /// Content type
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Text payload (may be empty for images)
    pub page_content: String,
    /// Metadata entries with JSON-encoded values
    pub metadata: Vec<KeyValuePair>,
}

impl InformationPiece {
    /// Look up the raw (JSON-encoded) value for a metadata key
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| kv.value.as_str())
    }
}
