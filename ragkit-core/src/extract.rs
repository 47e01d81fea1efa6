//! Content extraction seam

use async_trait::async_trait;

use crate::error::Result;
use crate::piece::{InformationPiece, KeyValuePair};

/// Parameters for one extraction run
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Kind of source being extracted (`file`, `confluence`, a plug-in tag)
    pub source_type: String,
    /// Canonical source name the pieces will belong to
    pub document_name: String,
    /// Free-form extractor parameters; values are JSON-encoded strings
    pub kwargs: Vec<KeyValuePair>,
}

/// Remote service turning a raw source into information pieces
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract all pieces from the source described by `request`
    async fn extract(&self, request: ExtractionRequest) -> Result<Vec<InformationPiece>>;
}
