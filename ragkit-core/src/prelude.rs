//! Convenience re-exports for wiring a control plane

pub use crate::blob::{BlobStore, FileBlobStore};
pub use crate::chunk::{Chunker, ChunkerConfig, TextChunker};
pub use crate::collections::CollectionManager;
pub use crate::confluence::{ConfluenceLoader, ConfluenceSettings, ConfluenceSpace};
pub use crate::document::ChunkDocument;
pub use crate::embed::{Embeddings, SparseEmbeddings, SparseVector};
pub use crate::enhance::{InformationEnhancer, PageSummaryEnhancer, PassthroughEnhancer, Summarizer};
pub use crate::error::{Error, Result};
pub use crate::extract::{ExtractionRequest, Extractor};
pub use crate::logging::{init_logging, LogGuard};
pub use crate::mapper::PieceMapper;
pub use crate::piece::{ContentType, InformationPiece, KeyValuePair};
pub use crate::pieces::{PiecesRemover, PiecesUploader};
pub use crate::retriever::{CompositeRetriever, RetrieverQuark, VectorQuark};
pub use crate::services::{AdminService, DocumentStatus, RagService};
pub use crate::settings::{LoggingSettings, UploaderSettings, VectorDbSettings};
pub use crate::status::{Status, StatusStore};
pub use crate::upload::SourceUploader;
pub use crate::vector::{
    AliasBinding, Filter, RetrievalMode, SearchArgs, VectorDatabase,
};
