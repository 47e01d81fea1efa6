//! Shared test harness: a full control plane over in-memory collaborators

// not every suite uses every helper
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use ragkit_core::blob::{BlobStore, FileBlobStore};
use ragkit_core::chunk::TextChunker;
use ragkit_core::enhance::PassthroughEnhancer;
use ragkit_core::extract::Extractor;
use ragkit_core::piece::{ContentType, InformationPiece, KeyValuePair};
use ragkit_core::pieces::PiecesUploader;
use ragkit_core::status::StatusStore;
use ragkit_core::upload::SourceUploader;
use ragkit_core::vector::{RetrievalMode, VectorDatabase};
use ragkit_providers::mock::MockEmbeddings;
use ragkit_vector::{HashedSparseEmbedder, MemoryVectorDb};

pub struct Rig {
    pub uploader: Arc<SourceUploader>,
    pub db: Arc<MemoryVectorDb>,
    pub status: Arc<StatusStore>,
    pub blobs: Arc<FileBlobStore>,
    pub pieces: Arc<PiecesUploader>,
    _blob_dir: tempfile::TempDir,
}

/// Build an uploader over an in-memory vector database and the given extractor
pub fn rig(extractor: Arc<dyn Extractor>) -> Rig {
    let db = Arc::new(memory_db());
    let db_dyn: Arc<dyn VectorDatabase> = db.clone();
    let status = Arc::new(StatusStore::new(Duration::from_secs(600)));
    let blob_dir = tempfile::tempdir().expect("tempdir");
    let blobs = Arc::new(FileBlobStore::new(blob_dir.path()));
    let pieces = Arc::new(PiecesUploader::new(db_dyn.clone(), status.clone()));

    let uploader = Arc::new(SourceUploader::new(
        extractor,
        Arc::new(TextChunker::new()),
        Arc::new(PassthroughEnhancer),
        pieces.clone(),
        db_dyn,
        status.clone(),
        blobs.clone() as Arc<dyn BlobStore>,
        Duration::from_secs(5),
    ));

    Rig {
        uploader,
        db,
        status,
        blobs,
        pieces,
        _blob_dir: blob_dir,
    }
}

pub fn memory_db() -> MemoryVectorDb {
    MemoryVectorDb::new(
        "docs",
        RetrievalMode::Hybrid,
        Arc::new(MockEmbeddings::new()),
        Arc::new(HashedSparseEmbedder::new()),
    )
}

/// A TEXT piece the way the extractor emits it
pub fn extracted_text_piece(id: &str, related: &[&str], content: &str) -> InformationPiece {
    let related = serde_json::to_string(related).expect("serialize related");
    InformationPiece {
        content_type: ContentType::Text,
        page_content: content.to_string(),
        metadata: vec![
            KeyValuePair::new("id", format!("\"{}\"", id)),
            KeyValuePair::new("related", related),
            KeyValuePair::new("page", "0"),
            KeyValuePair::new("type", "\"TEXT\""),
        ],
    }
}
