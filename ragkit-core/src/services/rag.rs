//! Rag service
//!
//! Reader-facing retrieval plus the rollout and direct-ingestion
//! operations.

use std::sync::Arc;

use crate::collections::CollectionManager;
use crate::error::Result;
use crate::mapper::PieceMapper;
use crate::piece::{InformationPiece, KeyValuePair};
use crate::pieces::{PiecesRemover, PiecesUploader};
use crate::retriever::CompositeRetriever;
use crate::vector::Filter;

/// Reader and rollout API surface
pub struct RagService {
    pieces_uploader: Arc<PiecesUploader>,
    pieces_remover: Arc<PiecesRemover>,
    collections: Arc<CollectionManager>,
    retriever: Arc<CompositeRetriever>,
}

impl RagService {
    /// Wire up the rag surface
    pub fn new(
        pieces_uploader: Arc<PiecesUploader>,
        pieces_remover: Arc<PiecesRemover>,
        collections: Arc<CollectionManager>,
        retriever: Arc<CompositeRetriever>,
    ) -> Self {
        Self {
            pieces_uploader,
            pieces_remover,
            collections,
            retriever,
        }
    }

    /// `POST /information_pieces/upload`
    pub async fn upload_information_pieces(
        &self,
        pieces: Vec<InformationPiece>,
        use_latest_collection: bool,
    ) -> Result<()> {
        self.pieces_uploader
            .upload(pieces, use_latest_collection)
            .await
    }

    /// `POST /information_pieces/remove`
    pub async fn remove_information_pieces(
        &self,
        metadata: Vec<KeyValuePair>,
        use_latest_collection: bool,
    ) -> Result<()> {
        self.pieces_remover
            .remove(metadata, use_latest_collection)
            .await
    }

    /// `POST /collection/duplicate`; returns the new snapshot name
    pub async fn duplicate_collection(&self) -> Result<String> {
        self.collections.duplicate().await
    }

    /// `POST /collection/switch`
    pub async fn switch_collection(&self) -> Result<()> {
        self.collections.switch().await
    }

    /// Retrieve ranked passages for a prompt, optionally narrowed by a
    /// metadata conjunction
    pub async fn search(
        &self,
        prompt: &str,
        metadata: Option<Vec<KeyValuePair>>,
    ) -> Result<Vec<InformationPiece>> {
        let filter = metadata
            .map(|pairs| Filter::from_metadata_pairs(&pairs))
            .transpose()?;
        let documents = self.retriever.search(prompt, filter.as_ref()).await?;
        documents.iter().map(PieceMapper::to_piece).collect()
    }
}
