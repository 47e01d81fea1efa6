//! Direct information-piece ingestion and removal
//!
//! Used by internal producers and the rag service: pieces go straight into
//! a collection without running the extraction pipeline.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::mapper::PieceMapper;
use crate::piece::{InformationPiece, KeyValuePair};
use crate::status::StatusStore;
use crate::vector::{Filter, VectorDatabase};

/// Resolve the ingestion target for `use_latest_collection` requests
async fn latest_snapshot(db: &dyn VectorDatabase) -> Result<String> {
    db.sorted_snapshots()
        .await?
        .pop()
        .ok_or_else(|| {
            Error::not_found(format!(
                "no snapshots found for alias '{}'",
                db.alias_name()
            ))
        })
}

/// Writes already-extracted pieces into the vector database
pub struct PiecesUploader {
    db: Arc<dyn VectorDatabase>,
    status: Arc<StatusStore>,
}

impl PiecesUploader {
    /// Create an uploader over the given database
    pub fn new(db: Arc<dyn VectorDatabase>, status: Arc<StatusStore>) -> Self {
        Self { db, status }
    }

    /// Validate, map and upload a batch of pieces.
    ///
    /// With `use_latest_collection` the batch goes into the newest snapshot
    /// (rolling-update ingestion); otherwise into the aliased one.
    pub async fn upload(
        &self,
        pieces: Vec<InformationPiece>,
        use_latest_collection: bool,
    ) -> Result<()> {
        let documents = pieces
            .iter()
            .map(PieceMapper::to_document)
            .collect::<Result<Vec<_>>>()?;

        let target = if use_latest_collection {
            Some(latest_snapshot(self.db.as_ref()).await?)
        } else {
            None
        };

        let count = documents.len();
        self.db.upload(documents, target.as_deref()).await?;
        self.status.subtract(1);
        info!(pieces = count, target = ?target, "uploaded information pieces");
        Ok(())
    }
}

/// Removes pieces matching a metadata filter
pub struct PiecesRemover {
    db: Arc<dyn VectorDatabase>,
}

impl PiecesRemover {
    /// Create a remover over the given database
    pub fn new(db: Arc<dyn VectorDatabase>) -> Self {
        Self { db }
    }

    /// Delete every piece matching the metadata conjunction.
    ///
    /// Rejects requests without any filter condition; a failing delete is
    /// reported as not-found (the snapshot or the points are gone).
    pub async fn remove(
        &self,
        metadata: Vec<KeyValuePair>,
        use_latest_collection: bool,
    ) -> Result<()> {
        let filter = Filter::from_metadata_pairs(&metadata)?;
        if filter.is_empty() {
            return Err(Error::validation("no search parameters found"));
        }

        let target = if use_latest_collection {
            Some(latest_snapshot(self.db.as_ref()).await?)
        } else {
            None
        };

        debug!(conditions = filter.must.len(), target = ?target, "removing information pieces");
        self.db
            .delete(&filter, target.as_deref())
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => e,
                other => Error::not_found(format!(
                    "could not delete matching pieces: {}",
                    other
                )),
            })
    }
}
