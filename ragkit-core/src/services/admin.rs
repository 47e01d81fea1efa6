//! Admin service
//!
//! Source registration, document lifecycle and status reporting.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::confluence::ConfluenceLoader;
use crate::error::Result;
use crate::piece::KeyValuePair;
use crate::status::{Status, StatusStore};
use crate::upload::SourceUploader;
use crate::util::sanitize_name;
use crate::vector::{Filter, VectorDatabase};

/// Status of one registered source, as listed to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStatus {
    /// Canonical source name
    pub name: String,
    /// Current pipeline status
    pub status: Status,
}

/// Administrative API surface
pub struct AdminService {
    uploader: Arc<SourceUploader>,
    confluence: Arc<ConfluenceLoader>,
    status: Arc<StatusStore>,
    blobs: Arc<dyn BlobStore>,
    db: Arc<dyn VectorDatabase>,
}

impl AdminService {
    /// Wire up the admin surface
    pub fn new(
        uploader: Arc<SourceUploader>,
        confluence: Arc<ConfluenceLoader>,
        status: Arc<StatusStore>,
        blobs: Arc<dyn BlobStore>,
        db: Arc<dyn VectorDatabase>,
    ) -> Self {
        Self {
            uploader,
            confluence,
            status,
            blobs,
            db,
        }
    }

    /// `POST /upload_source`
    pub async fn upload_source(
        &self,
        base_url: &str,
        source_type: &str,
        name: &str,
        kwargs: Vec<KeyValuePair>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.uploader
            .upload_source(base_url, source_type, name, kwargs, timeout)
            .await
    }

    /// `POST /upload_source` with a file part
    pub async fn upload_file(
        &self,
        base_url: &str,
        file_name: &str,
        content: Bytes,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.uploader
            .upload_file(base_url, file_name, content, timeout)
            .await
    }

    /// `POST /load_confluence`
    pub async fn load_confluence(&self, base_url: &str) -> Result<()> {
        self.confluence.load(base_url).await
    }

    /// `DELETE /delete_document/{id}`
    ///
    /// Removes every indexed piece of the source; for file sources the
    /// stored original is removed as well (best effort).
    pub async fn delete_document(&self, source_name: &str) -> Result<()> {
        self.db
            .delete(&Filter::document(source_name), None)
            .await?;
        if let Some(file_name) = source_name.strip_prefix("file:") {
            if let Err(e) = self.blobs.delete(file_name).await {
                debug!(source = %source_name, error = %e, "blob removal failed, continuing");
            }
        }
        info!(source = %source_name, "document deleted");
        Ok(())
    }

    /// `GET /document_reference/{id}`
    pub async fn document_reference(&self, document_name: &str) -> Result<Bytes> {
        self.blobs.get(&sanitize_name(document_name)?).await
    }

    /// `GET /all_documents_status`
    pub fn all_documents_status(&self) -> Vec<DocumentStatus> {
        self.status
            .get_all()
            .into_iter()
            .map(|(name, status)| DocumentStatus { name, status })
            .collect()
    }
}
