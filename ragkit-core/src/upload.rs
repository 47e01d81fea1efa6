//! Source upload pipeline
//!
//! One background task per source drives extract -> chunk -> enhance ->
//! index. Uploads for the same source are mutually exclusive; the caller
//! waits up to a deadline, after which the task is cancelled and the
//! source is marked failed. Cancellation is cooperative: the task checks
//! the signal at every step boundary and a cancelled pipeline never writes
//! to the vector store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::blob::BlobStore;
use crate::chunk::Chunker;
use crate::document::ChunkDocument;
use crate::enhance::InformationEnhancer;
use crate::error::{Error, Result};
use crate::extract::{ExtractionRequest, Extractor};
use crate::mapper::PieceMapper;
use crate::piece::{keys, InformationPiece, KeyValuePair};
use crate::pieces::PiecesUploader;
use crate::status::{Status, StatusStore};
use crate::util::{document_reference_url, sanitize_name, source_name};
use crate::vector::{Filter, VectorDatabase};

/// Source type whose documents live in the blob store
const FILE_SOURCE_TYPE: &str = "file";

/// An in-flight upload
#[derive(Debug, Clone)]
pub struct UploadTask {
    /// Cooperative cancellation signal for the pipeline task
    pub cancel: CancellationToken,
    /// When the pipeline was scheduled
    pub started_at: Instant,
}

/// Drives the per-source ingestion pipeline
pub struct SourceUploader {
    extractor: Arc<dyn Extractor>,
    chunker: Arc<dyn Chunker>,
    enhancer: Arc<dyn InformationEnhancer>,
    pieces: Arc<PiecesUploader>,
    db: Arc<dyn VectorDatabase>,
    status: Arc<StatusStore>,
    blobs: Arc<dyn BlobStore>,
    default_timeout: Duration,
    tasks: Arc<DashMap<String, UploadTask>>,
}

impl SourceUploader {
    /// Wire up an uploader over its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extractor: Arc<dyn Extractor>,
        chunker: Arc<dyn Chunker>,
        enhancer: Arc<dyn InformationEnhancer>,
        pieces: Arc<PiecesUploader>,
        db: Arc<dyn VectorDatabase>,
        status: Arc<StatusStore>,
        blobs: Arc<dyn BlobStore>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            chunker,
            enhancer,
            pieces,
            db,
            status,
            blobs,
            default_timeout,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Upload a typed source.
    ///
    /// Computes the canonical source name, rejects concurrent uploads of the
    /// same source, and runs the pipeline in the background while waiting up
    /// to `timeout` (the configured default when `None`). A deadline that
    /// elapses marks the source failed, raises the cancel signal and returns
    /// without an error; the request has been accepted either way.
    #[instrument(skip(self, kwargs, timeout), fields(source_type = %source_type))]
    pub async fn upload_source(
        &self,
        base_url: &str,
        source_type: &str,
        name: &str,
        kwargs: Vec<KeyValuePair>,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let source_name = source_name(source_type, name)?;
        let cancel = self.reserve(&source_name)?;
        self.status.upsert(&source_name, Status::Processing);

        let file_name = if source_type == FILE_SOURCE_TYPE {
            Some(sanitize_name(name)?)
        } else {
            None
        };

        self.run_pipeline(
            source_name,
            base_url,
            source_type,
            file_name,
            kwargs,
            timeout,
            cancel,
        )
        .await
    }

    /// Upload a file source.
    ///
    /// Stores the raw bytes in the blob store first (a failing store is a
    /// hard error for file sources), then runs the regular pipeline with the
    /// blob key passed to the extractor as `s3_path`.
    #[instrument(skip(self, content, timeout), fields(file = %file_name))]
    pub async fn upload_file(
        &self,
        base_url: &str,
        file_name: &str,
        content: Bytes,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let sanitized = sanitize_name(file_name)?;
        let source_name = format!("{}:{}", FILE_SOURCE_TYPE, sanitized);
        let cancel = self.reserve(&source_name)?;
        self.status.upsert(&source_name, Status::Processing);

        if let Err(e) = self.blobs.put(&sanitized, content).await {
            error!(source = %source_name, error = %e, "failed to store uploaded file");
            self.status.upsert(&source_name, Status::Error);
            self.tasks.remove(&source_name);
            return Err(e);
        }

        let kwargs = vec![KeyValuePair::encode("s3_path", &sanitized)?];
        self.run_pipeline(
            source_name,
            base_url,
            FILE_SOURCE_TYPE,
            Some(sanitized),
            kwargs,
            timeout,
            cancel,
        )
        .await
    }

    /// Snapshot of the in-flight uploads
    pub fn active_uploads(&self) -> Vec<(String, UploadTask)> {
        self.tasks
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Reserve the source for one pipeline run
    fn reserve(&self, source_name: &str) -> Result<CancellationToken> {
        if self.status.get(source_name) == Some(Status::Processing) {
            return Err(Error::conflict(format!(
                "source '{}' is already being processed",
                source_name
            )));
        }
        match self.tasks.entry(source_name.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(Error::conflict(format!(
                "source '{}' is already being processed",
                source_name
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let cancel = CancellationToken::new();
                slot.insert(UploadTask {
                    cancel: cancel.clone(),
                    started_at: Instant::now(),
                });
                Ok(cancel)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_pipeline(
        &self,
        source_name: String,
        base_url: &str,
        source_type: &str,
        file_name: Option<String>,
        kwargs: Vec<KeyValuePair>,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let ctx = PipelineCtx {
            source_name: source_name.clone(),
            base_url: base_url.to_string(),
            source_type: source_type.to_string(),
            file_name,
            kwargs,
            extractor: Arc::clone(&self.extractor),
            chunker: Arc::clone(&self.chunker),
            enhancer: Arc::clone(&self.enhancer),
            pieces: Arc::clone(&self.pieces),
            db: Arc::clone(&self.db),
            status: Arc::clone(&self.status),
            tasks: Arc::clone(&self.tasks),
            cancel: cancel.clone(),
        };

        let handle = tokio::spawn(ctx.run());
        let timeout = timeout.unwrap_or(self.default_timeout);

        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(join_error)) => {
                error!(source = %source_name, error = %join_error, "upload pipeline aborted");
                self.status.upsert(&source_name, Status::Error);
                self.tasks.remove(&source_name);
                Ok(())
            }
            Err(_) => {
                warn!(source = %source_name, timeout_secs = timeout.as_secs_f64(), "upload pipeline timed out");
                self.status.upsert(&source_name, Status::Error);
                cancel.cancel();
                Ok(())
            }
        }
    }
}

/// Everything one pipeline task needs, moved into the task
struct PipelineCtx {
    source_name: String,
    base_url: String,
    source_type: String,
    file_name: Option<String>,
    kwargs: Vec<KeyValuePair>,
    extractor: Arc<dyn Extractor>,
    chunker: Arc<dyn Chunker>,
    enhancer: Arc<dyn InformationEnhancer>,
    pieces: Arc<PiecesUploader>,
    db: Arc<dyn VectorDatabase>,
    status: Arc<StatusStore>,
    tasks: Arc<DashMap<String, UploadTask>>,
    cancel: CancellationToken,
}

impl PipelineCtx {
    async fn run(self) {
        let source_name = self.source_name.clone();
        match self.execute().await {
            Ok(()) => {}
            Err(e) => {
                // a timed-out pipeline is already marked failed; stay silent
                if !self.cancel.is_cancelled() {
                    error!(source = %source_name, error = %e, "error while uploading source");
                    self.status.upsert(&source_name, Status::Error);
                }
            }
        }
        self.tasks.remove(&source_name);
    }

    async fn execute(&self) -> Result<()> {
        // 1. extract
        let request = ExtractionRequest {
            source_type: self.source_type.clone(),
            document_name: self.source_name.clone(),
            kwargs: self.kwargs.clone(),
        };
        let pieces = self.extractor.extract(request).await?;
        if pieces.is_empty() {
            return Err(Error::extractor(format!(
                "no information pieces found in source '{}'",
                self.source_name
            )));
        }
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        // 2. map to pipeline documents; every piece belongs to this source
        let mut documents = pieces
            .iter()
            .map(PieceMapper::from_extractor)
            .collect::<Result<Vec<ChunkDocument>>>()?;
        for document in &mut documents {
            document.set(keys::DOCUMENT, self.source_name.clone());
        }
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        // 3. chunk
        let chunks = self.chunker.chunk(documents)?;
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        // 4. enhance (slow, rate-limited)
        let mut enhanced = self.enhancer.enhance(chunks).await?;
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        // 5. file sources link back to the stored original
        if self.source_type == FILE_SOURCE_TYPE {
            self.add_file_url(&mut enhanced);
        }

        // 6. map to vector-store pieces
        let pieces = enhanced
            .iter()
            .map(PieceMapper::to_piece)
            .collect::<Result<Vec<InformationPiece>>>()?;

        // 7. best-effort removal of any prior version of this source
        if let Err(e) = self
            .db
            .delete(&Filter::document(&self.source_name), None)
            .await
        {
            debug!(source = %self.source_name, error = %e, "prior-version delete failed, continuing");
        }
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        // 8. upload
        self.status.upsert(&self.source_name, Status::Uploading);
        self.status.add(1);
        self.pieces.upload(pieces, false).await?;

        // 9. done; a cancelled pipeline must not overwrite the failure mark
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        self.status.upsert(&self.source_name, Status::Ready);
        info!(source = %self.source_name, "source uploaded successfully");
        Ok(())
    }

    fn add_file_url(&self, documents: &mut [ChunkDocument]) {
        let Some(file_name) = self.file_name.as_deref() else {
            return;
        };
        let document_url = document_reference_url(&self.base_url, file_name);
        for (idx, document) in documents.iter_mut().enumerate() {
            document.remove_self_related();
            document.set(keys::CHUNK, idx as u64);
            document.set(
                keys::CHUNK_LENGTH,
                document.page_content.chars().count() as u64,
            );
            document.set(keys::DOCUMENT_URL, document_url.clone());
        }
    }
}
