//! Extractor service client
//!
//! The extractor is a separate service that turns raw sources (stored
//! files, Confluence spaces, plug-in sources) into information pieces.
//! File sources are extracted from their blob key; everything else goes
//! through the generic source endpoint with free-form parameters.

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use ragkit_core::error::{Error, Result};
use ragkit_core::extract::{ExtractionRequest, Extractor};
use ragkit_core::piece::{InformationPiece, KeyValuePair};

use crate::HttpConfig;

/// Source type whose payload is read from the blob store
const FILE_SOURCE_TYPE: &str = "file";
/// Kwarg carrying the blob key of an uploaded file
const S3_PATH_KEY: &str = "s3_path";

/// HTTP client for the extractor service
pub struct HttpExtractor {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ExtractFromFileRequest<'a> {
    path_on_s3: &'a str,
    document_name: &'a str,
}

#[derive(Debug, Serialize)]
struct ExtractFromSourceRequest<'a> {
    #[serde(rename = "type")]
    source_type: &'a str,
    document_name: &'a str,
    kwargs: &'a [KeyValuePair],
}

impl HttpExtractor {
    /// Create a client for the extractor at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(base_url, HttpConfig::extraction())
    }

    /// Create a client with custom HTTP settings
    pub fn with_config(base_url: impl Into<String>, config: HttpConfig) -> Result<Self> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: config.build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post_extract<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Vec<InformationPiece>> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::extractor(format!(
                "extractor returned {}: {}",
                status, detail
            )));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<Vec<InformationPiece>> {
        let s3_path = request
            .kwargs
            .iter()
            .find(|kv| kv.key == S3_PATH_KEY)
            .map(|kv| serde_json::from_str::<String>(&kv.value))
            .transpose()?;

        let pieces = if request.source_type == FILE_SOURCE_TYPE {
            let path_on_s3 = s3_path.ok_or_else(|| {
                Error::validation("file extraction requires an s3_path parameter")
            })?;
            debug!(document = %request.document_name, path = %path_on_s3, "extracting file");
            self.post_extract(
                "/extract_from_file",
                &ExtractFromFileRequest {
                    path_on_s3: &path_on_s3,
                    document_name: &request.document_name,
                },
            )
            .await?
        } else {
            debug!(document = %request.document_name, source_type = %request.source_type, "extracting source");
            self.post_extract(
                "/extract_from_source",
                &ExtractFromSourceRequest {
                    source_type: &request.source_type,
                    document_name: &request.document_name,
                    kwargs: &request.kwargs,
                },
            )
            .await?
        };

        debug!(document = %request.document_name, pieces = pieces.len(), "extraction finished");
        Ok(pieces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_request_wire_format() {
        let request = ExtractFromFileRequest {
            path_on_s3: "report.pdf",
            document_name: "file:report.pdf",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "path_on_s3": "report.pdf", "document_name": "file:report.pdf" })
        );
    }

    #[test]
    fn test_source_request_wire_format() {
        let kwargs = vec![KeyValuePair::new("space_key", "\"ENG\"")];
        let request = ExtractFromSourceRequest {
            source_type: "confluence",
            document_name: "confluence:eng",
            kwargs: &kwargs,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], json!("confluence"));
        assert_eq!(value["kwargs"][0]["key"], json!("space_key"));
    }
}
