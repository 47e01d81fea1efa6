//! OpenAI-compatible embeddings client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ragkit_core::embed::Embeddings;
use ragkit_core::error::{Error, Result};

use crate::HttpConfig;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

/// Client for an OpenAI-compatible `/embeddings` endpoint
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddings {
    /// Create a client for `model` producing vectors of `dimension`
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL, api_key, model, dimension)
    }

    /// Create a client against a custom endpoint (e.g. a local server)
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: HttpConfig::inference().build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            dimension,
        })
    }

    /// Create from the `OPENAI_API_KEY` environment variable
    pub fn from_env(model: impl Into<String>, dimension: usize) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::internal("OPENAI_API_KEY not set"))?;
        Self::new(api_key, model, dimension)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl Embeddings for OpenAiEmbeddings {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::internal(format!(
                "embeddings endpoint returned {}: {}",
                status, detail
            )));
        }

        let mut body: EmbeddingsResponse = response.json().await?;
        body.data.sort_by_key(|d| d.index);
        if body.data.len() != texts.len() {
            return Err(Error::internal(format!(
                "embeddings endpoint returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
