//! Qdrant REST client
//!
//! Implements the vector database seam against the Qdrant HTTP API:
//! named dense + sparse vectors per point, alias operations, scroll,
//! filtered deletes, and hybrid queries fused server-side with RRF.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use ragkit_core::document::ChunkDocument;
use ragkit_core::embed::{Embeddings, SparseEmbeddings, SparseVector};
use ragkit_core::error::{Error, Result};
use ragkit_core::settings::VectorDbSettings;
use ragkit_core::vector::{
    snapshot_name, AliasBinding, Filter, RetrievalMode, SearchArgs, VectorDatabase,
};

/// Named dense vector on every point
const DENSE_VECTOR_NAME: &str = "dense";
/// Named sparse vector on every point
const SPARSE_VECTOR_NAME: &str = "sparse";
/// Page size for scroll requests
const SCROLL_PAGE_SIZE: usize = 256;

/// Qdrant REST API client
pub struct QdrantHttp {
    client: reqwest::Client,
    base_url: String,
    alias_name: String,
    retrieval_mode: RetrievalMode,
    validate_collection_config: bool,
    dense: Arc<dyn Embeddings>,
    sparse: Arc<dyn SparseEmbeddings>,
}

impl QdrantHttp {
    /// Create a client from settings; `api_key` is sent as `api-key` when given
    pub fn new(
        settings: &VectorDbSettings,
        api_key: Option<&str>,
        dense: Arc<dyn Embeddings>,
        sparse: Arc<dyn SparseEmbeddings>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                "api-key",
                HeaderValue::from_str(key).map_err(|e| Error::internal(e.to_string()))?,
            );
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.location.trim_end_matches('/').to_string(),
            alias_name: settings.collection_name.clone(),
            retrieval_mode: settings.retrieval_mode,
            validate_collection_config: settings.validate_collection_config,
            dense,
            sparse,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_response(response: reqwest::Response, what: &str) -> Result<Value> {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(body.get("result").cloned().unwrap_or(Value::Null));
        }
        let detail = body
            .get("status")
            .and_then(|s| s.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("no error detail");
        if status == StatusCode::NOT_FOUND {
            Err(Error::not_found(format!("{}: {}", what, detail)))
        } else {
            Err(Error::vector_db(format!(
                "{} failed with {}: {}",
                what, status, detail
            )))
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.url(&format!("/collections/{}", name)))
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => {
                Self::read_response(response, "get collection").await?;
                Ok(false)
            }
        }
    }

    async fn collection_info(&self, name: &str) -> Result<Value> {
        let response = self
            .client
            .get(self.url(&format!("/collections/{}", name)))
            .send()
            .await?;
        Self::read_response(response, "get collection").await
    }

    async fn create_collection(&self, name: &str) -> Result<()> {
        let body = json!({
            "vectors": {
                DENSE_VECTOR_NAME: {
                    "size": self.dense.dimension(),
                    "distance": "Cosine",
                }
            },
            "sparse_vectors": {
                SPARSE_VECTOR_NAME: {}
            }
        });
        let response = self
            .client
            .put(self.url(&format!("/collections/{}", name)))
            .json(&body)
            .send()
            .await?;
        Self::read_response(response, "create collection").await?;
        info!(collection = %name, "created collection");
        Ok(())
    }

    /// Check that an existing collection matches the embedder dimension
    async fn validate_config(&self, name: &str) -> Result<()> {
        let info = self.collection_info(name).await?;
        let size = info
            .pointer(&format!(
                "/config/params/vectors/{}/size",
                DENSE_VECTOR_NAME
            ))
            .and_then(Value::as_u64);
        match size {
            Some(size) if size as usize == self.dense.dimension() => Ok(()),
            Some(size) => Err(Error::validation(format!(
                "collection '{}' has dense vectors of size {}, embedder produces {}",
                name,
                size,
                self.dense.dimension()
            ))),
            None => Err(Error::vector_db(format!(
                "collection '{}' has no named dense vector '{}'",
                name, DENSE_VECTOR_NAME
            ))),
        }
    }

    async fn update_aliases(&self, actions: Vec<AliasAction>) -> Result<()> {
        let response = self
            .client
            .post(self.url("/collections/aliases"))
            .json(&json!({ "actions": actions }))
            .send()
            .await?;
        Self::read_response(response, "update aliases").await?;
        Ok(())
    }

    async fn embed_documents(
        &self,
        documents: &[ChunkDocument],
    ) -> Result<Vec<PointStruct>> {
        let texts: Vec<String> = documents.iter().map(|d| d.page_content.clone()).collect();
        let dense = self.dense.embed(&texts).await?;
        let sparse = self.sparse.embed_sparse(&texts).await?;
        if dense.len() != documents.len() || sparse.len() != documents.len() {
            return Err(Error::internal(
                "embedder returned a mismatched number of vectors",
            ));
        }

        Ok(documents
            .iter()
            .zip(dense)
            .zip(sparse)
            .map(|((document, dense), sparse)| PointStruct::new(document, dense, sparse))
            .collect())
    }

    fn query_body(
        &self,
        dense: Option<Vec<f32>>,
        sparse: Option<SparseVector>,
        args: &SearchArgs,
        filter: Option<&Filter>,
    ) -> Value {
        let filter_value = filter.map(wire_filter);
        let prefetch_limit = (args.limit * 4).max(50);

        let mut body = match (dense, sparse) {
            (Some(dense), Some(sparse)) => json!({
                "prefetch": [
                    {
                        "query": dense,
                        "using": DENSE_VECTOR_NAME,
                        "limit": prefetch_limit,
                        "filter": filter_value.clone(),
                    },
                    {
                        "query": { "indices": sparse.indices, "values": sparse.values },
                        "using": SPARSE_VECTOR_NAME,
                        "limit": prefetch_limit,
                        "filter": filter_value.clone(),
                    },
                ],
                "query": { "fusion": "rrf" },
            }),
            (Some(dense), None) => json!({
                "query": dense,
                "using": DENSE_VECTOR_NAME,
                "filter": filter_value.clone(),
            }),
            (None, Some(sparse)) => json!({
                "query": { "indices": sparse.indices, "values": sparse.values },
                "using": SPARSE_VECTOR_NAME,
                "filter": filter_value.clone(),
            }),
            (None, None) => json!({}),
        };

        let object = body.as_object_mut().unwrap_or_else(|| unreachable!());
        object.insert("limit".to_string(), json!(args.limit));
        object.insert("with_payload".to_string(), json!(true));
        if let Some(threshold) = args.score_threshold {
            object.insert("score_threshold".to_string(), json!(threshold));
        }
        // the fused query also honours the filter
        if let Some(filter) = filter_value {
            object.insert("filter".to_string(), filter);
        }
        body
    }

    async fn resolve_alias(&self) -> Result<Option<String>> {
        ragkit_core::vector::aliased_snapshot(self).await
    }
}

#[async_trait]
impl VectorDatabase for QdrantHttp {
    fn alias_name(&self) -> &str {
        &self.alias_name
    }

    async fn upload(
        &self,
        documents: Vec<ChunkDocument>,
        collection_name: Option<&str>,
    ) -> Result<()> {
        let points = self.embed_documents(&documents).await?;

        let aliased = self.resolve_alias().await?;
        let (target, bind_alias) = match collection_name {
            Some(name) => (name.to_string(), false),
            None => match aliased {
                Some(aliased) => (aliased, false),
                None => (snapshot_name(&self.alias_name, Utc::now()), true),
            },
        };

        if !self.collection_exists(&target).await? {
            self.create_collection(&target).await?;
        } else if self.validate_collection_config {
            self.validate_config(&target).await?;
        }

        debug!(collection = %target, points = points.len(), "upserting points");
        let response = self
            .client
            .put(self.url(&format!("/collections/{}/points?wait=true", target)))
            .json(&json!({ "points": points }))
            .send()
            .await?;
        Self::read_response(response, "upsert points").await?;

        if bind_alias {
            self.update_aliases(vec![AliasAction::CreateAlias {
                collection_name: target.clone(),
                alias_name: self.alias_name.clone(),
            }])
            .await?;
            info!(collection = %target, alias = %self.alias_name, "bound production alias");
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        args: &SearchArgs,
        filter: Option<&Filter>,
    ) -> Result<Vec<ChunkDocument>> {
        let query_text = [query.to_string()];
        let dense = match self.retrieval_mode {
            RetrievalMode::Sparse => None,
            _ => Some(
                self.dense
                    .embed(&query_text)
                    .await?
                    .pop()
                    .ok_or_else(|| Error::internal("embedder returned no query vector"))?,
            ),
        };
        let sparse = match self.retrieval_mode {
            RetrievalMode::Dense => None,
            _ => Some(
                self.sparse
                    .embed_sparse(&query_text)
                    .await?
                    .pop()
                    .ok_or_else(|| Error::internal("embedder returned no query vector"))?,
            ),
        };

        let body = self.query_body(dense, sparse, args, filter);
        let response = self
            .client
            .post(self.url(&format!(
                "/collections/{}/points/query",
                self.alias_name
            )))
            .json(&body)
            .send()
            .await?;
        let result = Self::read_response(response, "query points").await?;

        let points = result
            .get("points")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(points
            .iter()
            .filter_map(|p| p.get("payload"))
            .filter_map(payload_to_document)
            .collect())
    }

    async fn get_by_id(&self, document_id: &str) -> Result<Vec<ChunkDocument>> {
        let filter = Filter::piece_id(document_id);
        let mut documents = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let mut body = json!({
                "filter": wire_filter(&filter),
                "limit": SCROLL_PAGE_SIZE,
                "with_payload": true,
            });
            if let Some(offset) = &offset {
                body.as_object_mut()
                    .unwrap_or_else(|| unreachable!())
                    .insert("offset".to_string(), offset.clone());
            }

            let response = self
                .client
                .post(self.url(&format!(
                    "/collections/{}/points/scroll",
                    self.alias_name
                )))
                .json(&body)
                .send()
                .await?;
            let result = Self::read_response(response, "scroll points").await?;

            let points = result
                .get("points")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            documents.extend(
                points
                    .iter()
                    .filter_map(|p| p.get("payload"))
                    .filter_map(payload_to_document),
            );

            offset = result
                .get("next_page_offset")
                .filter(|v| !v.is_null())
                .cloned();
            if offset.is_none() {
                break;
            }
        }
        Ok(documents)
    }

    async fn delete(&self, filter: &Filter, collection_name: Option<&str>) -> Result<()> {
        let target = match collection_name {
            Some(name) => name.to_string(),
            None => self.resolve_alias().await?.ok_or_else(|| {
                Error::not_found(format!(
                    "no collection bears the alias '{}'",
                    self.alias_name
                ))
            })?,
        };

        let response = self
            .client
            .post(self.url(&format!(
                "/collections/{}/points/delete?wait=true",
                target
            )))
            .json(&json!({ "filter": wire_filter(filter) }))
            .send()
            .await?;
        Self::read_response(response, "delete points").await?;
        Ok(())
    }

    async fn collections(&self) -> Result<Vec<String>> {
        let response = self.client.get(self.url("/collections")).send().await?;
        let result = Self::read_response(response, "list collections").await?;
        Ok(result
            .get("collections")
            .and_then(Value::as_array)
            .map(|collections| {
                collections
                    .iter()
                    .filter_map(|c| c.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn aliases(&self) -> Result<Vec<AliasBinding>> {
        let response = self.client.get(self.url("/aliases")).send().await?;
        let result = Self::read_response(response, "list aliases").await?;
        let aliases: Vec<AliasBinding> = result
            .get("aliases")
            .map(|a| serde_json::from_value(a.clone()))
            .transpose()?
            .unwrap_or_default();
        Ok(aliases)
    }

    async fn create_collection_from(&self, source: &str, target: &str) -> Result<()> {
        let info = self.collection_info(source).await?;
        let vectors = info
            .pointer("/config/params/vectors")
            .cloned()
            .unwrap_or(Value::Null);
        let sparse_vectors = info
            .pointer("/config/params/sparse_vectors")
            .cloned()
            .unwrap_or(Value::Null);

        let body = json!({
            "vectors": vectors,
            "sparse_vectors": sparse_vectors,
            "init_from": { "collection": source },
        });
        let response = self
            .client
            .put(self.url(&format!("/collections/{}", target)))
            .json(&body)
            .send()
            .await?;
        Self::read_response(response, "create collection from").await?;
        info!(source = %source, target = %target, "copied collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/collections/{}", name)))
            .send()
            .await?;
        Self::read_response(response, "delete collection").await?;
        Ok(())
    }

    async fn switch_alias(&self, collection_name: &str) -> Result<()> {
        self.update_aliases(vec![
            AliasAction::DeleteAlias {
                alias_name: self.alias_name.clone(),
            },
            AliasAction::CreateAlias {
                collection_name: collection_name.to_string(),
                alias_name: self.alias_name.clone(),
            },
        ])
        .await
    }

    async fn collection_available(&self) -> Result<bool> {
        let Some(aliased) = self.resolve_alias().await? else {
            return Ok(false);
        };
        if !self.collection_exists(&aliased).await? {
            return Ok(false);
        }
        let info = self.collection_info(&aliased).await?;
        Ok(info
            .get("points_count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
            > 0)
    }
}

/// One alias change; serializes to Qdrant's externally tagged action format
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
enum AliasAction {
    CreateAlias {
        collection_name: String,
        alias_name: String,
    },
    DeleteAlias {
        alias_name: String,
    },
}

/// One point in the Qdrant wire format
#[derive(Debug, Serialize, Deserialize)]
struct PointStruct {
    id: String,
    vector: Map<String, Value>,
    payload: Payload,
}

#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    page_content: String,
    metadata: Map<String, Value>,
}

impl PointStruct {
    fn new(document: &ChunkDocument, dense: Vec<f32>, sparse: SparseVector) -> Self {
        let mut vector = Map::new();
        vector.insert(DENSE_VECTOR_NAME.to_string(), json!(dense));
        vector.insert(
            SPARSE_VECTOR_NAME.to_string(),
            json!({ "indices": sparse.indices, "values": sparse.values }),
        );
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            payload: Payload {
                page_content: document.page_content.clone(),
                metadata: document.metadata.clone(),
            },
        }
    }
}

/// Core filter -> Qdrant filter JSON
fn wire_filter(filter: &Filter) -> Value {
    json!({
        "must": filter
            .must
            .iter()
            .map(|cond| json!({ "key": cond.key, "match": { "value": cond.value } }))
            .collect::<Vec<Value>>()
    })
}

fn payload_to_document(payload: &Value) -> Option<ChunkDocument> {
    let page_content = payload.get("page_content")?.as_str()?.to_string();
    let metadata = payload.get("metadata")?.as_object()?.clone();
    Some(ChunkDocument::new(page_content, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_action_wire_format() {
        let create = AliasAction::CreateAlias {
            collection_name: "docs_20240101000000".to_string(),
            alias_name: "docs".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&create).unwrap(),
            json!({
                "create_alias": {
                    "collection_name": "docs_20240101000000",
                    "alias_name": "docs",
                }
            })
        );

        let delete = AliasAction::DeleteAlias {
            alias_name: "docs".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&delete).unwrap(),
            json!({ "delete_alias": { "alias_name": "docs" } })
        );
    }

    #[test]
    fn test_wire_filter_prefixes_and_matches() {
        let filter = Filter::document("file:report.pdf");
        assert_eq!(
            wire_filter(&filter),
            json!({
                "must": [
                    { "key": "metadata.document", "match": { "value": "file:report.pdf" } }
                ]
            })
        );
    }

    #[test]
    fn test_point_struct_carries_named_vectors() {
        let mut document = ChunkDocument::new("hello", Map::new());
        document.set("id", "a");

        let point = PointStruct::new(
            &document,
            vec![0.1, 0.2],
            SparseVector {
                indices: vec![7],
                values: vec![1.5],
            },
        );
        let value = serde_json::to_value(&point).unwrap();
        assert_eq!(value["vector"]["dense"], json!([0.1, 0.2]));
        assert_eq!(value["vector"]["sparse"]["indices"], json!([7]));
        assert_eq!(value["payload"]["page_content"], json!("hello"));
        assert_eq!(value["payload"]["metadata"]["id"], json!("a"));
    }

    #[test]
    fn test_payload_round_trip() {
        let payload = json!({
            "page_content": "hello",
            "metadata": { "id": "a", "document": "file:x" },
        });
        let document = payload_to_document(&payload).unwrap();
        assert_eq!(document.page_content, "hello");
        assert_eq!(document.id(), Some("a"));
    }

    #[test]
    fn test_hybrid_query_body_shape() {
        let db = test_client(RetrievalMode::Hybrid);
        let body = db.query_body(
            Some(vec![0.5; 2]),
            Some(SparseVector {
                indices: vec![1],
                values: vec![1.0],
            }),
            &SearchArgs {
                limit: 4,
                score_threshold: Some(0.2),
            },
            None,
        );

        assert_eq!(body["query"], json!({ "fusion": "rrf" }));
        assert_eq!(body["prefetch"].as_array().unwrap().len(), 2);
        assert_eq!(body["prefetch"][0]["using"], json!("dense"));
        assert_eq!(body["prefetch"][1]["using"], json!("sparse"));
        assert_eq!(body["limit"], json!(4));
        assert_eq!(body["score_threshold"], json!(0.2));
    }

    #[test]
    fn test_dense_query_body_shape() {
        let db = test_client(RetrievalMode::Dense);
        let body = db.query_body(
            Some(vec![0.5; 2]),
            None,
            &SearchArgs::default(),
            Some(&Filter::document("file:x")),
        );

        assert_eq!(body["using"], json!("dense"));
        assert!(body.get("prefetch").is_none());
        assert_eq!(
            body["filter"]["must"][0]["key"],
            json!("metadata.document")
        );
    }

    struct NullEmbeddings;

    #[async_trait]
    impl Embeddings for NullEmbeddings {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0, 0.0]).collect())
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    #[async_trait]
    impl SparseEmbeddings for NullEmbeddings {
        async fn embed_sparse(&self, texts: &[String]) -> Result<Vec<SparseVector>> {
            Ok(texts.iter().map(|_| SparseVector::default()).collect())
        }
    }

    fn test_client(retrieval_mode: RetrievalMode) -> QdrantHttp {
        let settings = VectorDbSettings {
            collection_name: "docs".to_string(),
            location: "http://localhost:6333".to_string(),
            collection_history_count: 1,
            validate_collection_config: false,
            retrieval_mode,
        };
        QdrantHttp::new(
            &settings,
            None,
            Arc::new(NullEmbeddings),
            Arc::new(NullEmbeddings),
        )
        .unwrap_or_else(|_| unreachable!("client builds without IO"))
    }
}
