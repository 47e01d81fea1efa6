//! Vector database seam
//!
//! The control plane addresses the vector store through this trait:
//! timestamped collection snapshots, a single production alias, hybrid
//! search, and filtered deletes. Implementations live in `ragkit-vector`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::ChunkDocument;
use crate::error::{Error, Result};
use crate::piece::{keys, KeyValuePair};

/// Timestamp suffix format of snapshot names, UTC
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Which retrieval legs participate in a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RetrievalMode {
    /// Dense vector similarity only
    Dense,
    /// Sparse keyword similarity only
    Sparse,
    /// Both legs fused by reciprocal rank
    Hybrid,
}

impl RetrievalMode {
    /// Parse the configuration value
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "DENSE" => Some(Self::Dense),
            "SPARSE" => Some(Self::Sparse),
            "HYBRID" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

/// Search tuning knobs
#[derive(Debug, Clone)]
pub struct SearchArgs {
    /// Maximum number of hits to return
    pub limit: usize,
    /// Minimum score a hit must reach
    pub score_threshold: Option<f32>,
}

impl Default for SearchArgs {
    fn default() -> Self {
        Self {
            limit: 10,
            score_threshold: None,
        }
    }
}

/// One exact-match condition over a payload key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Fully qualified payload key (e.g. `metadata.document`)
    pub key: String,
    /// Scalar the payload value must equal
    pub value: Value,
}

/// Conjunction of exact-match conditions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    /// All conditions must hold
    pub must: Vec<FieldCondition>,
}

impl Filter {
    /// Filter selecting every piece of one source
    pub fn document(source_name: &str) -> Self {
        Self {
            must: vec![FieldCondition {
                key: format!("metadata.{}", keys::DOCUMENT),
                value: Value::String(source_name.to_string()),
            }],
        }
    }

    /// Filter selecting pieces by their unique id
    pub fn piece_id(id: &str) -> Self {
        Self {
            must: vec![FieldCondition {
                key: format!("metadata.{}", keys::ID),
                value: Value::String(id.to_string()),
            }],
        }
    }

    /// Build a filter from wire metadata pairs.
    ///
    /// Values are JSON-decoded; keys are prefixed with `metadata.`.
    pub fn from_metadata_pairs(pairs: &[KeyValuePair]) -> Result<Self> {
        let mut must = Vec::with_capacity(pairs.len());
        for kv in pairs {
            let value: Value = serde_json::from_str(&kv.value).map_err(|e| {
                Error::validation(format!(
                    "filter value for '{}' is not valid JSON: {}",
                    kv.key, e
                ))
            })?;
            must.push(FieldCondition {
                key: format!("metadata.{}", kv.key),
                value,
            });
        }
        Ok(Self { must })
    }

    /// Whether the filter has no conditions
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Whether a document's metadata satisfies every condition
    pub fn matches(&self, document: &ChunkDocument) -> bool {
        self.must.iter().all(|cond| {
            let key = cond.key.strip_prefix("metadata.").unwrap_or(&cond.key);
            document.metadata.get(key) == Some(&cond.value)
        })
    }
}

/// A single alias binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasBinding {
    /// The externally visible alias
    pub alias_name: String,
    /// Snapshot the alias points at
    pub collection_name: String,
}

/// Interface to the vector database
#[async_trait]
pub trait VectorDatabase: Send + Sync {
    /// The configured production alias
    fn alias_name(&self) -> &str;

    /// Write documents into `collection_name`, or into the aliased snapshot
    /// when none is given. If no alias exists either, a fresh snapshot is
    /// created and atomically bound to the alias.
    async fn upload(
        &self,
        documents: Vec<ChunkDocument>,
        collection_name: Option<&str>,
    ) -> Result<()>;

    /// Hybrid search against the aliased snapshot
    async fn search(
        &self,
        query: &str,
        args: &SearchArgs,
        filter: Option<&Filter>,
    ) -> Result<Vec<ChunkDocument>>;

    /// All pieces whose `metadata.id` equals `document_id`
    async fn get_by_id(&self, document_id: &str) -> Result<Vec<ChunkDocument>>;

    /// Delete all points matching `filter` in the given or aliased snapshot
    async fn delete(&self, filter: &Filter, collection_name: Option<&str>) -> Result<()>;

    /// Names of all collections in the store
    async fn collections(&self) -> Result<Vec<String>>;

    /// All alias bindings in the store
    async fn aliases(&self) -> Result<Vec<AliasBinding>>;

    /// Create `target` with `source`'s vector configuration and copy all points
    async fn create_collection_from(&self, source: &str, target: &str) -> Result<()>;

    /// Drop a collection
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Atomically rebind the configured alias to `collection_name`
    async fn switch_alias(&self, collection_name: &str) -> Result<()>;

    /// Whether the aliased snapshot exists and holds at least one point
    async fn collection_available(&self) -> Result<bool>;

    /// Snapshots carrying the alias prefix, ascending by timestamp suffix
    async fn sorted_snapshots(&self) -> Result<Vec<String>> {
        Ok(sort_snapshots(self.collections().await?, self.alias_name()))
    }
}

/// Snapshot the configured alias currently points at, if any.
///
/// Fails when more than one collection bears the alias; that state is
/// corrupt and every caller wants to know.
pub async fn aliased_snapshot(db: &dyn VectorDatabase) -> Result<Option<String>> {
    let alias_name = db.alias_name().to_string();
    let mut bound: Vec<String> = db
        .aliases()
        .await?
        .into_iter()
        .filter(|a| a.alias_name == alias_name)
        .map(|a| a.collection_name)
        .collect();
    match bound.len() {
        0 => Ok(None),
        1 => Ok(bound.pop()),
        n => Err(Error::internal(format!(
            "{} collections bear the alias '{}'",
            n, alias_name
        ))),
    }
}

/// Compose a snapshot name from the alias and a timestamp
pub fn snapshot_name(alias: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}", alias, at.format(SNAPSHOT_TIMESTAMP_FORMAT))
}

/// Parse the timestamp suffix of a snapshot name
pub fn parse_snapshot_timestamp(name: &str, alias: &str) -> Option<NaiveDateTime> {
    let suffix = name.strip_prefix(alias)?.strip_prefix('_')?;
    if suffix.len() != 14 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(suffix, SNAPSHOT_TIMESTAMP_FORMAT).ok()
}

/// Sort the alias-prefixed collections ascending by timestamp suffix.
///
/// Names whose suffix does not parse fall back to lexicographic order.
pub fn sort_snapshots(names: Vec<String>, alias: &str) -> Vec<String> {
    let mut snapshots: Vec<String> = names
        .into_iter()
        .filter(|n| n.starts_with(alias))
        .collect();
    snapshots.sort_by(|a, b| {
        match (
            parse_snapshot_timestamp(a, alias),
            parse_snapshot_timestamp(b, alias),
        ) {
            (Some(ta), Some(tb)) => ta.cmp(&tb).then_with(|| a.cmp(b)),
            _ => a.cmp(b),
        }
    });
    snapshots
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_name_round_trip() {
        let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:30Z")
            .unwrap()
            .with_timezone(&Utc);
        let name = snapshot_name("docs", at);
        assert_eq!(name, "docs_20240101000030");
        assert_eq!(
            parse_snapshot_timestamp(&name, "docs"),
            Some(at.naive_utc())
        );
    }

    #[test]
    fn test_parse_rejects_bad_suffixes() {
        assert_eq!(parse_snapshot_timestamp("docs_2024", "docs"), None);
        assert_eq!(parse_snapshot_timestamp("docs_abcdefgh123456", "docs"), None);
        assert_eq!(parse_snapshot_timestamp("other_20240101000000", "docs"), None);
    }

    #[test]
    fn test_sort_snapshots_by_timestamp() {
        let names = vec![
            "docs_20240301000000".to_string(),
            "docs_20240101000000".to_string(),
            "unrelated_20240201000000".to_string(),
            "docs_20240201000000".to_string(),
        ];
        assert_eq!(
            sort_snapshots(names, "docs"),
            vec![
                "docs_20240101000000".to_string(),
                "docs_20240201000000".to_string(),
                "docs_20240301000000".to_string(),
            ]
        );
    }

    #[test]
    fn test_sort_snapshots_lexicographic_fallback() {
        let names = vec!["docs_b".to_string(), "docs_a".to_string()];
        assert_eq!(
            sort_snapshots(names, "docs"),
            vec!["docs_a".to_string(), "docs_b".to_string()]
        );
    }

    #[test]
    fn test_filter_from_metadata_pairs() {
        let filter = Filter::from_metadata_pairs(&[
            KeyValuePair::new("document", "\"file:foo\""),
            KeyValuePair::new("page", "3"),
        ])
        .unwrap();

        assert_eq!(filter.must.len(), 2);
        assert_eq!(filter.must[0].key, "metadata.document");
        assert_eq!(filter.must[0].value, json!("file:foo"));
        assert_eq!(filter.must[1].value, json!(3));
    }

    #[test]
    fn test_filter_rejects_non_json_values() {
        assert!(Filter::from_metadata_pairs(&[KeyValuePair::new("k", "file:foo")]).is_err());
    }

    #[test]
    fn test_filter_matches_document() {
        let mut doc = ChunkDocument::default();
        doc.set("document", "file:foo");
        doc.set("page", 3);

        let filter = Filter::document("file:foo");
        assert!(filter.matches(&doc));
        assert!(!Filter::document("file:bar").matches(&doc));
    }
}
