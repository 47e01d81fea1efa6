//! Mapping between wire pieces and pipeline documents
//!
//! Two directions with different strictness: extractor output is mapped
//! leniently (the pipeline fills in derived metadata afterwards), while
//! pieces crossing into or out of the vector database are fully validated.

use serde_json::{Map, Value};

use crate::document::ChunkDocument;
use crate::error::{Error, Result};
use crate::piece::{keys, ContentType, InformationPiece, KeyValuePair};

/// File-backed sources carry this prefix in their source name
const FILE_SOURCE_PREFIX: &str = "file:";

/// Stateless mapper between [`InformationPiece`] and [`ChunkDocument`]
pub struct PieceMapper;

impl PieceMapper {
    /// Map raw extractor output into a pipeline document.
    ///
    /// Requires the extractor contract keys (`id`, `related`, `page`);
    /// derived keys (`document`, `chunk`, `document_url`) are added later
    /// by the pipeline.
    pub fn from_extractor(piece: &InformationPiece) -> Result<ChunkDocument> {
        let mut metadata = decode_metadata(&piece.metadata)?;
        metadata.insert(
            keys::TYPE.to_string(),
            Value::String(piece.content_type.as_str().to_string()),
        );

        for key in [keys::ID, keys::RELATED, keys::PAGE] {
            if !metadata.contains_key(key) {
                return Err(Error::validation(format!(
                    "extracted piece is missing metadata key '{}'",
                    key
                )));
            }
        }
        if piece.content_type == ContentType::Image && !metadata.contains_key(keys::BASE64_IMAGE) {
            return Err(Error::validation(format!(
                "extracted image piece is missing metadata key '{}'",
                keys::BASE64_IMAGE
            )));
        }

        Ok(ChunkDocument::new(piece.page_content.clone(), metadata))
    }

    /// Map a wire piece into a document bound for the vector database
    pub fn to_document(piece: &InformationPiece) -> Result<ChunkDocument> {
        let mut metadata = decode_metadata(&piece.metadata)?;
        metadata.insert(
            keys::TYPE.to_string(),
            Value::String(piece.content_type.as_str().to_string()),
        );
        validate_indexed_metadata(piece.content_type, &metadata)?;
        Ok(ChunkDocument::new(piece.page_content.clone(), metadata))
    }

    /// Map a pipeline document into its wire form
    pub fn to_piece(document: &ChunkDocument) -> Result<InformationPiece> {
        let content_type = document.content_type().ok_or_else(|| {
            Error::validation(format!(
                "document is missing metadata key '{}'",
                keys::TYPE
            ))
        })?;
        validate_indexed_metadata(content_type, &document.metadata)?;

        let metadata = document
            .metadata
            .iter()
            .map(|(key, value)| {
                Ok(KeyValuePair {
                    key: key.clone(),
                    value: serde_json::to_string(value)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(InformationPiece {
            content_type,
            page_content: document.page_content.clone(),
            metadata,
        })
    }
}

/// JSON-decode the flat metadata list into a map
fn decode_metadata(metadata: &[KeyValuePair]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for kv in metadata {
        let value: Value = serde_json::from_str(&kv.value).map_err(|e| {
            Error::validation(format!(
                "metadata value for '{}' is not valid JSON: {}",
                kv.key, e
            ))
        })?;
        map.insert(kv.key.clone(), value);
    }
    Ok(map)
}

/// Enforce the conditional keys on anything that reaches the index
fn validate_indexed_metadata(
    content_type: ContentType,
    metadata: &Map<String, Value>,
) -> Result<()> {
    if !metadata.contains_key(keys::DOCUMENT) {
        return Err(Error::validation(format!(
            "piece is missing metadata key '{}'",
            keys::DOCUMENT
        )));
    }

    let from_file = metadata
        .get(keys::DOCUMENT)
        .and_then(Value::as_str)
        .is_some_and(|d| d.starts_with(FILE_SOURCE_PREFIX));

    match content_type {
        ContentType::Text | ContentType::Table => {
            if from_file && !metadata.contains_key(keys::DOCUMENT_URL) {
                return Err(Error::validation(format!(
                    "{} piece from a file source is missing metadata key '{}'",
                    content_type,
                    keys::DOCUMENT_URL
                )));
            }
        }
        ContentType::Image => {
            if !metadata.contains_key(keys::BASE64_IMAGE) {
                return Err(Error::validation(format!(
                    "image piece is missing metadata key '{}'",
                    keys::BASE64_IMAGE
                )));
            }
        }
        ContentType::Summary => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_piece() -> InformationPiece {
        InformationPiece {
            content_type: ContentType::Text,
            page_content: "Object storage keeps data as flat objects.".to_string(),
            metadata: vec![
                KeyValuePair::new("document", "\"file:storage.pdf\""),
                KeyValuePair::new("document_url", "\"http://h/document_reference/storage.pdf\""),
                KeyValuePair::new("id", "\"a\""),
                KeyValuePair::new("related", "[]"),
                KeyValuePair::new("type", "\"TEXT\""),
            ],
        }
    }

    fn image_piece() -> InformationPiece {
        InformationPiece {
            content_type: ContentType::Image,
            page_content: String::new(),
            metadata: vec![
                KeyValuePair::new("document", "\"confluence:space\""),
                KeyValuePair::new("base64_image", "\"SGVsbG8gV29ybGQh\""),
                KeyValuePair::new("id", "\"img\""),
                KeyValuePair::new("related", "[]"),
                KeyValuePair::new("type", "\"IMAGE\""),
            ],
        }
    }

    #[test]
    fn test_round_trip_text() {
        let piece = text_piece();
        let doc = PieceMapper::to_document(&piece).unwrap();
        let back = PieceMapper::to_piece(&doc).unwrap();

        assert_eq!(back.content_type, piece.content_type);
        assert_eq!(back.page_content, piece.page_content);
        for key in ["document", "document_url", "id", "related", "type"] {
            assert_eq!(back.metadata_value(key), piece.metadata_value(key));
        }

        // a second hop stays stable
        let doc2 = PieceMapper::to_document(&back).unwrap();
        assert_eq!(doc2, doc);
    }

    #[test]
    fn test_round_trip_image() {
        let piece = image_piece();
        let doc = PieceMapper::to_document(&piece).unwrap();
        let back = PieceMapper::to_piece(&doc).unwrap();

        assert_eq!(back.content_type, ContentType::Image);
        assert_eq!(back.page_content, "");
        assert_eq!(
            back.metadata_value("base64_image"),
            piece.metadata_value("base64_image")
        );
    }

    #[test]
    fn test_missing_document_url_fails_for_file_text() {
        let mut piece = text_piece();
        piece.metadata.retain(|kv| kv.key != "document_url");

        let err = PieceMapper::to_document(&piece).unwrap_err();
        assert!(err.to_string().contains("document_url"));
    }

    #[test]
    fn test_document_url_not_required_off_file_sources() {
        let mut piece = text_piece();
        piece.metadata.retain(|kv| kv.key != "document_url");
        for kv in &mut piece.metadata {
            if kv.key == "document" {
                kv.value = "\"confluence:space\"".to_string();
            }
        }
        assert!(PieceMapper::to_document(&piece).is_ok());
    }

    #[test]
    fn test_missing_image_content_fails() {
        let mut piece = image_piece();
        piece.metadata.retain(|kv| kv.key != "base64_image");

        let err = PieceMapper::to_document(&piece).unwrap_err();
        assert!(err.to_string().contains("base64_image"));
    }

    #[test]
    fn test_from_extractor_requires_contract_keys() {
        let piece = InformationPiece {
            content_type: ContentType::Text,
            page_content: "hello".to_string(),
            metadata: vec![
                KeyValuePair::new("id", "\"a\""),
                KeyValuePair::new("related", "[]"),
            ],
        };
        let err = PieceMapper::from_extractor(&piece).unwrap_err();
        assert!(err.to_string().contains("page"));
    }

    #[test]
    fn test_from_extractor_mirrors_outer_type() {
        let piece = InformationPiece {
            content_type: ContentType::Table,
            page_content: "a|b".to_string(),
            metadata: vec![
                KeyValuePair::new("id", "\"t\""),
                KeyValuePair::new("related", "[]"),
                KeyValuePair::new("page", "0"),
            ],
        };
        let doc = PieceMapper::from_extractor(&piece).unwrap();
        assert_eq!(doc.metadata.get("type"), Some(&json!("TABLE")));
    }

    #[test]
    fn test_invalid_json_metadata_rejected() {
        let piece = InformationPiece {
            content_type: ContentType::Text,
            page_content: "x".to_string(),
            metadata: vec![KeyValuePair::new("document", "not json")],
        };
        assert!(PieceMapper::to_document(&piece).is_err());
    }
}
