//! Rolling-update tests: duplicate, ingest into latest, switch, evict

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::memory_db;
use ragkit_core::collections::CollectionManager;
use ragkit_core::document::ChunkDocument;
use ragkit_core::error::Error;
use ragkit_core::piece::{ContentType, InformationPiece, KeyValuePair};
use ragkit_core::pieces::{PiecesRemover, PiecesUploader};
use ragkit_core::status::StatusStore;
use ragkit_core::vector::{SearchArgs, VectorDatabase};
use ragkit_vector::MemoryVectorDb;

const SEED_SNAPSHOT: &str = "docs_20240101000000";

fn document(id: &str, content: &str) -> ChunkDocument {
    let mut doc = ChunkDocument::new(content, serde_json::Map::new());
    doc.set("id", id);
    doc.set("document", "web:seed");
    doc.set("type", "TEXT");
    doc.set("page", 0);
    doc.set_related(vec![]);
    doc
}

fn wire_piece(id: &str, content: &str) -> InformationPiece {
    InformationPiece {
        content_type: ContentType::Text,
        page_content: content.to_string(),
        metadata: vec![
            KeyValuePair::new("id", format!("\"{}\"", id)),
            KeyValuePair::new("document", "\"web:extra\""),
            KeyValuePair::new("related", "[]"),
            KeyValuePair::new("type", "\"TEXT\""),
        ],
    }
}

/// Aliased seed snapshot with one point
async fn seeded_db() -> Arc<MemoryVectorDb> {
    let db = Arc::new(memory_db());
    db.upload(vec![document("seed", "original seed content")], Some(SEED_SNAPSHOT))
        .await
        .unwrap();
    db.switch_alias(SEED_SNAPSHOT).await.unwrap();
    db
}

fn manager(db: &Arc<MemoryVectorDb>, history_count: u32) -> CollectionManager {
    CollectionManager::new(db.clone() as Arc<dyn VectorDatabase>, history_count)
}

#[tokio::test]
async fn test_duplicate_creates_copy_without_moving_alias() {
    let db = seeded_db().await;
    let target = manager(&db, 1).duplicate().await.unwrap();

    assert_ne!(target, SEED_SNAPSHOT);
    let collections = db.collections().await.unwrap();
    assert!(collections.contains(&target));
    assert!(collections.contains(&SEED_SNAPSHOT.to_string()));

    // alias still points at the seed snapshot
    let aliases = db.aliases().await.unwrap();
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].collection_name, SEED_SNAPSHOT);
}

#[tokio::test]
async fn test_duplicate_without_alias_is_not_found() {
    let db = Arc::new(memory_db());
    let err = manager(&db, 1).duplicate().await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_full_rolling_update() {
    let db = seeded_db().await;
    let db_dyn: Arc<dyn VectorDatabase> = db.clone();
    let status = Arc::new(StatusStore::new(Duration::from_secs(600)));
    let manager = manager(&db, 1);
    let pieces = PiecesUploader::new(db_dyn.clone(), status);

    // 1. duplicate: a new latest snapshot with the old data
    let target = manager.duplicate().await.unwrap();
    let snapshots = db.sorted_snapshots().await.unwrap();
    assert_eq!(snapshots.last(), Some(&target));

    // 2. ingest into latest; readers still see the old state
    pieces
        .upload(vec![wire_piece("extra", "freshly rolled out content")], true)
        .await
        .unwrap();
    let args = SearchArgs { limit: 50, score_threshold: None };
    let before = db.search("freshly rolled out", &args, None).await.unwrap();
    assert!(before.iter().all(|d| d.id() != Some("extra")));

    // 3. switch: production flips in one step
    manager.switch().await.unwrap();
    let after = db.search("freshly rolled out", &args, None).await.unwrap();
    assert!(after.iter().any(|d| d.id() == Some("extra")));

    // 4. history is bounded and the aliased snapshot survived eviction
    let snapshots = db.sorted_snapshots().await.unwrap();
    assert_eq!(snapshots, vec![target.clone()]);
    let aliases = db.aliases().await.unwrap();
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].collection_name, target);
}

#[tokio::test]
async fn test_switch_is_a_noop_when_latest_already_aliased() {
    let db = seeded_db().await;
    manager(&db, 1).switch().await.unwrap();

    let aliases = db.aliases().await.unwrap();
    assert_eq!(aliases.len(), 1);
    assert_eq!(aliases[0].collection_name, SEED_SNAPSHOT);
    assert_eq!(db.collections().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_eviction_never_removes_the_aliased_snapshot() {
    let db = seeded_db().await;
    // a newer snapshot exists but the alias stays on the oldest
    db.create_collection_from(SEED_SNAPSHOT, "docs_20990101000000")
        .await
        .unwrap();

    manager(&db, 1).evict_oldest().await.unwrap();

    let collections = db.collections().await.unwrap();
    assert!(collections.contains(&SEED_SNAPSHOT.to_string()));
    let aliases = db.aliases().await.unwrap();
    assert_eq!(aliases[0].collection_name, SEED_SNAPSHOT);
}

#[tokio::test]
async fn test_history_count_bounds_snapshots() {
    let db = seeded_db().await;
    db.create_collection_from(SEED_SNAPSHOT, "docs_20250101000000")
        .await
        .unwrap();
    db.create_collection_from(SEED_SNAPSHOT, "docs_20260101000000")
        .await
        .unwrap();

    let manager = manager(&db, 2);
    manager.switch().await.unwrap();

    let snapshots = db.sorted_snapshots().await.unwrap();
    assert_eq!(
        snapshots,
        vec![
            "docs_20250101000000".to_string(),
            "docs_20260101000000".to_string(),
        ]
    );
    let aliases = db.aliases().await.unwrap();
    assert_eq!(aliases[0].collection_name, "docs_20260101000000");
}

#[tokio::test]
async fn test_sorted_snapshots_ascending() {
    let db = seeded_db().await;
    db.create_collection_from(SEED_SNAPSHOT, "docs_20260101000000")
        .await
        .unwrap();
    db.create_collection_from(SEED_SNAPSHOT, "docs_20250101000000")
        .await
        .unwrap();

    assert_eq!(
        db.sorted_snapshots().await.unwrap(),
        vec![
            SEED_SNAPSHOT.to_string(),
            "docs_20250101000000".to_string(),
            "docs_20260101000000".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_remove_by_metadata_in_latest_snapshot() {
    let db = seeded_db().await;
    db.create_collection_from(SEED_SNAPSHOT, "docs_20990101000000")
        .await
        .unwrap();

    let remover = PiecesRemover::new(db.clone() as Arc<dyn VectorDatabase>);
    remover
        .remove(
            vec![KeyValuePair::new("document", "\"web:seed\"")],
            true,
        )
        .await
        .unwrap();

    // the aliased snapshot still serves the piece; the latest no longer has it
    assert_eq!(db.get_by_id("seed").await.unwrap().len(), 1);
    db.switch_alias("docs_20990101000000").await.unwrap();
    assert!(db.get_by_id("seed").await.unwrap().is_empty());
}
