//! Collection lifecycle management
//!
//! Rolling updates over the vector store: duplicate the aliased snapshot,
//! ingest into the copy, switch the alias, evict history. Callers are
//! expected to serialize rollouts; these operations hold no state of their
//! own.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::vector::{aliased_snapshot, snapshot_name, VectorDatabase};

/// Duplicate/switch/evict operations over the vector database
pub struct CollectionManager {
    db: Arc<dyn VectorDatabase>,
    history_count: u32,
}

impl CollectionManager {
    /// Create a manager retaining `history_count` snapshots after a switch
    pub fn new(db: Arc<dyn VectorDatabase>, history_count: u32) -> Self {
        Self {
            db,
            history_count: history_count.max(1),
        }
    }

    /// Copy the aliased snapshot into a new timestamped snapshot.
    ///
    /// The alias is not moved; the copy becomes the latest snapshot so
    /// subsequent ingestion can address it. Returns the new snapshot name.
    pub async fn duplicate(&self) -> Result<String> {
        let source = aliased_snapshot(self.db.as_ref()).await?.ok_or_else(|| {
            Error::not_found(format!(
                "no collection bears the alias '{}'",
                self.db.alias_name()
            ))
        })?;

        let target = snapshot_name(self.db.alias_name(), Utc::now());
        info!(source = %source, target = %target, "duplicating aliased collection");
        self.db.create_collection_from(&source, &target).await?;
        Ok(target)
    }

    /// Atomically move the alias to the latest snapshot, then bound history.
    ///
    /// A no-op (with a warning) when the latest snapshot already bears the
    /// alias.
    pub async fn switch(&self) -> Result<()> {
        let snapshots = self.db.sorted_snapshots().await?;
        let latest = snapshots.last().ok_or_else(|| {
            Error::not_found(format!(
                "no snapshots found for alias '{}'",
                self.db.alias_name()
            ))
        })?;

        let current = aliased_snapshot(self.db.as_ref()).await?;
        if current.as_deref() == Some(latest.as_str()) {
            warn!(collection = %latest, "alias already points at the latest snapshot");
            return Ok(());
        }

        info!(from = ?current, to = %latest, "switching production alias");
        self.db.switch_alias(latest).await?;
        self.evict_oldest().await
    }

    /// Delete oldest snapshots until at most `history_count` remain.
    ///
    /// The aliased snapshot is never deleted; if it is the oldest, eviction
    /// stops there.
    pub async fn evict_oldest(&self) -> Result<()> {
        let aliased = aliased_snapshot(self.db.as_ref()).await?;
        loop {
            let snapshots = self.db.sorted_snapshots().await?;
            if snapshots.len() <= self.history_count as usize || snapshots.len() <= 1 {
                return Ok(());
            }
            let oldest = &snapshots[0];
            if aliased.as_deref() == Some(oldest.as_str()) {
                warn!(collection = %oldest, "oldest snapshot bears the alias, stopping eviction");
                return Ok(());
            }
            info!(collection = %oldest, "evicting oldest snapshot");
            self.db.delete_collection(oldest).await?;
        }
    }
}
